//! Threshold sweep: many independent pipeline runs over one table.
//!
//! Each variant evaluates the whole pipeline against the shared, read-only
//! table, so runs share no mutable state and can go to the rayon pool. The
//! simulator inside each run stays sequential.

use crate::domain::error::SigtraderError;
use crate::domain::feature_table::FeatureTable;
use crate::domain::pipeline::{evaluate_table, PipelineConfig, PipelineOutput};
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdVariant {
    pub oversold: f64,
    pub overbought: f64,
}

/// Cartesian product of oversold and overbought levels, skipping pairs where
/// `oversold >= overbought`.
pub fn threshold_grid(oversold: &[f64], overbought: &[f64]) -> Vec<ThresholdVariant> {
    oversold
        .iter()
        .flat_map(|&lo| {
            overbought
                .iter()
                .filter(move |&&hi| lo < hi)
                .map(move |&hi| ThresholdVariant {
                    oversold: lo,
                    overbought: hi,
                })
        })
        .collect()
}

#[derive(Debug)]
pub struct SweepOutcome {
    pub variant: ThresholdVariant,
    pub result: Result<PipelineOutput, SigtraderError>,
}

impl SweepOutcome {
    pub fn final_balance(&self) -> Option<f64> {
        self.result.as_ref().ok().map(|o| o.backtest.final_balance)
    }
}

/// Run every variant in parallel. Outcomes come back in variant order; a
/// failing variant never aborts its siblings.
pub fn run_sweep(
    table: &FeatureTable,
    base: &PipelineConfig,
    variants: &[ThresholdVariant],
) -> Vec<SweepOutcome> {
    let outcomes: Vec<SweepOutcome> = variants
        .par_iter()
        .map(|&variant| {
            let mut config = base.clone();
            config.rules.oversold = variant.oversold;
            config.rules.overbought = variant.overbought;

            let result = evaluate_table(table, &config);
            if let Err(e) = &result {
                warn!(
                    oversold = variant.oversold,
                    overbought = variant.overbought,
                    "sweep variant failed: {e}"
                );
            }
            SweepOutcome { variant, result }
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(variants = outcomes.len(), failed, "sweep complete");
    outcomes
}

/// Order outcomes by final balance, best first; failed variants sink to the
/// end in their original order.
pub fn rank_outcomes(outcomes: &mut [SweepOutcome]) {
    outcomes.sort_by(|a, b| match (a.final_balance(), b.final_balance()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feature_table::{columns, Bar};
    use chrono::NaiveDate;

    fn table() -> FeatureTable {
        let rows = [
            (100.0, 50.0, 0.0),
            (105.0, 25.0, 1.0),
            (110.0, 35.0, 1.0),
            (108.0, 75.0, -1.0),
        ];
        FeatureTable::from_bars(
            rows.iter()
                .enumerate()
                .map(|(i, &(close, rsi, model))| {
                    let macd = if rsi > 60.0 { 0.0 } else { 1.0 };
                    Bar::new(NaiveDate::from_ymd_opt(2024, 2, i as u32 + 1).unwrap(), close)
                        .with_feature(columns::RSI, rsi)
                        .with_feature(columns::MACD, macd)
                        .with_feature(columns::MACD_SIGNAL, 0.5)
                        .with_feature(columns::BULLISH_ENGULFING, false)
                        .with_feature(columns::BEARISH_ENGULFING, false)
                        .with_feature(columns::MODEL_SIGNAL, model)
                })
                .collect(),
        )
    }

    #[test]
    fn grid_skips_inverted_pairs() {
        let grid = threshold_grid(&[20.0, 30.0, 80.0], &[70.0, 80.0]);
        assert_eq!(grid.len(), 4);
        assert!(grid.iter().all(|v| v.oversold < v.overbought));
    }

    #[test]
    fn outcomes_follow_variant_order() {
        let variants = threshold_grid(&[20.0, 30.0, 40.0], &[70.0]);
        let outcomes = run_sweep(&table(), &PipelineConfig::default(), &variants);
        let got: Vec<ThresholdVariant> = outcomes.iter().map(|o| o.variant).collect();
        assert_eq!(got, variants);
    }

    #[test]
    fn thresholds_change_decisions() {
        let variants = [
            ThresholdVariant { oversold: 20.0, overbought: 70.0 },
            ThresholdVariant { oversold: 40.0, overbought: 70.0 },
        ];
        let outcomes = run_sweep(&table(), &PipelineConfig::default(), &variants);
        let tight = outcomes[0].result.as_ref().unwrap();
        let loose = outcomes[1].result.as_ref().unwrap();
        assert_ne!(tight.rule_votes, loose.rule_votes);
    }

    #[test]
    fn variant_matches_standalone_evaluation() {
        let t = table();
        let variant = ThresholdVariant { oversold: 40.0, overbought: 70.0 };
        let outcomes = run_sweep(&t, &PipelineConfig::default(), &[variant]);

        let mut config = PipelineConfig::default();
        config.rules.oversold = 40.0;
        config.rules.overbought = 70.0;
        let expected = evaluate_table(&t, &config).unwrap();
        assert_eq!(outcomes[0].result.as_ref().unwrap(), &expected);
    }

    #[test]
    fn sweep_does_not_mutate_input_table() {
        let t = table();
        let before = t.clone();
        let _ = run_sweep(&t, &PipelineConfig::default(), &threshold_grid(&[30.0], &[70.0]));
        assert_eq!(t, before);
    }

    #[test]
    fn failing_variant_does_not_abort_siblings() {
        let mut base = PipelineConfig::default();
        base.model_vote_column = "absent".into();
        let outcomes = run_sweep(&table(), &base, &threshold_grid(&[20.0, 30.0], &[70.0]));
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_err()));
    }

    #[test]
    fn ranking_puts_best_first_and_errors_last() {
        let variants = threshold_grid(&[20.0, 40.0], &[70.0]);
        let mut outcomes = run_sweep(&table(), &PipelineConfig::default(), &variants);
        outcomes.push(SweepOutcome {
            variant: ThresholdVariant { oversold: 0.0, overbought: 1.0 },
            result: Err(SigtraderError::DegenerateData { reason: "test".into() }),
        });
        rank_outcomes(&mut outcomes);

        let balances: Vec<Option<f64>> = outcomes.iter().map(|o| o.final_balance()).collect();
        assert!(balances[0].unwrap() >= balances[1].unwrap());
        assert_eq!(balances[2], None);
    }
}
