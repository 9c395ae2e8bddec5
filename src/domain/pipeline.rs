//! End-to-end signal run over one feature table.
//!
//! Validation, rule derivation, model-vote reading, consensus, simulation,
//! evaluation and metrics run in that order. Output columns are appended only
//! after every stage has succeeded, so a failed run leaves the table as it
//! was loaded.

use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::consensus::reconcile_all;
use crate::domain::data_validation::{validate_table, ValidationReport};
use crate::domain::error::SigtraderError;
use crate::domain::evaluator::{evaluate_signals, SignalAgreement};
use crate::domain::feature_table::{columns, FeatureTable, FeatureValue};
use crate::domain::metrics::Metrics;
use crate::domain::rule_signal::{derive_rule_votes, RuleSignalConfig};
use crate::domain::vote::{read_votes, Vote};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub rules: RuleSignalConfig,
    pub backtest: BacktestConfig,
    pub model_vote_column: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            rules: RuleSignalConfig::default(),
            backtest: BacktestConfig::default(),
            model_vote_column: columns::MODEL_SIGNAL.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Every input column a run reads besides `Date` and `Close`.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut required: Vec<&str> = self.rules.required_columns().to_vec();
        required.push(self.model_vote_column.as_str());
        required
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub validation: ValidationReport,
    pub rule_votes: Vec<Vote>,
    pub model_votes: Vec<Vote>,
    pub decisions: Vec<Vote>,
    pub backtest: BacktestResult,
    pub agreement: SignalAgreement,
    pub metrics: Metrics,
}

fn vote_cells(votes: &[Vote]) -> Vec<FeatureValue> {
    votes.iter().map(|&v| FeatureValue::from(v)).collect()
}

/// Run every stage without touching the table.
pub fn evaluate_table(
    table: &FeatureTable,
    config: &PipelineConfig,
) -> Result<PipelineOutput, SigtraderError> {
    let validation = validate_table(table, &config.required_columns())?;

    let rule_votes = derive_rule_votes(table, &config.rules)?;
    info!(rows = rule_votes.len(), "rule votes derived");

    let model_votes = read_votes(table, &config.model_vote_column)?;
    info!(column = %config.model_vote_column, "model votes read");

    let decisions = reconcile_all(&rule_votes, &model_votes)?;
    let buys = decisions.iter().filter(|&&d| d == Vote::Buy).count();
    let sells = decisions.iter().filter(|&&d| d == Vote::Sell).count();
    info!(buys, sells, "consensus reconciled");

    let backtest = run_backtest(table, &decisions, &config.backtest)?;

    let agreement = evaluate_signals(&rule_votes, &model_votes, &decisions)?;
    info!(
        rule = agreement.rule_agreement,
        model = agreement.model_agreement,
        "signals evaluated"
    );

    let metrics = Metrics::compute(&backtest, config.backtest.risk_free_rate);

    Ok(PipelineOutput {
        validation,
        rule_votes,
        model_votes,
        decisions,
        backtest,
        agreement,
        metrics,
    })
}

/// Run every stage and append `Rule_Signal`, `Consensus_Signal` and `Balance`
/// to the table.
pub fn run_pipeline(
    table: &mut FeatureTable,
    config: &PipelineConfig,
) -> Result<PipelineOutput, SigtraderError> {
    let output = evaluate_table(table, config)?;

    table.append_column(columns::RULE_SIGNAL, vote_cells(&output.rule_votes))?;
    table.append_column(columns::CONSENSUS_SIGNAL, vote_cells(&output.decisions))?;
    table.append_column(
        columns::BALANCE,
        output
            .backtest
            .balances
            .iter()
            .map(|&b| FeatureValue::Number(b))
            .collect(),
    )?;
    info!("output columns appended");

    Ok(output)
}
