//! Equity-curve statistics for a backtest run.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SigtraderError;
use tracing::warn;

const PERIODS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub initial_capital: f64,
    pub final_balance: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    /// Longest run of rows spent below a prior peak.
    pub max_drawdown_duration: usize,
    /// `None` when the return series is degenerate (see [`sharpe_ratio`]).
    pub sharpe_ratio: Option<f64>,
    pub transitions: usize,
}

impl Metrics {
    pub fn compute(result: &BacktestResult, risk_free_rate: f64) -> Self {
        let initial_capital = result.initial_capital;
        let final_balance = result.final_balance;

        let total_return = if initial_capital > 0.0 {
            (final_balance - initial_capital) / initial_capital
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&result.balances);

        let sharpe_ratio = match step_returns(&result.balances)
            .and_then(|returns| sharpe_ratio(&returns, risk_free_rate))
        {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("sharpe ratio unavailable: {e}");
                None
            }
        };

        Metrics {
            initial_capital,
            final_balance,
            total_return,
            max_drawdown,
            max_drawdown_duration,
            sharpe_ratio,
            transitions: result.transitions.len(),
        }
    }
}

/// Per-row simple returns of a balance series.
///
/// A step from a zero or negative balance has no meaningful simple return and
/// fails with `DegenerateData`.
pub fn step_returns(balances: &[f64]) -> Result<Vec<f64>, SigtraderError> {
    balances
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            let (prev, curr) = (w[0], w[1]);
            if prev > 0.0 {
                Ok((curr - prev) / prev)
            } else {
                Err(SigtraderError::DegenerateData {
                    reason: format!("non-positive balance {prev} at row {i}"),
                })
            }
        })
        .collect()
}

/// Annualized Sharpe ratio of per-row returns.
///
/// Fails with `DegenerateData` on fewer than two returns or a zero-variance
/// series instead of producing an infinite or NaN ratio.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> Result<f64, SigtraderError> {
    if returns.len() < 2 {
        return Err(SigtraderError::DegenerateData {
            reason: format!("need at least 2 returns, have {}", returns.len()),
        });
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev == 0.0 || !stddev.is_finite() {
        return Err(SigtraderError::DegenerateData {
            reason: "zero variance in returns".into(),
        });
    }

    let period_rf = risk_free_rate / PERIODS_PER_YEAR;
    Ok((mean - period_rf) / stddev * PERIODS_PER_YEAR.sqrt())
}

fn compute_drawdown(balances: &[f64]) -> (f64, usize) {
    let Some(&first) = balances.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for &balance in balances {
        if balance >= peak {
            peak = balance;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - balance) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_dd_duration += 1;
            if current_dd_duration > max_dd_duration {
                max_dd_duration = current_dd_duration;
            }
        }
    }

    (max_dd, max_dd_duration)
}
