//! Single-position backtest over consensus decisions.
//!
//! The simulator is a strict left fold over the bars in chronological order,
//! carrying the position, the running balance and the previous close. For
//! every row after the first:
//!
//! 1. A Buy moves a flat or short position to long and debits this row's
//!    close; a Sell moves a flat or long position to short and credits it.
//!    Hold never changes the position.
//! 2. The balance accrues `position_before_row * (close - prev_close)`.
//!
//! The first row only seeds the previous close, so its balance is the initial
//! capital exactly. There are no fees, no slippage and no margin checks: the
//! balance may go negative. Nothing is logged inside the fold; transitions are
//! collected and reported once the run is complete.

use crate::domain::error::SigtraderError;
use crate::domain::feature_table::{columns, FeatureTable};
use crate::domain::position::{Position, Transition};
use crate::domain::vote::Vote;
use tracing::{debug, info};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub initial_capital: f64,
    /// One balance per row, in row order.
    pub balances: Vec<f64>,
    pub final_balance: f64,
    pub final_position: Position,
    pub transitions: Vec<Transition>,
}

struct FoldState {
    position: Position,
    balance: f64,
    prev_close: Option<f64>,
    balances: Vec<f64>,
    transitions: Vec<Transition>,
}

impl FoldState {
    fn new(initial_capital: f64, rows: usize) -> Self {
        FoldState {
            position: Position::Flat,
            balance: initial_capital,
            prev_close: None,
            balances: Vec::with_capacity(rows),
            transitions: Vec::new(),
        }
    }

    fn step(mut self, row: usize, close: f64, decision: Vote) -> Result<Self, SigtraderError> {
        if !close.is_finite() {
            return Err(SigtraderError::MissingValue {
                column: columns::CLOSE.to_string(),
                row,
            });
        }

        if let Some(prev_close) = self.prev_close {
            let held = self.position;
            let entered = held.target_for(decision);
            if let Some(target) = entered {
                self.position = target;
                self.balance += target.entry_cash(close);
            }

            self.balance += held.mark_to_market(prev_close, close);

            if let Some(target) = entered {
                self.transitions.push(Transition {
                    row,
                    from: held,
                    to: target,
                    price: close,
                    balance_after: self.balance,
                });
            }
        }

        self.prev_close = Some(close);
        self.balances.push(self.balance);
        Ok(self)
    }

    fn finish(self, initial_capital: f64) -> BacktestResult {
        BacktestResult {
            initial_capital,
            balances: self.balances,
            final_balance: self.balance,
            final_position: self.position,
            transitions: self.transitions,
        }
    }
}

/// Run the simulator over row-aligned closes and consensus decisions.
///
/// Fails without partial output if the lengths differ or any close is
/// missing or non-finite.
pub fn simulate(
    closes: &[f64],
    decisions: &[Vote],
    initial_capital: f64,
) -> Result<BacktestResult, SigtraderError> {
    if closes.len() != decisions.len() {
        return Err(SigtraderError::alignment(
            "backtest decisions",
            closes.len(),
            decisions.len(),
        ));
    }

    let state = closes
        .iter()
        .zip(decisions)
        .enumerate()
        .try_fold(
            FoldState::new(initial_capital, closes.len()),
            |state, (row, (&close, &decision))| state.step(row, close, decision),
        )?;

    Ok(state.finish(initial_capital))
}

/// Run the simulator over a feature table's closes and log the outcome.
pub fn run_backtest(
    table: &FeatureTable,
    decisions: &[Vote],
    config: &BacktestConfig,
) -> Result<BacktestResult, SigtraderError> {
    let result = simulate(&table.closes(), decisions, config.initial_capital)?;

    for t in &result.transitions {
        let date = table.bar(t.row).map(|b| b.date.to_string()).unwrap_or_default();
        debug!(
            row = t.row,
            %date,
            from = %t.from,
            to = %t.to,
            price = t.price,
            balance = t.balance_after,
            "position change"
        );
    }
    info!(
        rows = result.balances.len(),
        transitions = result.transitions.len(),
        final_balance = result.final_balance,
        final_position = %result.final_position,
        "backtest complete"
    );

    Ok(result)
}
