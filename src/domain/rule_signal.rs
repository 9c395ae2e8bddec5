//! Rule-based vote derivation.
//!
//! A fixed threshold policy over one bounded momentum oscillator (RSI), one
//! convergence/divergence pair (MACD line and its signal line) and two
//! reversal-pattern flags:
//!
//! 1. Default vote is Hold.
//! 2. Buy when momentum < `oversold` and trend line > signal line.
//! 3. Sell when momentum > `overbought` and trend line < signal line.
//! 4. A bullish reversal forces Buy.
//! 5. A bearish reversal forces Sell.
//!
//! Steps run in that order and the last assignment wins, so patterns take
//! precedence over momentum and a bearish reversal beats a bullish one on the
//! same bar. A missing indicator cell (warm-up) leaves its condition false; a
//! missing pattern cell counts as not detected. An absent column is an error.

use crate::domain::error::SigtraderError;
use crate::domain::feature_table::{columns, Bar, FeatureTable};
use crate::domain::vote::Vote;

pub const DEFAULT_OVERSOLD: f64 = 30.0;
pub const DEFAULT_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RuleSignalConfig {
    pub momentum_column: String,
    pub trend_column: String,
    pub trend_signal_column: String,
    pub bullish_column: String,
    pub bearish_column: String,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RuleSignalConfig {
    fn default() -> Self {
        RuleSignalConfig {
            momentum_column: columns::RSI.to_string(),
            trend_column: columns::MACD.to_string(),
            trend_signal_column: columns::MACD_SIGNAL.to_string(),
            bullish_column: columns::BULLISH_ENGULFING.to_string(),
            bearish_column: columns::BEARISH_ENGULFING.to_string(),
            oversold: DEFAULT_OVERSOLD,
            overbought: DEFAULT_OVERBOUGHT,
        }
    }
}

impl RuleSignalConfig {
    pub fn required_columns(&self) -> [&str; 5] {
        [
            self.momentum_column.as_str(),
            self.trend_column.as_str(),
            self.trend_signal_column.as_str(),
            self.bullish_column.as_str(),
            self.bearish_column.as_str(),
        ]
    }
}

/// Derive the rule vote for a single bar.
pub fn derive_rule_vote(bar: &Bar, config: &RuleSignalConfig) -> Result<Vote, SigtraderError> {
    let momentum = bar.require(&config.momentum_column)?.as_number();
    let trend = bar.require(&config.trend_column)?.as_number();
    let trend_signal = bar.require(&config.trend_signal_column)?.as_number();
    let bullish = bar.require(&config.bullish_column)?.as_flag().unwrap_or(false);
    let bearish = bar.require(&config.bearish_column)?.as_flag().unwrap_or(false);

    let mut vote = Vote::Hold;

    if let (Some(m), Some(t), Some(s)) = (momentum, trend, trend_signal) {
        if m < config.oversold && t > s {
            vote = Vote::Buy;
        }
        if m > config.overbought && t < s {
            vote = Vote::Sell;
        }
    }

    if bullish {
        vote = Vote::Buy;
    }
    if bearish {
        vote = Vote::Sell;
    }

    Ok(vote)
}

/// Derive rule votes for every bar. Required columns are checked on the table
/// first so a schema problem is reported before any row is processed.
pub fn derive_rule_votes(
    table: &FeatureTable,
    config: &RuleSignalConfig,
) -> Result<Vec<Vote>, SigtraderError> {
    for column in config.required_columns() {
        table.require_column(column)?;
    }
    table
        .bars()
        .iter()
        .map(|bar| derive_rule_vote(bar, config))
        .collect()
}
