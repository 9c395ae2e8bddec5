//! Core domain types and logic.

pub mod feature_table;
pub mod vote;
pub mod rule_signal;
pub mod consensus;
pub mod position;
pub mod backtest;
pub mod evaluator;
pub mod metrics;
pub mod data_validation;
pub mod pipeline;
pub mod sweep;
pub mod config_validation;
pub mod error;
