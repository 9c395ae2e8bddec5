//! Simulator position state and the transition ledger.

use crate::domain::vote::Vote;
use std::fmt;

/// Directional exposure held by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl Position {
    pub fn direction(self) -> f64 {
        match self {
            Position::Short => -1.0,
            Position::Flat => 0.0,
            Position::Long => 1.0,
        }
    }

    /// The position a consensus decision moves to, or `None` when the decision
    /// leaves the position unchanged.
    pub fn target_for(self, decision: Vote) -> Option<Position> {
        match decision {
            Vote::Buy if self != Position::Long => Some(Position::Long),
            Vote::Sell if self != Position::Short => Some(Position::Short),
            _ => None,
        }
    }

    /// Cash adjustment for entering this position at `price`: a long entry
    /// debits the price, a short entry credits it.
    pub fn entry_cash(self, price: f64) -> f64 {
        match self {
            Position::Long => -price,
            Position::Short => price,
            Position::Flat => 0.0,
        }
    }

    /// Unrealized P&L of holding this position from `prev_close` to `close`.
    pub fn mark_to_market(self, prev_close: f64, close: f64) -> f64 {
        self.direction() * (close - prev_close)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Short => write!(f, "short"),
            Position::Flat => write!(f, "flat"),
            Position::Long => write!(f, "long"),
        }
    }
}

/// One position change recorded during a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub row: usize,
    pub from: Position,
    pub to: Position,
    pub price: f64,
    pub balance_after: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_flat() {
        assert_eq!(Position::default(), Position::Flat);
    }

    #[test]
    fn buy_targets_long_unless_already_long() {
        assert_eq!(Position::Flat.target_for(Vote::Buy), Some(Position::Long));
        assert_eq!(Position::Short.target_for(Vote::Buy), Some(Position::Long));
        assert_eq!(Position::Long.target_for(Vote::Buy), None);
    }

    #[test]
    fn sell_targets_short_unless_already_short() {
        assert_eq!(Position::Flat.target_for(Vote::Sell), Some(Position::Short));
        assert_eq!(Position::Long.target_for(Vote::Sell), Some(Position::Short));
        assert_eq!(Position::Short.target_for(Vote::Sell), None);
    }

    #[test]
    fn hold_never_changes_position() {
        for p in [Position::Short, Position::Flat, Position::Long] {
            assert_eq!(p.target_for(Vote::Hold), None);
        }
    }

    #[test]
    fn entry_cash_debits_long_credits_short() {
        assert!((Position::Long.entry_cash(105.0) - (-105.0)).abs() < f64::EPSILON);
        assert!((Position::Short.entry_cash(105.0) - 105.0).abs() < f64::EPSILON);
        assert!((Position::Flat.entry_cash(105.0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mark_to_market_long_profit() {
        assert!((Position::Long.mark_to_market(100.0, 105.0) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mark_to_market_short_profit() {
        assert!((Position::Short.mark_to_market(105.0, 100.0) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mark_to_market_flat_is_zero() {
        assert!((Position::Flat.mark_to_market(100.0, 150.0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn display_names() {
        assert_eq!(Position::Long.to_string(), "long");
        assert_eq!(Position::Short.to_string(), "short");
        assert_eq!(Position::Flat.to_string(), "flat");
    }
}
