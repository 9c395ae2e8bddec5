//! Directional votes.

use crate::domain::error::SigtraderError;
use crate::domain::feature_table::{FeatureTable, FeatureValue};
use std::fmt;

/// A single source's directional opinion for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Vote {
    Sell = -1,
    #[default]
    Hold = 0,
    Buy = 1,
}

impl Vote {
    pub fn value(self) -> i8 {
        self as i8
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            -1 => Some(Vote::Sell),
            0 => Some(Vote::Hold),
            1 => Some(Vote::Buy),
            _ => None,
        }
    }

    /// Quantize a real value by sign: positive → Buy, negative → Sell,
    /// exactly zero → Hold.
    pub fn from_sign(x: f64) -> Self {
        if x > 0.0 {
            Vote::Buy
        } else if x < 0.0 {
            Vote::Sell
        } else {
            Vote::Hold
        }
    }

    /// Strict conversion of a table cell at `row` of `column`.
    pub fn from_cell(
        cell: FeatureValue,
        column: &str,
        row: usize,
    ) -> Result<Self, SigtraderError> {
        let value = match cell {
            FeatureValue::Missing => {
                return Err(SigtraderError::MissingValue {
                    column: column.to_string(),
                    row,
                });
            }
            other => other.as_number().unwrap_or(f64::NAN),
        };
        if value.fract() != 0.0 {
            return Err(SigtraderError::InvalidVote {
                column: column.to_string(),
                row,
                value,
            });
        }
        Vote::from_i64(value as i64).ok_or_else(|| SigtraderError::InvalidVote {
            column: column.to_string(),
            row,
            value,
        })
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl From<Vote> for FeatureValue {
    fn from(vote: Vote) -> Self {
        FeatureValue::Number(vote.value() as f64)
    }
}

/// Read a whole vote column from the table.
pub fn read_votes(table: &FeatureTable, column: &str) -> Result<Vec<Vote>, SigtraderError> {
    table
        .column(column)?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| Vote::from_cell(cell, column, row))
        .collect()
}
