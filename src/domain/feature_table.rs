//! Feature table: the ordered bar series the signal core consumes.
//!
//! Each [`Bar`] carries its date and prices plus an open-ended map of derived
//! feature cells (indicator values, pattern flags, the model vote). The
//! [`FeatureTable`] keeps bars in load order and a registry of feature column
//! names; the core only ever appends columns to it.

use crate::domain::error::SigtraderError;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Canonical column names.
pub mod columns {
    pub const DATE: &str = "Date";
    pub const OPEN: &str = "Open";
    pub const HIGH: &str = "High";
    pub const LOW: &str = "Low";
    pub const CLOSE: &str = "Close";
    pub const VOLUME: &str = "Volume";

    pub const RSI: &str = "RSI";
    pub const MACD: &str = "MACD";
    pub const MACD_SIGNAL: &str = "MACD_Signal";
    pub const BULLISH_ENGULFING: &str = "bullish_engulfing";
    pub const BEARISH_ENGULFING: &str = "bearish_engulfing";
    pub const MODEL_SIGNAL: &str = "Model_Signal";

    pub const RULE_SIGNAL: &str = "Rule_Signal";
    pub const CONSENSUS_SIGNAL: &str = "Consensus_Signal";
    pub const BALANCE: &str = "Balance";
}

/// A single feature cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Flag(bool),
    Missing,
}

impl FeatureValue {
    /// Parse a raw text cell. Returns `None` for text that is neither numeric,
    /// boolean, nor empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            return Some(FeatureValue::Missing);
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Some(FeatureValue::Flag(true));
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Some(FeatureValue::Flag(false));
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(FeatureValue::Number(v)),
            Ok(_) => Some(FeatureValue::Missing),
            Err(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match *self {
            FeatureValue::Number(v) => Some(v),
            FeatureValue::Flag(b) => Some(if b { 1.0 } else { 0.0 }),
            FeatureValue::Missing => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match *self {
            FeatureValue::Flag(b) => Some(b),
            FeatureValue::Number(v) => Some(v != 0.0),
            FeatureValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FeatureValue::Missing)
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(v) => write!(f, "{}", v),
            FeatureValue::Flag(true) => write!(f, "True"),
            FeatureValue::Flag(false) => write!(f, "False"),
            FeatureValue::Missing => Ok(()),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Number(v)
    }
}

impl From<bool> for FeatureValue {
    fn from(b: bool) -> Self {
        FeatureValue::Flag(b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
    pub features: HashMap<String, FeatureValue>,
}

impl Bar {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Bar {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
            features: HashMap::new(),
        }
    }

    pub fn with_feature(mut self, name: &str, value: impl Into<FeatureValue>) -> Self {
        self.features.insert(name.to_string(), value.into());
        self
    }

    pub fn feature(&self, name: &str) -> Option<FeatureValue> {
        self.features.get(name).copied()
    }

    /// Look up a feature cell, failing with a schema error when the column is
    /// absent from this bar.
    pub fn require(&self, name: &str) -> Result<FeatureValue, SigtraderError> {
        self.feature(name)
            .ok_or_else(|| SigtraderError::missing_column(name))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    bars: Vec<Bar>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>, bars: Vec<Bar>) -> Self {
        Self { columns, bars }
    }

    /// Build a table from bars, registering every feature name found on any
    /// bar in sorted order.
    pub fn from_bars(bars: Vec<Bar>) -> Self {
        let names: BTreeSet<&String> = bars.iter().flat_map(|b| b.features.keys()).collect();
        let columns = names.into_iter().cloned().collect();
        Self { columns, bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn bar(&self, row: usize) -> Option<&Bar> {
        self.bars.get(row)
    }

    /// Feature column names in registration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        name == columns::DATE || name == columns::CLOSE || self.columns.iter().any(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<(), SigtraderError> {
        if self.has_column(name) {
            Ok(())
        } else {
            Err(SigtraderError::missing_column(name))
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// All cells of a feature column (or `Close`), in row order.
    pub fn column(&self, name: &str) -> Result<Vec<FeatureValue>, SigtraderError> {
        if name == columns::CLOSE {
            return Ok(self
                .bars
                .iter()
                .map(|b| FeatureValue::Number(b.close))
                .collect());
        }
        self.require_column(name)?;
        Ok(self
            .bars
            .iter()
            .map(|b| b.feature(name).unwrap_or(FeatureValue::Missing))
            .collect())
    }

    /// Append (or replace) a derived column. Price data is never touched.
    pub fn append_column(
        &mut self,
        name: &str,
        values: Vec<FeatureValue>,
    ) -> Result<(), SigtraderError> {
        if values.len() != self.bars.len() {
            return Err(SigtraderError::alignment(name, self.bars.len(), values.len()));
        }
        if name == columns::CLOSE || name == columns::DATE {
            return Err(SigtraderError::DataSource {
                reason: format!("refusing to overwrite price column {}", name),
            });
        }
        for (bar, value) in self.bars.iter_mut().zip(values) {
            bar.features.insert(name.to_string(), value);
        }
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
        Ok(())
    }
}
