#![allow(dead_code)]

use chrono::NaiveDate;
use sigtrader::domain::error::SigtraderError;
use sigtrader::domain::feature_table::{columns, Bar, FeatureTable};
use sigtrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub tables: HashMap<String, FeatureTable>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_table(mut self, code: &str, table: FeatureTable) -> Self {
        self.tables.insert(code.to_string(), table);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_table(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<FeatureTable, SigtraderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(SigtraderError::DataSource {
                reason: reason.clone(),
            });
        }
        let table = self
            .tables
            .get(code)
            .ok_or_else(|| SigtraderError::NoData {
                origin: code.to_string(),
            })?;

        let bars: Vec<Bar> = table
            .bars()
            .iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .cloned()
            .collect();
        if bars.is_empty() {
            return Err(SigtraderError::NoData {
                origin: code.to_string(),
            });
        }
        Ok(FeatureTable::new(table.columns().to_vec(), bars))
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError> {
        let mut symbols: Vec<String> = self.tables.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Row inputs for a feature bar: close, RSI, MACD, MACD signal, patterns,
/// model vote.
#[derive(Debug, Clone, Copy)]
pub struct RowInput {
    pub close: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub bullish: bool,
    pub bearish: bool,
    pub model: f64,
}

impl RowInput {
    /// A row on which no rule fires, with the given close and model vote.
    pub fn neutral(close: f64, model: f64) -> Self {
        RowInput {
            close,
            rsi: 50.0,
            macd: 1.0,
            macd_signal: 0.5,
            bullish: false,
            bearish: false,
            model,
        }
    }

    /// A row whose momentum rule votes Buy.
    pub fn oversold(close: f64, model: f64) -> Self {
        RowInput {
            rsi: 20.0,
            ..RowInput::neutral(close, model)
        }
    }

    /// A row whose momentum rule votes Sell.
    pub fn overbought(close: f64, model: f64) -> Self {
        RowInput {
            rsi: 80.0,
            macd: 0.2,
            ..RowInput::neutral(close, model)
        }
    }
}

pub fn make_bar(date_str: &str, row: RowInput) -> Bar {
    Bar::new(
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        row.close,
    )
    .with_feature(columns::RSI, row.rsi)
    .with_feature(columns::MACD, row.macd)
    .with_feature(columns::MACD_SIGNAL, row.macd_signal)
    .with_feature(columns::BULLISH_ENGULFING, row.bullish)
    .with_feature(columns::BEARISH_ENGULFING, row.bearish)
    .with_feature(columns::MODEL_SIGNAL, row.model)
}

/// Consecutive daily bars from 2024-01-01.
pub fn make_table(rows: &[RowInput]) -> FeatureTable {
    let start = date(2024, 1, 1);
    let bars = rows
        .iter()
        .enumerate()
        .map(|(i, &row)| {
            let d = start + chrono::Duration::days(i as i64);
            make_bar(&d.format("%Y-%m-%d").to_string(), row)
        })
        .collect();
    FeatureTable::from_bars(bars)
}

pub const FEATURE_HEADER: &str =
    "Date,Open,High,Low,Close,Volume,RSI,MACD,MACD_Signal,bullish_engulfing,bearish_engulfing,Model_Signal";

/// Render rows as a feature CSV with the canonical header.
pub fn feature_csv(rows: &[RowInput]) -> String {
    let start = date(2024, 1, 1);
    let mut out = String::from(FEATURE_HEADER);
    out.push('\n');
    for (i, s) in rows.iter().enumerate() {
        let d = start + chrono::Duration::days(i as i64);
        out.push_str(&format!(
            "{},{},{},{},{},1000,{},{},{},{},{},{}\n",
            d.format("%Y-%m-%d"),
            s.close,
            s.close,
            s.close,
            s.close,
            s.rsi,
            s.macd,
            s.macd_signal,
            if s.bullish { "True" } else { "False" },
            if s.bearish { "True" } else { "False" },
            s.model,
        ));
    }
    out
}
