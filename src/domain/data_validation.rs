//! Feature-table integrity and quality checks.
//!
//! Structural problems are errors: an empty table, an absent required column,
//! or rows that are not in strictly ascending date order. Quality findings
//! (missing cells, IQR outliers) are reported and logged but never fail the
//! run; the rule deriver already treats a missing indicator cell as "no
//! signal" for that row.

use crate::domain::error::SigtraderError;
use crate::domain::feature_table::{columns, FeatureTable, FeatureValue};
use std::collections::BTreeMap;
use tracing::{info, warn};

const IQR_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub rows: usize,
    /// Missing-cell counts, only for columns with at least one.
    pub missing_values: BTreeMap<String, usize>,
    /// IQR outlier counts, only for numeric columns with at least one.
    pub outliers: BTreeMap<String, usize>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.missing_values.is_empty() && self.outliers.is_empty()
    }
}

/// Fail if any row's date does not strictly follow the previous row's.
pub fn check_chronology(table: &FeatureTable) -> Result<(), SigtraderError> {
    for (i, pair) in table.bars().windows(2).enumerate() {
        if pair[1].date <= pair[0].date {
            return Err(SigtraderError::Chronology {
                row: i + 1,
                previous: pair[0].date,
                current: pair[1].date,
            });
        }
    }
    Ok(())
}

pub fn validate_table(
    table: &FeatureTable,
    required: &[&str],
) -> Result<ValidationReport, SigtraderError> {
    if table.is_empty() {
        return Err(SigtraderError::NoData {
            origin: "feature table".into(),
        });
    }
    for column in required {
        table.require_column(column)?;
    }
    check_chronology(table)?;

    let mut report = ValidationReport {
        rows: table.len(),
        ..ValidationReport::default()
    };

    let close_outliers = count_outliers(&table.closes());
    if close_outliers > 0 {
        report.outliers.insert(columns::CLOSE.to_string(), close_outliers);
    }

    for name in table.columns() {
        let cells = table.column(name)?;

        let missing = cells.iter().filter(|c| c.is_missing()).count();
        if missing > 0 {
            report.missing_values.insert(name.clone(), missing);
        }

        let is_numeric = cells
            .iter()
            .all(|c| matches!(c, FeatureValue::Number(_) | FeatureValue::Missing));
        if is_numeric {
            let values: Vec<f64> = cells.iter().filter_map(|c| c.as_number()).collect();
            let outliers = count_outliers(&values);
            if outliers > 0 {
                report.outliers.insert(name.clone(), outliers);
            }
        }
    }

    info!(
        rows = report.rows,
        columns = table.columns().len(),
        "feature table validated"
    );
    for (column, count) in &report.missing_values {
        warn!(%column, count, "missing values");
    }
    for (column, count) in &report.outliers {
        warn!(%column, count, "outliers outside 1.5 IQR");
    }

    Ok(report)
}

/// Linear-interpolated quantile of an ascending-sorted, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Count values outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`.
pub fn count_outliers(values: &[f64]) -> usize {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - IQR_MULTIPLIER * iqr;
    let upper = q3 + IQR_MULTIPLIER * iqr;

    values.iter().filter(|&&v| v < lower || v > upper).count()
}
