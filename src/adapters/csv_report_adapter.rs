//! CSV writer for augmented feature tables.

use crate::domain::error::SigtraderError;
use crate::domain::feature_table::{columns, Bar, FeatureTable};
use crate::ports::report_port::ReportPort;
use std::path::Path;
use tracing::info;

/// Writes `Date`, the price columns present in the table, then every feature
/// column in registration order (derived columns last).
pub struct CsvReportAdapter;

type PriceField = fn(&Bar) -> Option<f64>;

fn open(bar: &Bar) -> Option<f64> {
    bar.open
}

fn high(bar: &Bar) -> Option<f64> {
    bar.high
}

fn low(bar: &Bar) -> Option<f64> {
    bar.low
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl ReportPort for CsvReportAdapter {
    fn write_table(&self, table: &FeatureTable, output_path: &Path) -> Result<(), SigtraderError> {
        let optional_prices: [(&str, PriceField); 3] = [
            (columns::OPEN, open),
            (columns::HIGH, high),
            (columns::LOW, low),
        ];
        let present: Vec<(&str, PriceField)> = optional_prices
            .into_iter()
            .filter(|(_, get)| table.bars().iter().any(|b| get(b).is_some()))
            .collect();
        let has_volume = table.bars().iter().any(|b| b.volume.is_some());

        let mut writer = csv::Writer::from_path(output_path)?;

        let mut header: Vec<&str> = vec![columns::DATE];
        header.extend(present.iter().map(|(name, _)| *name));
        header.push(columns::CLOSE);
        if has_volume {
            header.push(columns::VOLUME);
        }
        header.extend(table.columns().iter().map(String::as_str));
        writer.write_record(&header)?;

        for bar in table.bars() {
            let mut record: Vec<String> = Vec::with_capacity(header.len());
            record.push(bar.date.format("%Y-%m-%d").to_string());
            record.extend(present.iter().map(|(_, get)| format_optional(get(bar))));
            record.push(bar.close.to_string());
            if has_volume {
                record.push(format_optional(bar.volume));
            }
            for name in table.columns() {
                record.push(bar.feature(name).map(|v| v.to_string()).unwrap_or_default());
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        info!(path = %output_path.display(), rows = table.len(), "augmented table written");
        Ok(())
    }
}
