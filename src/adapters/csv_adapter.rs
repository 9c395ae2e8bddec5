//! CSV file feature-table adapter.
//!
//! Reads `<base_path>/<CODE>.csv`. Columns are located by header name: `Date`
//! and `Close` are required, `Open`/`High`/`Low`/`Volume` are optional, and
//! the six are matched case-insensitively. Every other column is loaded as a
//! feature column.

use crate::domain::error::SigtraderError;
use crate::domain::feature_table::{columns, Bar, FeatureTable, FeatureValue};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Layout {
    date: usize,
    close: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    volume: Option<usize>,
    /// (column index, feature name) in file order.
    features: Vec<(usize, String)>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, SigtraderError> {
        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));

        let date = find(columns::DATE).ok_or_else(|| SigtraderError::missing_column(columns::DATE))?;
        let close =
            find(columns::CLOSE).ok_or_else(|| SigtraderError::missing_column(columns::CLOSE))?;
        let open = find(columns::OPEN);
        let high = find(columns::HIGH);
        let low = find(columns::LOW);
        let volume = find(columns::VOLUME);

        let price_columns = [Some(date), Some(close), open, high, low, volume];
        let price_names = [
            columns::DATE,
            columns::CLOSE,
            columns::OPEN,
            columns::HIGH,
            columns::LOW,
            columns::VOLUME,
        ];
        let mut features: Vec<(usize, String)> = Vec::new();
        for (i, h) in headers.iter().enumerate() {
            if price_columns.contains(&Some(i)) {
                continue;
            }
            let name = h.trim();
            let repeated = price_names.iter().any(|p| name.eq_ignore_ascii_case(p))
                || features.iter().any(|(_, f)| f == name);
            if repeated {
                return Err(SigtraderError::DataSource {
                    reason: format!("duplicate column header: {}", name),
                });
            }
            features.push((i, name.to_string()));
        }

        Ok(Layout {
            date,
            close,
            open,
            high,
            low,
            volume,
            features,
        })
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    fn parse_price(
        record: &csv::StringRecord,
        index: Option<usize>,
        name: &str,
        line: u64,
    ) -> Result<Option<f64>, SigtraderError> {
        let Some(raw) = index.and_then(|i| record.get(i)) else {
            return Ok(None);
        };
        match FeatureValue::parse(raw) {
            Some(FeatureValue::Number(v)) => Ok(Some(v)),
            Some(FeatureValue::Missing) => Ok(None),
            _ => Err(SigtraderError::DataSource {
                reason: format!("line {}: invalid {} value '{}'", line, name, raw.trim()),
            }),
        }
    }
}

impl DataPort for CsvAdapter {
    fn fetch_table(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<FeatureTable, SigtraderError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| SigtraderError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| SigtraderError::DataSource {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let layout = Layout::from_headers(headers)?;

        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| SigtraderError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let date_str = record.get(layout.date).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
                SigtraderError::DataSource {
                    reason: format!("line {}: invalid date '{}'", line, date_str),
                }
            })?;

            if start_date.is_some_and(|s| date < s) || end_date.is_some_and(|e| date > e) {
                continue;
            }

            let close = Self::parse_price(&record, Some(layout.close), columns::CLOSE, line)?
                .ok_or_else(|| SigtraderError::MissingValue {
                    column: columns::CLOSE.to_string(),
                    row: bars.len(),
                })?;

            let mut features = HashMap::with_capacity(layout.features.len());
            for (index, name) in &layout.features {
                let raw = record.get(*index).unwrap_or("");
                let value = FeatureValue::parse(raw).ok_or_else(|| SigtraderError::DataSource {
                    reason: format!(
                        "line {}: column {} value '{}' is neither numeric nor boolean",
                        line,
                        name,
                        raw.trim()
                    ),
                })?;
                features.insert(name.clone(), value);
            }

            bars.push(Bar {
                date,
                open: Self::parse_price(&record, layout.open, columns::OPEN, line)?,
                high: Self::parse_price(&record, layout.high, columns::HIGH, line)?,
                low: Self::parse_price(&record, layout.low, columns::LOW, line)?,
                close,
                volume: Self::parse_price(&record, layout.volume, columns::VOLUME, line)?,
                features,
            });
        }

        if bars.is_empty() {
            return Err(SigtraderError::NoData {
                origin: path.display().to_string(),
            });
        }

        debug!(path = %path.display(), rows = bars.len(), "feature table loaded");
        let names = layout.features.into_iter().map(|(_, name)| name).collect();
        Ok(FeatureTable::new(names, bars))
    }

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SigtraderError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if is_csv {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const AAPL_CSV: &str = "Date,Open,High,Low,Close,Volume,RSI,MACD,MACD_Signal,bullish_engulfing,bearish_engulfing,Model_Signal\n\
        2024-01-15,100.0,110.0,90.0,105.0,50000,25.0,1.2,0.8,False,False,1\n\
        2024-01-16,105.0,115.0,100.0,110.0,60000,,,,False,True,0\n\
        2024-01-17,110.0,120.0,105.0,115.0,55000,72.5,0.4,0.9,false,false,-1\n";

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(path.join("AAPL.csv"), AAPL_CSV).unwrap();
        fs::write(path.join("MSFT.csv"), "Date,Close\n").unwrap();
        fs::write(path.join("notes.txt"), "not data").unwrap();

        (dir, path)
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn fetch_table_reads_prices_and_features() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let table = adapter.fetch_table("AAPL", None, None).unwrap();

        assert_eq!(table.len(), 3);
        let bar = table.bar(0).unwrap();
        assert_eq!(bar.date, date(15));
        assert_eq!(bar.open, Some(100.0));
        assert_eq!(bar.high, Some(110.0));
        assert_eq!(bar.low, Some(90.0));
        assert_eq!(bar.close, 105.0);
        assert_eq!(bar.volume, Some(50000.0));
        assert_eq!(bar.feature(columns::RSI), Some(FeatureValue::Number(25.0)));
        assert_eq!(
            bar.feature(columns::BULLISH_ENGULFING),
            Some(FeatureValue::Flag(false))
        );
        assert_eq!(
            bar.feature(columns::MODEL_SIGNAL),
            Some(FeatureValue::Number(1.0))
        );
    }

    #[test]
    fn feature_columns_keep_file_order() {
        let (_dir, path) = setup_test_data();
        let table = CsvAdapter::new(path).fetch_table("AAPL", None, None).unwrap();
        assert_eq!(
            table.columns(),
            &[
                "RSI",
                "MACD",
                "MACD_Signal",
                "bullish_engulfing",
                "bearish_engulfing",
                "Model_Signal"
            ]
            .map(String::from)
        );
    }

    #[test]
    fn empty_cells_load_as_missing() {
        let (_dir, path) = setup_test_data();
        let table = CsvAdapter::new(path).fetch_table("AAPL", None, None).unwrap();
        let bar = table.bar(1).unwrap();
        assert_eq!(bar.feature(columns::RSI), Some(FeatureValue::Missing));
        assert_eq!(bar.feature(columns::MACD_SIGNAL), Some(FeatureValue::Missing));
        assert_eq!(
            bar.feature(columns::BEARISH_ENGULFING),
            Some(FeatureValue::Flag(true))
        );
    }

    #[test]
    fn fetch_table_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let table = adapter
            .fetch_table("AAPL", Some(date(16)), Some(date(16)))
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.bar(0).unwrap().date, date(16));

        let open_ended = adapter.fetch_table("AAPL", Some(date(16)), None).unwrap();
        assert_eq!(open_ended.len(), 2);
    }

    #[test]
    fn header_matching_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("LOW.csv"),
            "date,CLOSE,volume,RSI\n2024-01-02,10.5,100,40\n",
        )
        .unwrap();
        let table = CsvAdapter::new(dir.path().to_path_buf())
            .fetch_table("LOW", None, None)
            .unwrap();
        let bar = table.bar(0).unwrap();
        assert_eq!(bar.close, 10.5);
        assert_eq!(bar.volume, Some(100.0));
        assert_eq!(bar.open, None);
        assert_eq!(table.columns(), &["RSI".to_string()]);
    }

    #[test]
    fn duplicate_feature_header_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("DUP.csv"),
            "Date,Close,RSI,RSI\n2024-01-02,100,25,30\n",
        )
        .unwrap();
        let err = CsvAdapter::new(dir.path().to_path_buf())
            .fetch_table("DUP", None, None)
            .unwrap_err();
        assert!(matches!(err, SigtraderError::DataSource { ref reason } if reason.contains("RSI")));
    }

    #[test]
    fn repeated_price_header_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("DUP.csv"),
            "Date,Close,close\n2024-01-02,100,101\n",
        )
        .unwrap();
        let result = CsvAdapter::new(dir.path().to_path_buf()).fetch_table("DUP", None, None);
        assert!(matches!(result, Err(SigtraderError::DataSource { .. })));
    }

    #[test]
    fn rows_are_not_resorted() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("REV.csv"),
            "Date,Close\n2024-01-03,3\n2024-01-01,1\n",
        )
        .unwrap();
        let table = CsvAdapter::new(dir.path().to_path_buf())
            .fetch_table("REV", None, None)
            .unwrap();
        let dates: Vec<NaiveDate> = table.bars().iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![date(3), date(1)]);
    }

    #[test]
    fn missing_close_column_is_schema_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("X.csv"), "Date,Open\n2024-01-02,1\n").unwrap();
        let err = CsvAdapter::new(dir.path().to_path_buf())
            .fetch_table("X", None, None)
            .unwrap_err();
        assert!(matches!(err, SigtraderError::MissingColumn { ref column } if column == "Close"));
    }

    #[test]
    fn empty_close_cell_is_missing_value() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("X.csv"),
            "Date,Close\n2024-01-02,1\n2024-01-03,\n",
        )
        .unwrap();
        let err = CsvAdapter::new(dir.path().to_path_buf())
            .fetch_table("X", None, None)
            .unwrap_err();
        assert!(matches!(err, SigtraderError::MissingValue { row: 1, .. }));
    }

    #[test]
    fn invalid_date_is_data_source_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("X.csv"), "Date,Close\n02/01/2024,1\n").unwrap();
        let err = CsvAdapter::new(dir.path().to_path_buf())
            .fetch_table("X", None, None)
            .unwrap_err();
        assert!(matches!(err, SigtraderError::DataSource { .. }));
    }

    #[test]
    fn free_text_feature_is_data_source_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("X.csv"), "Date,Close,Sector\n2024-01-02,1,Tech\n").unwrap();
        let err = CsvAdapter::new(dir.path().to_path_buf())
            .fetch_table("X", None, None)
            .unwrap_err();
        assert!(matches!(err, SigtraderError::DataSource { .. }));
    }

    #[test]
    fn header_only_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let err = CsvAdapter::new(path).fetch_table("MSFT", None, None).unwrap_err();
        assert!(matches!(err, SigtraderError::NoData { .. }));
    }

    #[test]
    fn window_excluding_every_row_is_no_data() {
        let (_dir, path) = setup_test_data();
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let err = CsvAdapter::new(path)
            .fetch_table("AAPL", Some(start), None)
            .unwrap_err();
        assert!(matches!(err, SigtraderError::NoData { .. }));
    }

    #[test]
    fn fetch_table_errors_for_missing_file() {
        let (_dir, path) = setup_test_data();
        let result = CsvAdapter::new(path).fetch_table("XYZ", None, None);
        assert!(matches!(result, Err(SigtraderError::DataSource { .. })));
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let symbols = CsvAdapter::new(path).list_symbols().unwrap();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn list_symbols_errors_for_missing_directory() {
        let adapter = CsvAdapter::new(PathBuf::from("/nonexistent/features"));
        assert!(adapter.list_symbols().is_err());
    }
}
