//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum SigtraderError {
    #[error("missing required column: {column}")]
    MissingColumn { column: String },

    #[error("missing value in column {column} at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("invalid vote in column {column} at row {row}: {value} (expected -1, 0 or 1)")]
    InvalidVote {
        column: String,
        row: usize,
        value: f64,
    },

    #[error("length mismatch in {context}: expected {expected} rows, got {actual}")]
    Alignment {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("degenerate data: {reason}")]
    DegenerateData { reason: String },

    #[error("rows out of order at row {row}: {current} does not follow {previous}")]
    Chronology {
        row: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("no data in {origin}")]
    NoData { origin: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SigtraderError {
    pub fn missing_column(column: &str) -> Self {
        SigtraderError::MissingColumn {
            column: column.to_string(),
        }
    }

    pub fn alignment(context: &str, expected: usize, actual: usize) -> Self {
        SigtraderError::Alignment {
            context: context.to_string(),
            expected,
            actual,
        }
    }

    /// Process exit status for this error's category.
    pub fn exit_status(&self) -> u8 {
        match self {
            SigtraderError::Io(_) | SigtraderError::Csv(_) => 1,
            SigtraderError::ConfigParse { .. }
            | SigtraderError::ConfigMissing { .. }
            | SigtraderError::ConfigInvalid { .. } => 2,
            SigtraderError::DataSource { .. } | SigtraderError::NoData { .. } => 3,
            SigtraderError::MissingColumn { .. }
            | SigtraderError::MissingValue { .. }
            | SigtraderError::InvalidVote { .. }
            | SigtraderError::Chronology { .. } => 4,
            SigtraderError::Alignment { .. } | SigtraderError::DegenerateData { .. } => 5,
        }
    }
}

impl From<&SigtraderError> for std::process::ExitCode {
    fn from(err: &SigtraderError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
