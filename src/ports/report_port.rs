//! Output sink port trait.

use crate::domain::error::SigtraderError;
use crate::domain::feature_table::FeatureTable;
use std::path::Path;

/// Port for persisting an augmented feature table.
pub trait ReportPort {
    fn write_table(&self, table: &FeatureTable, output_path: &Path) -> Result<(), SigtraderError>;
}
