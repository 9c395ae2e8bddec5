//! Feature-table source port trait.

use crate::domain::error::SigtraderError;
use crate::domain::feature_table::FeatureTable;
use chrono::NaiveDate;

pub trait DataPort {
    /// Load the feature table for `code`, keeping only rows inside the
    /// optional inclusive date window. Rows keep their source order.
    fn fetch_table(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<FeatureTable, SigtraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, SigtraderError>;
}
