//! Dataset cleaning stage.
//!
//! Removes exact-duplicate rows while preserving the first occurrence and the
//! original relative order of survivors. The column set is never altered.

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::DataError;

/// Data cleaner for the first pipeline stage.
pub struct DataCleaner;

impl DataCleaner {
    /// Remove exact-duplicate rows (all columns equal), keeping the first
    /// occurrence by original order.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::EmptyDataset`] when the frame has no columns;
    /// duplicate removal itself cannot fail structurally.
    pub fn clean(&self, df: DataFrame) -> Result<DataFrame, DataError> {
        if df.width() == 0 {
            return Err(DataError::EmptyDataset);
        }

        info!("Cleaning dataset...");

        let before = df.height();
        let df = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
        let removed = before - df.height();

        if removed > 0 {
            let pct = (removed as f64 / before as f64) * 100.0;
            info!("Removed {} duplicate rows ({:.1}%)", removed, pct);
        } else {
            debug!("No duplicate rows found");
        }

        Ok(df)
    }
}
