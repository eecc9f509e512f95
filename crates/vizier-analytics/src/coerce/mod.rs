//! Type coercion stage.
//!
//! Runs after cleaning and before analysis:
//!
//! 1. Partition columns into categorical vs numeric by dtype.
//! 2. Fill missing categorical cells with the configured sentinel; fill
//!    missing numeric cells with the column mean over non-missing values (an
//!    entirely-missing numeric column has no mean and stays null).
//! 3. Parse columns whose name contains the date marker into a datetime type,
//!    degrading unparseable cells to null.
//! 4. Retype string columns whose values are all numeric-looking; mixed
//!    columns are left untouched with a warning.
//!
//! Per-cell parse failures are never fatal; only structural problems raise
//! [`DataError`].

mod temporal;

pub(crate) use temporal::datetime_series_to_millis;

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::DataError;
use crate::utils::{
    DtypeCategory, fill_numeric_nulls, fill_string_nulls, is_numeric_string,
    parse_numeric_string, series_dtype_category,
};

/// Type coercer for the second pipeline stage.
pub struct TypeCoercer {
    categorical_sentinel: String,
    date_column_marker: String,
}

impl TypeCoercer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            categorical_sentinel: config.categorical_sentinel.clone(),
            date_column_marker: config.date_column_marker.to_lowercase(),
        }
    }

    /// Coerce a cleaned frame into analysis-ready types.
    pub fn coerce(&self, df: DataFrame) -> Result<DataFrame, DataError> {
        if df.width() == 0 {
            return Err(DataError::EmptyDataset);
        }

        info!("Coercing column types...");
        let mut df = df;

        let column_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        // Steps 1+2: fill missing values per dtype partition
        for col_name in &column_names {
            self.fill_missing(&mut df, col_name)?;
        }

        // Step 3: parse date-like columns
        for col_name in &column_names {
            if col_name.to_lowercase().contains(&self.date_column_marker) {
                self.parse_date_column(&mut df, col_name)?;
            }
        }

        // Step 4: retype numeric-looking string columns
        for col_name in &column_names {
            if col_name.to_lowercase().contains(&self.date_column_marker) {
                continue;
            }
            self.retype_numeric_strings(&mut df, col_name)?;
        }

        Ok(df)
    }

    fn fill_missing(&self, df: &mut DataFrame, col_name: &str) -> Result<(), DataError> {
        let col = df.column(col_name)?;
        let series = col.as_materialized_series();

        if series.null_count() == 0 {
            return Ok(());
        }

        match series_dtype_category(series) {
            DtypeCategory::Numeric => {
                // mean over non-missing values; an all-null column has no
                // mean and stays null
                if let Some(mean) = series.mean() {
                    let missing = series.null_count();
                    let filled = fill_numeric_nulls(series, mean)?;
                    df.replace(col_name, filled)?;
                    debug!(
                        "Filled {} missing cells in numeric '{}' with mean {:.4}",
                        missing, col_name, mean
                    );
                } else {
                    debug!(
                        "Numeric column '{}' is entirely missing; leaving nulls in place",
                        col_name
                    );
                }
            }
            DtypeCategory::String => {
                let missing = series.null_count();
                let filled = fill_string_nulls(series, &self.categorical_sentinel)?;
                df.replace(col_name, filled)?;
                debug!(
                    "Filled {} missing cells in categorical '{}' with '{}'",
                    missing, col_name, self.categorical_sentinel
                );
            }
            DtypeCategory::Temporal | DtypeCategory::Boolean | DtypeCategory::Other => {}
        }

        Ok(())
    }

    fn parse_date_column(&self, df: &mut DataFrame, col_name: &str) -> Result<(), DataError> {
        let col = df.column(col_name)?;
        let series = col.as_materialized_series();

        // only string and numeric columns are parse candidates; anything
        // already temporal (or boolean/other) is left alone
        match series_dtype_category(series) {
            DtypeCategory::String | DtypeCategory::Numeric => {}
            _ => return Ok(()),
        }

        let (converted, failures) =
            temporal::to_datetime_series(series, &self.categorical_sentinel)?;
        df.replace(col_name, converted)?;

        if failures > 0 {
            warn!(
                "Column '{}': {} cells failed temporal parsing and became null",
                col_name, failures
            );
        } else {
            debug!("Parsed '{}' as datetime", col_name);
        }

        Ok(())
    }

    fn retype_numeric_strings(&self, df: &mut DataFrame, col_name: &str) -> Result<(), DataError> {
        let col = df.column(col_name)?;
        let series = col.as_materialized_series();

        if series.dtype() != &DataType::String {
            return Ok(());
        }

        let str_series = series.str()?;
        let mut numeric_count = 0usize;
        let mut other_count = 0usize;

        for opt_val in str_series.into_iter() {
            let Some(val) = opt_val else { continue };
            let trimmed = val.trim();
            // the sentinel (and empty cells) count as missing, not as content
            if trimmed.is_empty() || trimmed == self.categorical_sentinel {
                continue;
            }
            if is_numeric_string(trimmed) {
                numeric_count += 1;
            } else {
                other_count += 1;
            }
        }

        if numeric_count == 0 {
            return Ok(());
        }
        if other_count > 0 {
            warn!(
                "Column '{}' mixes numeric and non-numeric values ({} vs {}); leaving as-is",
                col_name, numeric_count, other_count
            );
            return Ok(());
        }

        let mut values: Vec<Option<f64>> = Vec::with_capacity(str_series.len());
        for opt_val in str_series.into_iter() {
            match opt_val {
                Some(val) => {
                    let trimmed = val.trim();
                    if trimmed.is_empty() || trimmed == self.categorical_sentinel {
                        values.push(None);
                    } else {
                        values.push(parse_numeric_string(trimmed));
                    }
                }
                None => values.push(None),
            }
        }

        let converted = Series::new(series.name().clone(), values);
        df.replace(col_name, converted)?;
        debug!("Retyped '{}' from String to numeric", col_name);

        Ok(())
    }
}
