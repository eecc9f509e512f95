//! Per-cell temporal parsing for date-like columns.
//!
//! Cells that fail to parse become null; parsing is never fatal for the
//! column or the stage.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Datetime formats tried, in order, for string cells.
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Date-only formats tried, in order, for string cells.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Parse one string cell into epoch milliseconds.
pub(crate) fn parse_temporal_cell(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp_millis());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            let dt = date.and_hms_opt(0, 0, 0)?;
            return Some(dt.and_utc().timestamp_millis());
        }
    }

    None
}

/// Interpret a raw number as an epoch timestamp in milliseconds.
///
/// Values in the typical seconds range (1e9..2e9) are scaled up; values in
/// the milliseconds range (1e12..2e12) pass through; anything else is
/// rejected rather than guessed at.
pub(crate) fn epoch_to_millis(value: i64) -> Option<i64> {
    if value > 1_000_000_000 && value < 2_000_000_000 {
        Some(value * 1000)
    } else if value > 1_000_000_000_000 && value < 2_000_000_000_000 {
        Some(value)
    } else {
        None
    }
}

/// Convert a string or numeric series into `Datetime(Milliseconds)`.
///
/// Returns the converted series and the number of cells that failed to parse
/// (and were degraded to null). `sentinel` cells count as missing.
pub(crate) fn to_datetime_series(
    series: &Series,
    sentinel: &str,
) -> PolarsResult<(Series, usize)> {
    let mut failures = 0usize;
    let mut millis: Vec<Option<i64>> = Vec::with_capacity(series.len());

    if series.dtype() == &DataType::String {
        let str_series = series.str()?;
        for opt_val in str_series.into_iter() {
            match opt_val {
                Some(val) if val.trim() == sentinel => millis.push(None),
                Some(val) => match parse_temporal_cell(val) {
                    Some(ms) => millis.push(Some(ms)),
                    None => {
                        failures += 1;
                        millis.push(None);
                    }
                },
                None => millis.push(None),
            }
        }
    } else {
        // numeric epoch column
        let int_series = series.cast(&DataType::Int64)?;
        let ca = int_series.i64()?;
        for opt_val in ca.into_iter() {
            match opt_val {
                Some(val) => match epoch_to_millis(val) {
                    Some(ms) => millis.push(Some(ms)),
                    None => {
                        failures += 1;
                        millis.push(None);
                    }
                },
                None => millis.push(None),
            }
        }
    }

    let int_series = Series::new(series.name().clone(), millis);
    let datetime = int_series.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    Ok((datetime, failures))
}

/// Extract a temporal series as epoch milliseconds.
pub(crate) fn datetime_series_to_millis(series: &Series) -> PolarsResult<Vec<Option<i64>>> {
    let as_datetime = if series.dtype() == &DataType::Date {
        series.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
    } else {
        series.clone()
    };
    let int_series = as_datetime.cast(&DataType::Int64)?;
    let ca = int_series.i64()?;
    Ok(ca.into_iter().collect())
}
