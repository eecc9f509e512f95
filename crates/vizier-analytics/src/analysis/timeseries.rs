//! Monthly resample of numeric columns over the first temporal column.

use anyhow::Result;
use chrono::DateTime;
use polars::prelude::*;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::debug;

use crate::coerce::datetime_series_to_millis;
use crate::normalize::json_f64;
use crate::utils::{is_numeric_dtype, is_temporal_dtype};

/// Resample every numeric column to monthly means over the first temporal
/// column, emitted as metric -> "YYYY-MM" -> mean.
///
/// No temporal column or no numeric column yields an empty object. Rows whose
/// temporal cell is null are excluded from every bucket.
pub(crate) fn time_series_analysis(df: &DataFrame) -> Result<Value> {
    let temporal = df
        .get_columns()
        .iter()
        .map(|c| c.as_materialized_series())
        .find(|s| is_temporal_dtype(s.dtype()));

    let Some(temporal) = temporal else {
        debug!("No temporal column found; time series analysis is empty");
        return Ok(json!({}));
    };

    let numeric: Vec<&Series> = df
        .get_columns()
        .iter()
        .map(|c| c.as_materialized_series())
        .filter(|s| is_numeric_dtype(s.dtype()))
        .collect();

    if numeric.is_empty() {
        debug!("No numeric columns found; time series analysis is empty");
        return Ok(json!({}));
    }

    let millis = datetime_series_to_millis(temporal)?;
    let periods: Vec<Option<String>> = millis
        .iter()
        .map(|opt| {
            opt.and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.format("%Y-%m").to_string())
        })
        .collect();

    let mut result = Map::new();
    for series in numeric {
        let float_series = series.cast(&DataType::Float64)?;
        let ca = float_series.f64()?;

        // period -> (sum, count); BTreeMap keeps periods chronologically sorted
        let mut buckets: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for (opt_period, opt_value) in periods.iter().zip(ca.into_iter()) {
            let (Some(period), Some(value)) = (opt_period, opt_value) else {
                continue;
            };
            if !value.is_finite() {
                continue;
            }
            let bucket = buckets.entry(period.clone()).or_insert((0.0, 0));
            bucket.0 += value;
            bucket.1 += 1;
        }

        let mut metric = Map::new();
        for (period, (sum, count)) in buckets {
            metric.insert(period, json_f64(sum / count as f64));
        }
        result.insert(series.name().to_string(), Value::Object(metric));
    }

    Ok(Value::Object(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::TypeCoercer;
    use crate::config::PipelineConfig;

    fn frame_with_dates() -> DataFrame {
        let df = df!(
            "order_date" => &[
                "2024-01-05", "2024-01-25", "2024-02-10", "2024-02-20", "2024-03-01",
            ],
            "amount" => &[10.0f64, 20.0, 30.0, 50.0, 100.0],
        )
        .unwrap();
        TypeCoercer::new(&PipelineConfig::default()).coerce(df).unwrap()
    }

    #[test]
    fn test_monthly_means() {
        let df = frame_with_dates();
        let result = time_series_analysis(&df).unwrap();

        assert_eq!(result["amount"]["2024-01"], json!(15.0));
        assert_eq!(result["amount"]["2024-02"], json!(40.0));
        assert_eq!(result["amount"]["2024-03"], json!(100.0));
    }

    #[test]
    fn test_no_temporal_column_is_empty() {
        let df = df!("amount" => &[1.0f64, 2.0]).unwrap();
        let result = time_series_analysis(&df).unwrap();
        assert_eq!(result, json!({}));
    }

    #[test]
    fn test_no_numeric_column_is_empty() {
        let df = df!(
            "order_date" => &["2024-01-05", "2024-02-10"],
            "city" => &["Oslo", "Lima"],
        )
        .unwrap();
        let df = TypeCoercer::new(&PipelineConfig::default()).coerce(df).unwrap();

        let result = time_series_analysis(&df).unwrap();
        assert_eq!(result, json!({}));
    }

    #[test]
    fn test_null_dates_excluded() {
        let df = df!(
            "order_date" => &[Some("2024-01-05"), Some("garbage"), Some("2024-01-25")],
            "amount" => &[10.0f64, 999.0, 20.0],
        )
        .unwrap();
        let df = TypeCoercer::new(&PipelineConfig::default()).coerce(df).unwrap();

        let result = time_series_analysis(&df).unwrap();
        // the unparseable row does not pollute the January bucket
        assert_eq!(result["amount"]["2024-01"], json!(15.0));
        assert_eq!(result["amount"].as_object().unwrap().len(), 1);
    }
}
