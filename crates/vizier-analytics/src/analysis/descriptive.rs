//! Per-column descriptive statistics.

use anyhow::Result;
use polars::prelude::*;
use serde_json::{Map, Value, json};

use crate::normalize::json_f64;
use crate::utils::{
    DtypeCategory, numeric_values, quantile_sorted, series_dtype_category, string_value_counts,
};

/// Compute descriptive statistics for every numeric and categorical column.
///
/// Numeric columns get count/mean/std/min/quartiles/max; categorical columns
/// get count/unique/top/freq. Temporal and boolean columns are skipped.
pub(crate) fn describe(df: &DataFrame) -> Result<Value> {
    let mut result = Map::new();

    for col in df.get_columns() {
        let series = col.as_materialized_series();
        let name = series.name().to_string();

        match series_dtype_category(series) {
            DtypeCategory::Numeric => {
                result.insert(name, numeric_summary(series)?);
            }
            DtypeCategory::String => {
                result.insert(name, categorical_summary(series)?);
            }
            _ => {}
        }
    }

    Ok(Value::Object(result))
}

fn numeric_summary(series: &Series) -> Result<Value> {
    let mut values = numeric_values(series)?;
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let count = values.len();
    let mean = if count > 0 {
        json_f64(values.iter().sum::<f64>() / count as f64)
    } else {
        Value::Null
    };
    let std = if count > 1 {
        let m = values.iter().sum::<f64>() / count as f64;
        let variance =
            values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (count as f64 - 1.0);
        json_f64(variance.sqrt())
    } else if count == 1 {
        json_f64(0.0)
    } else {
        Value::Null
    };

    let quantile = |q: f64| {
        quantile_sorted(&values, q)
            .map(json_f64)
            .unwrap_or(Value::Null)
    };

    Ok(json!({
        "count": count,
        "mean": mean,
        "std": std,
        "min": quantile(0.0),
        "25%": quantile(0.25),
        "50%": quantile(0.5),
        "75%": quantile(0.75),
        "max": quantile(1.0),
    }))
}

fn categorical_summary(series: &Series) -> Result<Value> {
    let counts = string_value_counts(series);
    let count: usize = counts.iter().map(|(_, c)| c).sum();
    let unique = counts.len();
    let (top, freq) = match counts.first() {
        Some((value, freq)) => (Value::String(value.clone()), json!(freq)),
        None => (Value::Null, Value::Null),
    };

    Ok(json!({
        "count": count,
        "unique": unique,
        "top": top,
        "freq": freq,
    }))
}
