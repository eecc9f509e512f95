//! Pairwise Pearson correlation over numeric columns.

use anyhow::Result;
use polars::prelude::*;
use serde_json::{Map, Value, json};

use crate::normalize::json_f64;
use crate::utils::is_numeric_dtype;

/// Compute the correlation matrix over the numeric columns.
///
/// Fewer than two numeric columns yields an empty object, not an error.
/// Coefficients are computed over pairwise-complete observations; a
/// zero-variance pair has no defined coefficient and emits null.
pub(crate) fn correlation_matrix(df: &DataFrame) -> Result<Value> {
    let numeric: Vec<(String, Vec<Option<f64>>)> = df
        .get_columns()
        .iter()
        .map(|c| c.as_materialized_series())
        .filter(|s| is_numeric_dtype(s.dtype()))
        .map(|s| {
            let values = column_values(s)?;
            Ok((s.name().to_string(), values))
        })
        .collect::<Result<_>>()?;

    if numeric.len() < 2 {
        return Ok(json!({}));
    }

    let mut matrix = Map::new();
    for (row_name, row_values) in &numeric {
        let mut row = Map::new();
        for (col_name, col_values) in &numeric {
            row.insert(col_name.clone(), json_f64(pearson(row_values, col_values)));
        }
        matrix.insert(row_name.clone(), Value::Object(row));
    }

    Ok(Value::Object(matrix))
}

fn column_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let float_series = series.cast(&DataType::Float64)?;
    let ca = float_series.f64()?;
    Ok(ca
        .into_iter()
        .map(|v| v.filter(|f| f.is_finite()))
        .collect())
}

/// Pearson correlation over pairwise-complete observations.
///
/// Returns NaN when fewer than two complete pairs exist or either side has
/// zero variance; the caller's normalization turns that into null.
fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();

    let n = pairs.len() as f64;
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    cov / denom
}
