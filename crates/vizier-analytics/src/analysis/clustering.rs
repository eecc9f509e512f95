//! K-means partition of rows over the numeric columns.
//!
//! This is the one analysis with a side effect beyond its result payload: on
//! success it writes the per-row cluster label back onto the dataset so the
//! visualization stage can color a scatter plot by it.

use anyhow::Result;
use polars::prelude::*;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::utils::is_numeric_dtype;

/// Cluster rows over the numeric columns and attach labels to the frame.
///
/// Requires at least 2 numeric columns and at least 1 row complete in all of
/// them; otherwise emits an empty object and leaves the frame untouched.
/// Emits per-cluster row counts.
pub(crate) fn clustering_analysis(config: &PipelineConfig, df: &mut DataFrame) -> Result<Value> {
    let numeric: Vec<(String, Vec<Option<f64>>)> = df
        .get_columns()
        .iter()
        .map(|c| c.as_materialized_series())
        .filter(|s| is_numeric_dtype(s.dtype()))
        .map(|s| {
            let float_series = s.cast(&DataType::Float64)?;
            let ca = float_series.f64()?;
            let values: Vec<Option<f64>> = ca
                .into_iter()
                .map(|v| v.filter(|f| f.is_finite()))
                .collect();
            Ok((s.name().to_string(), values))
        })
        .collect::<Result<_>>()?;

    if numeric.len() < 2 {
        debug!("Fewer than 2 numeric columns; clustering analysis is empty");
        return Ok(json!({}));
    }

    let height = df.height();
    // rows complete in every numeric column
    let complete: Vec<usize> = (0..height)
        .filter(|&row| numeric.iter().all(|(_, values)| values[row].is_some()))
        .collect();

    if complete.is_empty() {
        debug!("No complete rows; clustering analysis is empty");
        return Ok(json!({}));
    }

    // feature matrix over complete rows, z-scored per column
    let features: Vec<Vec<f64>> = complete
        .iter()
        .map(|&row| numeric.iter().map(|(_, v)| v[row].unwrap_or(0.0)).collect())
        .collect();
    let features = standardize(features);

    let k = config.cluster_count.min(complete.len());
    let assignments = kmeans(&features, k, config.cluster_max_iterations);

    // per-cluster row counts
    let mut sizes = vec![0usize; k];
    for &cluster in &assignments {
        sizes[cluster] += 1;
    }
    let mut counts = Map::new();
    for (cluster, size) in sizes.iter().enumerate() {
        counts.insert(cluster.to_string(), json!(size));
    }

    // attach labels; rows dropped for missing numerics stay null
    let mut labels: Vec<Option<u32>> = vec![None; height];
    for (pos, &row) in complete.iter().enumerate() {
        labels[row] = Some(assignments[pos] as u32);
    }
    let label_series = Series::new(config.cluster_label_column.as_str().into(), labels);
    df.with_column(label_series)?;

    debug!(
        "Clustered {} rows into {} clusters (sizes: {:?})",
        complete.len(),
        k,
        sizes
    );

    Ok(Value::Object(counts))
}

/// Z-score each column; a zero-variance column contributes 0 everywhere.
fn standardize(mut features: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    if features.is_empty() {
        return features;
    }
    let dims = features[0].len();
    let n = features.len() as f64;

    for dim in 0..dims {
        let mean = features.iter().map(|row| row[dim]).sum::<f64>() / n;
        let variance = features
            .iter()
            .map(|row| (row[dim] - mean).powi(2))
            .sum::<f64>()
            / n;
        let std = variance.sqrt();

        for row in features.iter_mut() {
            row[dim] = if std > 0.0 { (row[dim] - mean) / std } else { 0.0 };
        }
    }

    features
}

/// Lloyd's algorithm with deterministic evenly-spaced seeding.
///
/// Centroids start at rows 0, n/k, 2n/k, ... so repeated runs over the same
/// frame produce the same partition. Iterates until assignments stabilize or
/// the iteration bound is hit.
fn kmeans(features: &[Vec<f64>], k: usize, max_iterations: usize) -> Vec<usize> {
    let n = features.len();
    let mut centroids: Vec<Vec<f64>> =
        (0..k).map(|i| features[i * n / k].clone()).collect();
    let mut assignments = vec![0usize; n];

    for _ in 0..max_iterations {
        // assignment step
        let mut changed = false;
        for (row, point) in features.iter().enumerate() {
            let nearest = centroids
                .iter()
                .enumerate()
                .map(|(idx, c)| (idx, squared_distance(point, c)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            if assignments[row] != nearest {
                assignments[row] = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        // update step; an emptied cluster keeps its previous centroid
        let dims = features[0].len();
        let mut sums = vec![vec![0.0f64; dims]; k];
        let mut counts = vec![0usize; k];
        for (row, point) in features.iter().enumerate() {
            let cluster = assignments[row];
            counts[cluster] += 1;
            for (dim, value) in point.iter().enumerate() {
                sums[cluster][dim] += value;
            }
        }
        for cluster in 0..k {
            if counts[cluster] > 0 {
                for dim in 0..dims {
                    centroids[cluster][dim] = sums[cluster][dim] / counts[cluster] as f64;
                }
            }
        }
    }

    assignments
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
