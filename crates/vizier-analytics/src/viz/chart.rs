//! Serializable chart descriptions.
//!
//! A [`ChartSpec`] is self-contained and re-renderable: it carries the chart
//! kind, axis labels, the styling label, and the full data payload, so a
//! renderer (or blob store) needs nothing beyond the spec itself.

use serde::{Deserialize, Serialize};

/// The chart families the visualization stage can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Heatmap,
    Line,
    Scatter,
}

/// Chart data payload, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    Bar {
        categories: Vec<String>,
        values: Vec<f64>,
    },
    Heatmap {
        columns: Vec<String>,
        /// Row-major coefficient grid; null marks an undefined coefficient.
        matrix: Vec<Vec<Option<f64>>>,
    },
    Line {
        metric: String,
        periods: Vec<String>,
        values: Vec<f64>,
    },
    Scatter {
        x: Vec<Option<f64>>,
        y: Vec<Option<f64>>,
        /// Per-point cluster labels when the scatter is colored by cluster.
        #[serde(skip_serializing_if = "Option::is_none")]
        labels: Option<Vec<Option<u32>>>,
    },
}

/// A single rendered visualization of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Opaque styling label attached to output; no options are interpreted.
    pub styling: String,
    pub data: ChartData,
}
