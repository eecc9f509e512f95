//! Error types for the analysis pipeline and job system.
//!
//! Each stage family has its own `thiserror` enum; `PipelineError` is the
//! umbrella surfaced to callers of the synchronous path. Errors serialize as
//! `{code, message}` so they can cross a JSON boundary unchanged.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Structural dataset problems. Fatal to the stage that raises them.
#[derive(Error, Debug)]
pub enum DataError {
    /// The dataset has no columns at all.
    #[error("Dataset has no columns")]
    EmptyDataset,

    /// A named column was expected but is missing.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl DataError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyDataset => "EMPTY_DATASET",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Polars(_) => "POLARS_ERROR",
        }
    }
}

/// Structural analysis failures.
///
/// Per-analysis computation failures are not represented here: they are
/// swallowed by the analysis stage, logged, and the analysis key omitted from
/// the result map.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The dataset has no columns to analyze.
    #[error("Dataset has no columns to analyze")]
    EmptyDataset,

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl AnalysisError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyDataset => "ANALYSIS_EMPTY_DATASET",
            Self::Polars(_) => "POLARS_ERROR",
        }
    }
}

/// Chart construction failures.
///
/// Aborts only the visualization stage: analysis results already computed are
/// still returned alongside a chart failure indicator.
#[derive(Error, Debug)]
pub enum VisualizationError {
    /// A chart could not be assembled from the selected analysis result.
    #[error("Chart construction failed: {0}")]
    ChartConstruction(String),

    /// A column the selected chart needs is not on the dataset.
    #[error("Column '{0}' required for the chart is missing")]
    MissingColumn(String),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl VisualizationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ChartConstruction(_) => "CHART_CONSTRUCTION_FAILED",
            Self::MissingColumn(_) => "CHART_COLUMN_MISSING",
            Self::Polars(_) => "POLARS_ERROR",
        }
    }
}

/// Job system failures.
///
/// A wrapped operation's failure is captured into the job's Failed state and
/// never thrown back through the enqueue call; these variants cover the queue
/// machinery itself plus the executor-side failures a worker records.
#[derive(Error, Debug)]
pub enum JobError {
    /// The queue no longer accepts work.
    #[error("Job queue is shut down")]
    QueueClosed,

    /// A dataset reference could not be resolved into a frame.
    #[error("Failed to resolve dataset source: {0}")]
    SourceResolution(String),

    /// The wrapped operation failed.
    #[error("Job execution failed: {0}")]
    Execution(String),

    /// JSON serialization of a job result failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl JobError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::QueueClosed => "QUEUE_CLOSED",
            Self::SourceResolution(_) => "SOURCE_RESOLUTION_FAILED",
            Self::Execution(_) => "JOB_EXECUTION_FAILED",
            Self::Json(_) => "JSON_ERROR",
        }
    }
}

/// Umbrella error for a synchronous pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Visualization(#[from] VisualizationError),
}

impl PipelineError {
    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Data(e) => e.error_code(),
            Self::Analysis(e) => e.error_code(),
            Self::Visualization(e) => e.error_code(),
        }
    }
}

/// Serialize as a `{code, message}` struct for JSON egress.
impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl Serialize for JobError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("JobError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
