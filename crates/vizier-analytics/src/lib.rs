//! Vizier Analytics
//!
//! A configurable statistical analysis and charting pipeline built on Polars,
//! with an asynchronous job queue for long-running requests.
//!
//! # Overview
//!
//! A pipeline run takes a tabular dataset through four fixed stages:
//!
//! - **Cleaning**: exact-duplicate rows removed, first occurrence kept
//! - **Coercion**: sentinel/mean fills for missing cells, temporal parsing of
//!   date-like columns, retyping of numeric-looking string columns
//! - **Analysis**: a configuration-driven selection of named analyses
//!   (descriptive statistics, correlation matrix, missing values, value
//!   counts, time-series resample, clustering), each failing independently
//! - **Visualization**: priority-ordered selection of exactly one chart (or
//!   none) plus a one-line commentary
//!
//! Everything emitted is normalized to plain JSON primitives first; no
//! engine-native scalar ever reaches egress.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use vizier_analytics::{AnalysisFlags, AnalysisKind, Pipeline};
//!
//! let pipeline = Pipeline::builder().build()?;
//! let flags = AnalysisFlags::none()
//!     .with(AnalysisKind::DescriptiveStatistics)
//!     .with(AnalysisKind::CorrelationMatrix);
//!
//! let result = pipeline.process(df, &flags, "Default styling.")?;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! ```
//!
//! # Deferred execution
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vizier_analytics::{
//!     AnalyticsJobExecutor, DatasetSource, JobQueue, JobRequest,
//! };
//!
//! let queue = JobQueue::start(Arc::new(executor), 4);
//! let id = queue.enqueue(JobRequest::Analysis {
//!     source: DatasetSource::Path("data.csv".into()),
//!     flags,
//!     styling: "Default styling.".to_string(),
//! })?;
//!
//! // poll until terminal; unknown ids are a distinct not-found outcome
//! while let Some(view) = queue.poll(&id) {
//!     if view.state.is_terminal() { break; }
//! }
//! ```

pub mod analysis;
pub mod blob;
pub mod cleaner;
pub mod coerce;
pub mod config;
pub mod error;
pub mod flags;
pub mod generate;
pub mod interpret;
pub mod jobs;
pub mod normalize;
pub mod pipeline;
pub mod utils;
pub mod viz;

// Re-exports for convenient access
pub use analysis::Analyzer;
pub use blob::{BlobStore, DirectoryBlobStore, upload_chart};
pub use cleaner::DataCleaner;
pub use coerce::TypeCoercer;
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use error::{AnalysisError, DataError, JobError, PipelineError, VisualizationError};
pub use flags::{AnalysisFlags, AnalysisKind, AnalysisResults};
pub use generate::{
    EchoGenerator, FALLBACK_TEXT, GenerationOutcome, ImageGenerator, TextGenerator,
    run_generation,
};
pub use interpret::{
    DEGRADED_EXPLANATION, Interpretation, KeywordInterpreter, QueryInterpreter, resolve_flags,
};
pub use jobs::{
    AnalyticsJobExecutor, DatasetSource, JobExecutor, JobId, JobQueue, JobRequest, JobState,
    JobView, read_csv,
};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineResult};
pub use viz::{ChartData, ChartKind, ChartSpec, Visualizer};
