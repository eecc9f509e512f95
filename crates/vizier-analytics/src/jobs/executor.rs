//! Job execution.
//!
//! The executor is the seam between the queue machinery and the work itself:
//! workers hand it a claimed payload and store whatever comes back. The
//! default executor wraps a [`Pipeline`] for analysis jobs and the content
//! generators for generation jobs.

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::{DatasetSource, JobRequest};
use crate::blob::BlobStore;
use crate::error::JobError;
use crate::generate::{ImageGenerator, TextGenerator, run_generation};
use crate::pipeline::Pipeline;

/// Executes a claimed job payload.
pub trait JobExecutor: Send + Sync {
    fn execute(&self, request: JobRequest) -> Result<Value, JobError>;
}

/// Default executor: pipeline runs plus generation tasks.
pub struct AnalyticsJobExecutor {
    pipeline: Pipeline,
    text_generator: Arc<dyn TextGenerator>,
    image_generator: Arc<dyn ImageGenerator>,
    blob_store: Arc<dyn BlobStore>,
}

impl AnalyticsJobExecutor {
    pub fn new(
        pipeline: Pipeline,
        text_generator: Arc<dyn TextGenerator>,
        image_generator: Arc<dyn ImageGenerator>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            pipeline,
            text_generator,
            image_generator,
            blob_store,
        }
    }

    /// Resolve a dataset reference into an owned frame.
    fn resolve_source(source: DatasetSource) -> Result<DataFrame, JobError> {
        match source {
            DatasetSource::InMemory(df) => Ok(df),
            DatasetSource::Path(path) => {
                debug!("Resolving dataset reference {:?}", path);
                read_csv(&path).map_err(|e| JobError::SourceResolution(e.to_string()))
            }
        }
    }
}

impl JobExecutor for AnalyticsJobExecutor {
    fn execute(&self, request: JobRequest) -> Result<Value, JobError> {
        match request {
            JobRequest::Analysis {
                source,
                flags,
                styling,
            } => {
                let df = Self::resolve_source(source)?;
                let result = self
                    .pipeline
                    .process(df, &flags, &styling)
                    .map_err(|e| JobError::Execution(e.to_string()))?;
                Ok(serde_json::to_value(&result)?)
            }
            JobRequest::Generation {
                text_prompt,
                image_prompt,
            } => {
                // generator failures degrade content; the job itself succeeds
                let outcome = run_generation(
                    self.text_generator.as_ref(),
                    self.image_generator.as_ref(),
                    self.blob_store.as_ref(),
                    &text_prompt,
                    &image_prompt,
                    &self.pipeline.config().placeholder_chart_url,
                );
                Ok(serde_json::to_value(&outcome)?)
            }
        }
    }
}

/// Read a CSV file into a frame, the way every ingress in this crate does.
pub fn read_csv(path: &Path) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}
