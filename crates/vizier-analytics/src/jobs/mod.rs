//! Deferred execution: jobs, the shared queue, and the worker pool.
//!
//! A job moves `Queued -> Running -> {Succeeded | Failed}` and is immutable
//! once terminal. Pollers read the current snapshot and may observe a stale
//! non-terminal state; visibility is eventual, not linearizable.

mod executor;
mod queue;

pub use executor::{AnalyticsJobExecutor, JobExecutor, read_csv};
pub use queue::JobQueue;

use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::flags::AnalysisFlags;

/// Opaque job identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    /// Terminal states are never left again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Where a deferred run's tabular input comes from.
///
/// A path is a reference to previously persisted input; the worker resolves
/// it into a frame before running the pipeline.
#[derive(Debug, Clone)]
pub enum DatasetSource {
    Path(PathBuf),
    InMemory(DataFrame),
}

/// The payload of a deferred execution.
#[derive(Debug, Clone)]
pub enum JobRequest {
    /// A full pipeline run.
    Analysis {
        source: DatasetSource,
        flags: AnalysisFlags,
        styling: String,
    },
    /// An unrelated content-generation task.
    Generation {
        text_prompt: String,
        image_prompt: String,
    },
}

/// Internal job record; mutated only by the worker that claimed it.
#[derive(Debug, Clone)]
pub(crate) struct JobRecord {
    pub id: JobId,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl JobRecord {
    pub(crate) fn queued(id: JobId) -> Self {
        Self {
            id,
            state: JobState::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    pub(crate) fn view(&self) -> JobView {
        JobView {
            id: self.id,
            state: self.state,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

/// Poll snapshot of a job.
///
/// `result` is present iff the job Succeeded; `error` iff it Failed. A
/// non-existent id yields no view at all, which is distinct from every state.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
