//! Analysis stage.
//!
//! Dispatch is a single closed table mapping [`AnalysisKind`] to its compute
//! function; adding an analysis is one table row plus one enum variant. Each
//! enabled analysis runs independently: a computation failure is logged and
//! its key omitted from the result map, never aborting the others.

mod clustering;
mod correlation;
mod counts;
mod descriptive;
mod timeseries;

use polars::prelude::*;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::AnalysisError;
use crate::flags::{AnalysisFlags, AnalysisKind, AnalysisResults};

/// Compute function for one analysis.
///
/// Takes the frame mutably because `clustering_analysis` attaches its label
/// column; every other analysis only reads.
type ComputeFn = fn(&PipelineConfig, &mut DataFrame) -> anyhow::Result<Value>;

/// The closed dispatch table, in execution order.
const DISPATCH: [(AnalysisKind, ComputeFn); 6] = [
    (AnalysisKind::DescriptiveStatistics, run_descriptive),
    (AnalysisKind::CorrelationMatrix, run_correlation),
    (AnalysisKind::MissingValues, run_missing_values),
    (AnalysisKind::ValueCounts, run_value_counts),
    (AnalysisKind::TimeSeriesAnalysis, run_time_series),
    (AnalysisKind::ClusteringAnalysis, clustering::clustering_analysis),
];

fn run_descriptive(_config: &PipelineConfig, df: &mut DataFrame) -> anyhow::Result<Value> {
    descriptive::describe(df)
}

fn run_correlation(_config: &PipelineConfig, df: &mut DataFrame) -> anyhow::Result<Value> {
    correlation::correlation_matrix(df)
}

fn run_missing_values(_config: &PipelineConfig, df: &mut DataFrame) -> anyhow::Result<Value> {
    counts::missing_values(df)
}

fn run_value_counts(_config: &PipelineConfig, df: &mut DataFrame) -> anyhow::Result<Value> {
    counts::value_counts(df)
}

fn run_time_series(_config: &PipelineConfig, df: &mut DataFrame) -> anyhow::Result<Value> {
    timeseries::time_series_analysis(df)
}

/// Analyzer for the third pipeline stage.
pub struct Analyzer {
    config: PipelineConfig,
}

impl Analyzer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Run every enabled analysis over the coerced frame.
    ///
    /// Returns exactly the subset of enabled kinds whose computation
    /// succeeded. Fails only on a structurally invalid frame.
    pub fn analyze(
        &self,
        df: &mut DataFrame,
        flags: &AnalysisFlags,
    ) -> Result<AnalysisResults, AnalysisError> {
        if df.width() == 0 {
            return Err(AnalysisError::EmptyDataset);
        }

        info!("Running analyses...");
        let mut results = AnalysisResults::new();

        for (kind, compute) in DISPATCH {
            if !flags.is_enabled(kind) {
                continue;
            }
            match compute(&self.config, df) {
                Ok(payload) => {
                    debug!("Analysis '{}' completed", kind);
                    results.insert(kind, payload);
                }
                Err(e) => {
                    warn!("Analysis '{}' failed and was omitted: {}", kind, e);
                }
            }
        }

        info!("{} of {} requested analyses produced results",
            results.len(),
            flags.enabled_kinds().count()
        );

        Ok(results)
    }
}
