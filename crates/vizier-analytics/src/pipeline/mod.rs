//! The main analysis pipeline.
//!
//! Composes the four stages (clean, coerce, analyze, visualize) in fixed
//! order over an owned frame. Coercion must run before analysis, which
//! must run before visualization: later stages assume coerced types and
//! normalized nulls. A visualization failure does not abort the run; the
//! analysis results are still returned with a chart failure indicator.

use polars::prelude::*;
use serde::Serialize;
use tracing::{error, info};

use crate::analysis::Analyzer;
use crate::cleaner::DataCleaner;
use crate::coerce::TypeCoercer;
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::PipelineError;
use crate::flags::{AnalysisFlags, AnalysisResults};
use crate::interpret::{QueryInterpreter, resolve_flags};
use crate::viz::{ChartSpec, Visualizer};

/// The outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Results of the analyses that ran and succeeded.
    pub analysis: AnalysisResults,

    /// The single selected chart, if any branch produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,

    /// Present iff chart construction failed after analysis succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_error: Option<String>,

    /// One-line natural-language commentary on the visualization outcome.
    pub commentary: String,

    /// The interpreter's explanation, when flags came from a free-text query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// The main analysis pipeline.
///
/// Use [`Pipeline::builder()`] to construct one from a validated
/// configuration.
pub struct Pipeline {
    config: PipelineConfig,
    cleaner: DataCleaner,
    coercer: TypeCoercer,
    analyzer: Analyzer,
    visualizer: Visualizer,
}

// The pipeline moves into worker threads for deferred execution.
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    fn new(config: PipelineConfig) -> Self {
        Self {
            cleaner: DataCleaner,
            coercer: TypeCoercer::new(&config),
            analyzer: Analyzer::new(&config),
            visualizer: Visualizer::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline over an owned frame.
    ///
    /// # Errors
    ///
    /// Structural dataset errors from cleaning/coercion and structural
    /// analysis errors abort the run. Visualization failures do not: the
    /// result then carries `chart_error` and no chart.
    pub fn process(
        &self,
        df: DataFrame,
        flags: &AnalysisFlags,
        styling: &str,
    ) -> Result<PipelineResult, PipelineError> {
        info!(
            "Starting analysis pipeline ({} rows, {} columns)...",
            df.height(),
            df.width()
        );

        let df = self.cleaner.clean(df)?;
        let mut df = self.coercer.coerce(df)?;
        let analysis = self.analyzer.analyze(&mut df, flags)?;

        let (chart, chart_error, commentary) =
            match self.visualizer.visualize(&df, &analysis, styling) {
                Ok((chart, commentary)) => (chart, None, commentary),
                Err(e) => {
                    error!("Visualization failed: {}", e);
                    (
                        None,
                        Some(e.to_string()),
                        "No visualizations generated based on the analysis results.".to_string(),
                    )
                }
            };

        info!("Pipeline completed");
        Ok(PipelineResult {
            analysis,
            chart,
            chart_error,
            commentary,
            explanation: None,
        })
    }

    /// Run the pipeline with flags produced by a query interpreter.
    ///
    /// Interpreter failure degrades to the fallback flag set and never
    /// surfaces as a pipeline error; the interpretation's explanation string
    /// is attached to the result.
    pub fn process_with_query(
        &self,
        df: DataFrame,
        query: &str,
        interpreter: &dyn QueryInterpreter,
        styling: &str,
    ) -> Result<PipelineResult, PipelineError> {
        let interpretation = resolve_flags(interpreter, query);
        let mut result = self.process(df, &interpretation.flags, styling)?;
        result.explanation = Some(interpretation.explanation);
        Ok(result)
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
}

impl PipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Validate the configuration and build the pipeline.
    pub fn build(self) -> Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(Pipeline::new(config))
    }
}
