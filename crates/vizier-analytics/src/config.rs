//! Configuration for the analysis pipeline.
//!
//! Built once at process start via the builder, validated, and immutable
//! afterwards; stage logic never consults ambient global state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures for [`PipelineConfig`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("cluster_count must be at least 2, got {0}")]
    ClusterCountTooSmall(usize),

    #[error("cluster_max_iterations must be at least 1")]
    NoClusterIterations,
}

/// Configuration for the analysis pipeline.
///
/// Use [`PipelineConfig::builder()`] for fluent construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sentinel value filled into missing categorical cells.
    /// Default: "Unknown"
    pub categorical_sentinel: String,

    /// Case-insensitive substring marking a column as date-like.
    /// Default: "date"
    pub date_column_marker: String,

    /// Number of clusters for the clustering analysis.
    /// Default: 3
    pub cluster_count: usize,

    /// Iteration bound for the clustering loop.
    /// Default: 100
    pub cluster_max_iterations: usize,

    /// Name of the column the clustering analysis writes labels into.
    /// Default: "cluster"
    pub cluster_label_column: String,

    /// Styling label attached to chart output when the caller supplies none.
    /// Default: "Default styling."
    pub default_styling: String,

    /// URL returned for a chart when the blob store fails.
    /// Default: "static/images/placeholder.png"
    pub placeholder_chart_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            categorical_sentinel: "Unknown".to_string(),
            date_column_marker: "date".to_string(),
            cluster_count: 3,
            cluster_max_iterations: 100,
            cluster_label_column: "cluster".to_string(),
            default_styling: "Default styling.".to_string(),
            placeholder_chart_url: "static/images/placeholder.png".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.categorical_sentinel.is_empty() {
            return Err(ConfigValidationError::EmptyField {
                field: "categorical_sentinel",
            });
        }
        if self.date_column_marker.is_empty() {
            return Err(ConfigValidationError::EmptyField {
                field: "date_column_marker",
            });
        }
        if self.cluster_label_column.is_empty() {
            return Err(ConfigValidationError::EmptyField {
                field: "cluster_label_column",
            });
        }
        if self.cluster_count < 2 {
            return Err(ConfigValidationError::ClusterCountTooSmall(
                self.cluster_count,
            ));
        }
        if self.cluster_max_iterations == 0 {
            return Err(ConfigValidationError::NoClusterIterations);
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn categorical_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.config.categorical_sentinel = sentinel.into();
        self
    }

    pub fn date_column_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.date_column_marker = marker.into();
        self
    }

    pub fn cluster_count(mut self, count: usize) -> Self {
        self.config.cluster_count = count;
        self
    }

    pub fn cluster_max_iterations(mut self, iterations: usize) -> Self {
        self.config.cluster_max_iterations = iterations;
        self
    }

    pub fn cluster_label_column(mut self, name: impl Into<String>) -> Self {
        self.config.cluster_label_column = name.into();
        self
    }

    pub fn default_styling(mut self, styling: impl Into<String>) -> Self {
        self.config.default_styling = styling.into();
        self
    }

    pub fn placeholder_chart_url(mut self, url: impl Into<String>) -> Self {
        self.config.placeholder_chart_url = url.into();
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
