//! Analysis selection and result types.
//!
//! The set of analyses is closed and versioned: adding one requires a new
//! [`AnalysisKind`] variant plus a new row in the analysis dispatch table.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

use crate::normalize::normalize;

/// The fixed universe of named analyses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Per-column summary statistics.
    DescriptiveStatistics,
    /// Pairwise Pearson correlation over numeric columns.
    CorrelationMatrix,
    /// Per-column null counts.
    MissingValues,
    /// Per categorical column, observed value -> occurrence count.
    ValueCounts,
    /// Monthly resample of numeric columns over the first temporal column.
    TimeSeriesAnalysis,
    /// K-means partition of rows over the numeric columns.
    ClusteringAnalysis,
}

impl AnalysisKind {
    /// Every valid analysis, in dispatch order.
    pub const ALL: [AnalysisKind; 6] = [
        AnalysisKind::DescriptiveStatistics,
        AnalysisKind::CorrelationMatrix,
        AnalysisKind::MissingValues,
        AnalysisKind::ValueCounts,
        AnalysisKind::TimeSeriesAnalysis,
        AnalysisKind::ClusteringAnalysis,
    ];

    /// The wire name of the analysis.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DescriptiveStatistics => "descriptive_statistics",
            Self::CorrelationMatrix => "correlation_matrix",
            Self::MissingValues => "missing_values",
            Self::ValueCounts => "value_counts",
            Self::TimeSeriesAnalysis => "time_series_analysis",
            Self::ClusteringAnalysis => "clustering_analysis",
        }
    }

    /// Parse a wire name into a kind. Unknown names yield None.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().find(|kind| kind.as_str() == name).copied()
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which analyses a pipeline run should compute.
///
/// Missing kinds default to disabled; unknown names in an ingress map are
/// ignored rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFlags {
    enabled: BTreeSet<AnalysisKind>,
}

impl AnalysisFlags {
    /// No analyses enabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every analysis enabled.
    pub fn all() -> Self {
        Self {
            enabled: AnalysisKind::ALL.iter().copied().collect(),
        }
    }

    /// The degraded default used when flag ingress fails: descriptive
    /// statistics only.
    pub fn fallback() -> Self {
        Self::none().with(AnalysisKind::DescriptiveStatistics)
    }

    /// Builder-style enable.
    pub fn with(mut self, kind: AnalysisKind) -> Self {
        self.enabled.insert(kind);
        self
    }

    /// Enable a kind in place.
    pub fn enable(&mut self, kind: AnalysisKind) {
        self.enabled.insert(kind);
    }

    /// Build from a name -> bool map. Unknown names are ignored.
    pub fn from_map(map: &HashMap<String, bool>) -> Self {
        let mut flags = Self::none();
        for (name, enabled) in map {
            match AnalysisKind::parse(name) {
                Some(kind) if *enabled => flags.enable(kind),
                Some(_) => {}
                None => debug!("Ignoring unknown analysis flag '{}'", name),
            }
        }
        flags
    }

    /// Build from a list of wire names, ignoring unknown ones.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut flags = Self::none();
        for name in names {
            match AnalysisKind::parse(name.trim()) {
                Some(kind) => flags.enable(kind),
                None => debug!("Ignoring unknown analysis name '{}'", name),
            }
        }
        flags
    }

    pub fn is_enabled(&self, kind: AnalysisKind) -> bool {
        self.enabled.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }

    /// Enabled kinds in dispatch order.
    pub fn enabled_kinds(&self) -> impl Iterator<Item = AnalysisKind> + '_ {
        AnalysisKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.enabled.contains(kind))
    }
}

/// Results of the analyses that ran and succeeded.
///
/// Keys are the subset of enabled analyses whose computation succeeded.
/// Every value has passed through the normalizer, so leaves are primitives
/// only: no engine-native scalar escapes this structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisResults(BTreeMap<AnalysisKind, Value>);

impl AnalysisResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result payload, normalizing it on the way in.
    pub fn insert(&mut self, kind: AnalysisKind, payload: Value) {
        self.0.insert(kind, normalize(payload));
    }

    pub fn get(&self, kind: AnalysisKind) -> Option<&Value> {
        self.0.get(&kind)
    }

    pub fn contains(&self, kind: AnalysisKind) -> bool {
        self.0.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn kinds(&self) -> impl Iterator<Item = AnalysisKind> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnalysisKind, &Value)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }
}
