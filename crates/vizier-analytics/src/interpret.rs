//! Free-text query interpretation.
//!
//! An interpreter maps a natural-language request onto the fixed analysis
//! flag set plus an explanation string. Interpretation is an external
//! collaborator: its failure must degrade to a default flag set, never
//! propagate as a pipeline error; [`resolve_flags`] enforces that.

use anyhow::bail;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::flags::{AnalysisFlags, AnalysisKind};

/// Explanation attached when interpretation fails and flags degrade to the
/// fallback set.
pub const DEGRADED_EXPLANATION: &str =
    "The query could not be interpreted; defaulting to descriptive statistics.";

/// The outcome of interpreting a query: flags plus an explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub flags: AnalysisFlags,
    pub explanation: String,
}

/// Maps free text onto the fixed analysis flag set.
pub trait QueryInterpreter: Send + Sync {
    fn interpret(&self, query: &str) -> anyhow::Result<Interpretation>;
}

/// Resolve flags through an interpreter, degrading on failure.
///
/// Any interpreter error yields [`AnalysisFlags::fallback`] with
/// [`DEGRADED_EXPLANATION`] instead of propagating.
pub fn resolve_flags(interpreter: &dyn QueryInterpreter, query: &str) -> Interpretation {
    match interpreter.interpret(query) {
        Ok(interpretation) => interpretation,
        Err(e) => {
            warn!("Query interpretation failed ({}); using fallback flags", e);
            Interpretation {
                flags: AnalysisFlags::fallback(),
                explanation: DEGRADED_EXPLANATION.to_string(),
            }
        }
    }
}

static KEYWORD_TABLE: Lazy<Vec<(Regex, AnalysisKind)>> = Lazy::new(|| {
    [
        (
            r"(?i)\b(describe|description|summar|statistic|stats|overview)",
            AnalysisKind::DescriptiveStatistics,
        ),
        (
            r"(?i)\b(correlat|relationship|related)",
            AnalysisKind::CorrelationMatrix,
        ),
        (
            r"(?i)\b(missing|null|incomplete|gaps)",
            AnalysisKind::MissingValues,
        ),
        (
            r"(?i)\b(count|frequenc|distribution|breakdown)",
            AnalysisKind::ValueCounts,
        ),
        (
            r"(?i)\b(trend|time|month|seasonal|temporal)",
            AnalysisKind::TimeSeriesAnalysis,
        ),
        (
            r"(?i)\b(cluster|segment|group)",
            AnalysisKind::ClusteringAnalysis,
        ),
    ]
    .into_iter()
    .map(|(pattern, kind)| {
        let regex = Regex::new(pattern).expect("keyword patterns are static and valid");
        (regex, kind)
    })
    .collect()
});

/// Keyword-based interpreter.
///
/// Matches a fixed regex table against the query; an empty query is an
/// interpretation failure, a query with no recognized keyword degrades to the
/// fallback flag set with a matching explanation.
pub struct KeywordInterpreter;

impl QueryInterpreter for KeywordInterpreter {
    fn interpret(&self, query: &str) -> anyhow::Result<Interpretation> {
        let query = query.trim();
        if query.is_empty() {
            bail!("empty query");
        }

        let mut flags = AnalysisFlags::none();
        let mut matched: Vec<&'static str> = Vec::new();
        for (regex, kind) in KEYWORD_TABLE.iter() {
            if regex.is_match(query) {
                flags.enable(*kind);
                matched.push(kind.as_str());
            }
        }

        if matched.is_empty() {
            debug!("No analysis keywords recognized in query");
            return Ok(Interpretation {
                flags: AnalysisFlags::fallback(),
                explanation:
                    "No specific analyses recognized; defaulting to descriptive statistics."
                        .to_string(),
            });
        }

        Ok(Interpretation {
            explanation: format!("Interpreted the query as requesting: {}.", matched.join(", ")),
            flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingInterpreter;

    impl QueryInterpreter for FailingInterpreter {
        fn interpret(&self, _query: &str) -> anyhow::Result<Interpretation> {
            bail!("interpreter offline")
        }
    }

    #[test]
    fn test_keywords_map_to_flags() {
        let interpretation = KeywordInterpreter
            .interpret("show correlations and missing values over time")
            .unwrap();

        assert!(interpretation.flags.is_enabled(AnalysisKind::CorrelationMatrix));
        assert!(interpretation.flags.is_enabled(AnalysisKind::MissingValues));
        assert!(interpretation.flags.is_enabled(AnalysisKind::TimeSeriesAnalysis));
        assert!(!interpretation.flags.is_enabled(AnalysisKind::ClusteringAnalysis));
        assert!(interpretation.explanation.contains("correlation_matrix"));
    }

    #[test]
    fn test_unrecognized_query_degrades_to_fallback() {
        let interpretation = KeywordInterpreter.interpret("make it pretty").unwrap();
        assert_eq!(interpretation.flags, AnalysisFlags::fallback());
    }

    #[test]
    fn test_empty_query_is_an_error() {
        assert!(KeywordInterpreter.interpret("   ").is_err());
    }

    #[test]
    fn test_resolve_flags_degrades_on_failure() {
        let interpretation = resolve_flags(&FailingInterpreter, "anything");
        assert_eq!(interpretation.flags, AnalysisFlags::fallback());
        assert_eq!(interpretation.explanation, DEGRADED_EXPLANATION);
    }

    #[test]
    fn test_resolve_flags_passes_success_through() {
        let interpretation = resolve_flags(&KeywordInterpreter, "cluster the customers");
        assert!(interpretation.flags.is_enabled(AnalysisKind::ClusteringAnalysis));
    }

    #[test]
    fn test_case_insensitive_matching() {
        let interpretation = KeywordInterpreter.interpret("DESCRIBE the data").unwrap();
        assert!(
            interpretation
                .flags
                .is_enabled(AnalysisKind::DescriptiveStatistics)
        );
    }
}
