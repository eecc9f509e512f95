//! Visualization stage.
//!
//! Chart selection is a priority-ordered rule list evaluated first-match-wins:
//! exactly one chart (or none) comes out of a pipeline run even when several
//! analyses succeeded. Each rule pairs a pure predicate with a render
//! function; a matching rule may still decline to produce a chart, in which
//! case its commentary says why.

mod chart;

pub use chart::{ChartData, ChartKind, ChartSpec};

use polars::prelude::*;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::VisualizationError;
use crate::flags::{AnalysisKind, AnalysisResults};
use crate::utils::is_numeric_dtype;

/// Outcome of the visualization stage: at most one chart, always commentary.
pub type VizOutcome = (Option<ChartSpec>, String);

struct VizContext<'a> {
    df: &'a DataFrame,
    results: &'a AnalysisResults,
    styling: &'a str,
    label_column: &'a str,
}

struct ChartRule {
    name: &'static str,
    applies: fn(&VizContext<'_>) -> bool,
    render: fn(&VizContext<'_>) -> Result<VizOutcome, VisualizationError>,
}

/// Priority order: descriptive bar beats correlation heatmap beats
/// time-series line beats cluster scatter; a plain scatter is the fallback.
const RULES: [ChartRule; 4] = [
    ChartRule {
        name: "descriptive_means_bar",
        applies: descriptive_applies,
        render: render_descriptive_bar,
    },
    ChartRule {
        name: "correlation_heatmap",
        applies: correlation_applies,
        render: render_correlation_heatmap,
    },
    ChartRule {
        name: "time_series_line",
        applies: time_series_applies,
        render: render_time_series_line,
    },
    ChartRule {
        name: "cluster_scatter",
        applies: cluster_applies,
        render: render_cluster_scatter,
    },
];

/// Visualizer for the fourth pipeline stage.
pub struct Visualizer {
    config: PipelineConfig,
}

impl Visualizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Select and render at most one chart from the analysis results.
    ///
    /// Absence of a chart is a valid outcome, not an error; the commentary
    /// always explains what happened.
    pub fn visualize(
        &self,
        df: &DataFrame,
        results: &AnalysisResults,
        styling: &str,
    ) -> Result<VizOutcome, VisualizationError> {
        let ctx = VizContext {
            df,
            results,
            styling,
            label_column: &self.config.cluster_label_column,
        };

        for rule in &RULES {
            if (rule.applies)(&ctx) {
                debug!("Chart rule '{}' selected", rule.name);
                let outcome = (rule.render)(&ctx)?;
                if outcome.0.is_some() {
                    info!("Generated {} chart", rule.name);
                }
                return Ok(outcome);
            }
        }

        render_fallback_scatter(&ctx)
    }
}

// ============================================================================
// Rule predicates
// ============================================================================

fn descriptive_applies(ctx: &VizContext<'_>) -> bool {
    ctx.results.contains(AnalysisKind::DescriptiveStatistics)
}

fn correlation_applies(ctx: &VizContext<'_>) -> bool {
    ctx.results.contains(AnalysisKind::CorrelationMatrix)
}

fn time_series_applies(ctx: &VizContext<'_>) -> bool {
    ctx.results
        .get(AnalysisKind::TimeSeriesAnalysis)
        .and_then(|v| v.as_object())
        .is_some_and(|map| !map.is_empty())
}

fn cluster_applies(ctx: &VizContext<'_>) -> bool {
    ctx.results.contains(AnalysisKind::ClusteringAnalysis)
        && ctx.df.column(ctx.label_column).is_ok()
        && numeric_column_names(ctx).len() >= 2
}

// ============================================================================
// Render functions
// ============================================================================

fn render_descriptive_bar(ctx: &VizContext<'_>) -> Result<VizOutcome, VisualizationError> {
    let stats = ctx
        .results
        .get(AnalysisKind::DescriptiveStatistics)
        .and_then(|v| v.as_object());

    let mut categories = Vec::new();
    let mut means = Vec::new();
    if let Some(stats) = stats {
        for (column, summary) in stats {
            if let Some(mean) = summary.get("mean").and_then(|m| m.as_f64()) {
                categories.push(column.clone());
                means.push(mean);
            }
        }
    }

    if means.is_empty() {
        return Ok((
            None,
            "No numerical columns with mean values found for visualization.".to_string(),
        ));
    }

    let spec = ChartSpec {
        kind: ChartKind::Bar,
        title: "Mean Values of Columns".to_string(),
        x_label: "Column".to_string(),
        y_label: "Mean Value".to_string(),
        styling: ctx.styling.to_string(),
        data: ChartData::Bar {
            categories,
            values: means,
        },
    };
    let commentary =
        "Generated a bar chart showcasing the mean values of each numeric column.".to_string();
    Ok((Some(spec), commentary))
}

fn render_correlation_heatmap(ctx: &VizContext<'_>) -> Result<VizOutcome, VisualizationError> {
    let matrix_obj = ctx
        .results
        .get(AnalysisKind::CorrelationMatrix)
        .and_then(|v| v.as_object());

    let Some(matrix_obj) = matrix_obj.filter(|m| !m.is_empty()) else {
        return Ok((
            None,
            "Correlation matrix is empty; no heatmap was generated.".to_string(),
        ));
    };

    let columns: Vec<String> = matrix_obj.keys().cloned().collect();
    let matrix: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| {
                    matrix_obj
                        .get(row)
                        .and_then(|r| r.get(col))
                        .and_then(|v| v.as_f64())
                })
                .collect()
        })
        .collect();

    let spec = ChartSpec {
        kind: ChartKind::Heatmap,
        title: "Correlation Matrix".to_string(),
        x_label: "Variables".to_string(),
        y_label: "Variables".to_string(),
        styling: ctx.styling.to_string(),
        data: ChartData::Heatmap { columns, matrix },
    };
    let commentary =
        "Generated a heatmap displaying the correlation matrix of the dataset.".to_string();
    Ok((Some(spec), commentary))
}

fn render_time_series_line(ctx: &VizContext<'_>) -> Result<VizOutcome, VisualizationError> {
    let series_obj = ctx
        .results
        .get(AnalysisKind::TimeSeriesAnalysis)
        .and_then(|v| v.as_object());

    // the predicate guarantees a non-empty object; first metric wins
    let Some((metric, points)) = series_obj.and_then(|m| m.iter().next()) else {
        return Err(VisualizationError::ChartConstruction(
            "time series result disappeared between selection and render".to_string(),
        ));
    };

    let mut periods = Vec::new();
    let mut values = Vec::new();
    if let Some(points) = points.as_object() {
        for (period, value) in points {
            if let Some(value) = value.as_f64() {
                periods.push(period.clone());
                values.push(value);
            }
        }
    }

    let metric = metric.clone();
    let spec = ChartSpec {
        kind: ChartKind::Line,
        title: format!("Monthly Mean of {}", metric),
        x_label: "Month".to_string(),
        y_label: metric.clone(),
        styling: ctx.styling.to_string(),
        data: ChartData::Line {
            metric: metric.clone(),
            periods,
            values,
        },
    };
    let commentary = format!(
        "Generated a line chart of monthly mean {} over time.",
        metric
    );
    Ok((Some(spec), commentary))
}

fn render_cluster_scatter(ctx: &VizContext<'_>) -> Result<VizOutcome, VisualizationError> {
    let numeric = numeric_column_names(ctx);
    let (x_name, y_name) = (&numeric[0], &numeric[1]);

    let x = column_points(ctx.df, x_name)?;
    let y = column_points(ctx.df, y_name)?;
    let labels = cluster_labels(ctx.df, ctx.label_column)?;

    let spec = ChartSpec {
        kind: ChartKind::Scatter,
        title: format!("{} vs {} by Cluster", x_name, y_name),
        x_label: x_name.clone(),
        y_label: y_name.clone(),
        styling: ctx.styling.to_string(),
        data: ChartData::Scatter {
            x,
            y,
            labels: Some(labels),
        },
    };
    let commentary = format!(
        "Generated a scatter plot of {} vs {} colored by cluster assignment.",
        x_name, y_name
    );
    Ok((Some(spec), commentary))
}

fn render_fallback_scatter(ctx: &VizContext<'_>) -> Result<VizOutcome, VisualizationError> {
    let numeric = numeric_column_names(ctx);
    if numeric.len() < 2 {
        return Ok((
            None,
            "No visualizations generated based on the analysis results.".to_string(),
        ));
    }

    let (x_name, y_name) = (&numeric[0], &numeric[1]);
    let x = column_points(ctx.df, x_name)?;
    let y = column_points(ctx.df, y_name)?;

    let spec = ChartSpec {
        kind: ChartKind::Scatter,
        title: format!("{} vs {}", x_name, y_name),
        x_label: x_name.clone(),
        y_label: y_name.clone(),
        styling: ctx.styling.to_string(),
        data: ChartData::Scatter { x, y, labels: None },
    };
    let commentary = format!("Generated a scatter plot of {} vs {}.", x_name, y_name);
    Ok((Some(spec), commentary))
}

// ============================================================================
// Helpers
// ============================================================================

/// Numeric columns usable as chart axes, excluding the cluster label column.
fn numeric_column_names(ctx: &VizContext<'_>) -> Vec<String> {
    ctx.df
        .get_columns()
        .iter()
        .map(|c| c.as_materialized_series())
        .filter(|s| is_numeric_dtype(s.dtype()) && s.name().as_str() != ctx.label_column)
        .map(|s| s.name().to_string())
        .collect()
}

fn column_points(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, VisualizationError> {
    let col = df
        .column(name)
        .map_err(|_| VisualizationError::MissingColumn(name.to_string()))?;
    let float_series = col.as_materialized_series().cast(&DataType::Float64)?;
    let ca = float_series.f64()?;
    Ok(ca
        .into_iter()
        .map(|v| v.filter(|f| f.is_finite()))
        .collect())
}

fn cluster_labels(df: &DataFrame, name: &str) -> Result<Vec<Option<u32>>, VisualizationError> {
    let col = df
        .column(name)
        .map_err(|_| VisualizationError::MissingColumn(name.to_string()))?;
    let int_series = col.as_materialized_series().cast(&DataType::UInt32)?;
    let ca = int_series.u32()?;
    Ok(ca.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::flags::AnalysisFlags;
    use serde_json::json;

    fn visualizer() -> Visualizer {
        Visualizer::new(&PipelineConfig::default())
    }

    fn results_with(kind: AnalysisKind, payload: serde_json::Value) -> AnalysisResults {
        let mut results = AnalysisResults::new();
        results.insert(kind, payload);
        results
    }

    fn numeric_frame() -> DataFrame {
        df!(
            "a" => &[1.0f64, 2.0, 3.0],
            "b" => &[4.0f64, 5.0, 6.0],
        )
        .unwrap()
    }

    #[test]
    fn test_descriptive_means_win_over_correlation() {
        let df = numeric_frame();
        let mut results = results_with(
            AnalysisKind::DescriptiveStatistics,
            json!({"a": {"mean": 2.0, "count": 3}}),
        );
        results.insert(
            AnalysisKind::CorrelationMatrix,
            json!({"a": {"a": 1.0, "b": 0.5}, "b": {"a": 0.5, "b": 1.0}}),
        );

        let (chart, _commentary) = visualizer().visualize(&df, &results, "Default styling.").unwrap();
        assert_eq!(chart.unwrap().kind, ChartKind::Bar);
    }

    #[test]
    fn test_descriptive_without_means_declines_with_exact_commentary() {
        let df = df!("city" => &["Oslo", "Lima"]).unwrap();
        let results = results_with(
            AnalysisKind::DescriptiveStatistics,
            json!({"city": {"count": 2, "unique": 2, "top": "Lima", "freq": 1}}),
        );

        let (chart, commentary) = visualizer().visualize(&df, &results, "Default styling.").unwrap();
        assert!(chart.is_none());
        assert_eq!(
            commentary,
            "No numerical columns with mean values found for visualization."
        );
    }

    #[test]
    fn test_correlation_heatmap_selected() {
        let df = numeric_frame();
        let results = results_with(
            AnalysisKind::CorrelationMatrix,
            json!({"a": {"a": 1.0, "b": 0.5}, "b": {"a": 0.5, "b": 1.0}}),
        );

        let (chart, commentary) = visualizer().visualize(&df, &results, "Default styling.").unwrap();
        let chart = chart.unwrap();
        assert_eq!(chart.kind, ChartKind::Heatmap);
        assert_eq!(
            commentary,
            "Generated a heatmap displaying the correlation matrix of the dataset."
        );
        match chart.data {
            ChartData::Heatmap { columns, matrix } => {
                assert_eq!(columns, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(matrix[0][1], Some(0.5));
            }
            other => panic!("expected heatmap data, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_time_series_falls_through_to_scatter() {
        let df = numeric_frame();
        let results = results_with(AnalysisKind::TimeSeriesAnalysis, json!({}));

        let (chart, _) = visualizer().visualize(&df, &results, "Default styling.").unwrap();
        assert_eq!(chart.unwrap().kind, ChartKind::Scatter);
    }

    #[test]
    fn test_time_series_line_selected() {
        let df = numeric_frame();
        let results = results_with(
            AnalysisKind::TimeSeriesAnalysis,
            json!({"amount": {"2024-01": 15.0, "2024-02": 40.0}}),
        );

        let (chart, _) = visualizer().visualize(&df, &results, "Default styling.").unwrap();
        let chart = chart.unwrap();
        assert_eq!(chart.kind, ChartKind::Line);
        match chart.data {
            ChartData::Line { periods, values, .. } => {
                assert_eq!(periods, vec!["2024-01".to_string(), "2024-02".to_string()]);
                assert_eq!(values, vec![15.0, 40.0]);
            }
            other => panic!("expected line data, got {:?}", other),
        }
    }

    #[test]
    fn test_cluster_scatter_uses_labels() {
        let mut df = numeric_frame();
        let config = PipelineConfig::default();
        let flags = AnalysisFlags::none().with(AnalysisKind::ClusteringAnalysis);
        let results = Analyzer::new(&config).analyze(&mut df, &flags).unwrap();

        let (chart, commentary) = visualizer().visualize(&df, &results, "Default styling.").unwrap();
        let chart = chart.unwrap();
        assert_eq!(chart.kind, ChartKind::Scatter);
        assert!(commentary.contains("colored by cluster"));
        match chart.data {
            ChartData::Scatter { labels, .. } => assert!(labels.is_some()),
            other => panic!("expected scatter data, got {:?}", other),
        }
    }

    #[test]
    fn test_fallback_scatter_without_any_results() {
        let df = numeric_frame();
        let results = AnalysisResults::new();

        let (chart, commentary) = visualizer().visualize(&df, &results, "Default styling.").unwrap();
        assert_eq!(chart.unwrap().kind, ChartKind::Scatter);
        assert_eq!(commentary, "Generated a scatter plot of a vs b.");
    }

    #[test]
    fn test_no_chart_when_fewer_than_two_numeric_columns() {
        let df = df!("city" => &["Oslo", "Lima"]).unwrap();
        let results = AnalysisResults::new();

        let (chart, commentary) = visualizer().visualize(&df, &results, "Default styling.").unwrap();
        assert!(chart.is_none());
        assert_eq!(
            commentary,
            "No visualizations generated based on the analysis results."
        );
    }

    #[test]
    fn test_styling_label_attached() {
        let df = numeric_frame();
        let results = AnalysisResults::new();

        let (chart, _) = visualizer().visualize(&df, &results, "dark mode").unwrap();
        assert_eq!(chart.unwrap().styling, "dark mode");
    }
}
