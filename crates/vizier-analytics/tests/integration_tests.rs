//! Integration tests for the analysis pipeline and job queue.
//!
//! These tests verify end-to-end behavior over CSV fixtures.

use polars::prelude::*;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use vizier_analytics::{
    AnalysisFlags, AnalysisKind, AnalyticsJobExecutor, ChartKind, DatasetSource,
    DirectoryBlobStore, EchoGenerator, JobQueue, JobRequest, JobState, JobView,
    KeywordInterpreter, Pipeline, PipelineConfig, read_csv,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str) -> DataFrame {
    read_csv(&fixtures_path().join(filename)).expect("Failed to read CSV fixture")
}

fn pipeline() -> Pipeline {
    Pipeline::builder()
        .config(PipelineConfig::default())
        .build()
        .unwrap()
}

fn await_terminal(queue: &JobQueue, id: &vizier_analytics::JobId) -> JobView {
    for _ in 0..400 {
        let view = queue.poll(id).expect("job should exist");
        if view.state.is_terminal() {
            return view;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("job never reached a terminal state");
}

// ============================================================================
// Full Pipeline Tests with the Sales Fixture
// ============================================================================

#[test]
fn test_full_pipeline_all_analyses() {
    let df = load_csv("sales.csv");
    let result = pipeline()
        .process(df, &AnalysisFlags::all(), "Default styling.")
        .unwrap();

    for kind in AnalysisKind::ALL {
        assert!(
            result.analysis.contains(kind),
            "expected a result for {}",
            kind
        );
    }

    // descriptive statistics win the chart selection
    assert_eq!(result.chart.unwrap().kind, ChartKind::Bar);
    assert!(result.chart_error.is_none());
}

#[test]
fn test_cleaning_and_coercion_effects_visible_in_results() {
    let df = load_csv("sales.csv");
    assert_eq!(df.height(), 7); // fixture carries one exact-duplicate row

    let flags = AnalysisFlags::none()
        .with(AnalysisKind::DescriptiveStatistics)
        .with(AnalysisKind::MissingValues)
        .with(AnalysisKind::ValueCounts);
    let result = pipeline().process(df, &flags, "Default styling.").unwrap();

    // duplicate dropped: 6 rows survive, and the missing amount was filled
    // with the mean of the five remaining values
    let stats = result.analysis.get(AnalysisKind::DescriptiveStatistics).unwrap();
    assert_eq!(stats["amount"]["count"], json!(6));
    assert_eq!(stats["amount"]["mean"], json!(340.0));

    let missing = result.analysis.get(AnalysisKind::MissingValues).unwrap();
    assert_eq!(missing["amount"], json!(0));
    // the unparseable date cell degraded to null
    assert_eq!(missing["order_date"], json!(1));

    // the missing region became the sentinel category
    let counts = result.analysis.get(AnalysisKind::ValueCounts).unwrap();
    assert_eq!(counts["region"]["Unknown"], json!(1));
    assert_eq!(counts["region"]["North"], json!(2));
}

#[test]
fn test_time_series_monthly_means_from_fixture() {
    let df = load_csv("sales.csv");
    let flags = AnalysisFlags::none().with(AnalysisKind::TimeSeriesAnalysis);
    let result = pipeline().process(df, &flags, "Default styling.").unwrap();

    let series = result.analysis.get(AnalysisKind::TimeSeriesAnalysis).unwrap();
    assert_eq!(series["amount"]["2024-01"], json!(150.0));
    // February averages the real 300.0 with the mean-filled 340.0
    assert_eq!(series["amount"]["2024-02"], json!(320.0));
    assert_eq!(series["amount"]["2024-03"], json!(500.0));
}

#[test]
fn test_clustering_attaches_labels_and_counts() {
    let df = load_csv("sales.csv");
    let flags = AnalysisFlags::none().with(AnalysisKind::ClusteringAnalysis);
    let result = pipeline().process(df, &flags, "Default styling.").unwrap();

    let counts = result
        .analysis
        .get(AnalysisKind::ClusteringAnalysis)
        .unwrap()
        .as_object()
        .unwrap();
    assert_eq!(counts.len(), 3);
    let total: u64 = counts.values().map(|v| v.as_u64().unwrap()).sum();
    assert_eq!(total, 6);

    // clustering alone selects the cluster-colored scatter
    let chart = result.chart.unwrap();
    assert_eq!(chart.kind, ChartKind::Scatter);
    assert!(result.commentary.contains("colored by cluster"));
}

// ============================================================================
// Spec Scenarios
// ============================================================================

#[test]
fn test_near_duplicate_rows_survive_and_mean_fill_uses_both() {
    // rows (2, 20.0) and (2, null) differ in one column, so neither is an
    // exact duplicate; the null is filled with the mean of 10 and 20
    let df = df!(
        "id" => &[1i64, 2, 2],
        "val" => &[Some(10.0f64), Some(20.0), None],
    )
    .unwrap();

    let flags = AnalysisFlags::none().with(AnalysisKind::DescriptiveStatistics);
    let result = pipeline().process(df, &flags, "Default styling.").unwrap();

    let stats = result.analysis.get(AnalysisKind::DescriptiveStatistics).unwrap();
    assert_eq!(stats["val"]["count"], json!(3));
    assert_eq!(stats["val"]["mean"], json!(15.0));
}

#[test]
fn test_all_categorical_dataset_declines_chart_with_exact_commentary() {
    let df = load_csv("categories.csv");
    let flags = AnalysisFlags::none().with(AnalysisKind::DescriptiveStatistics);
    let result = pipeline().process(df, &flags, "Default styling.").unwrap();

    assert!(result.chart.is_none());
    assert_eq!(
        result.commentary,
        "No numerical columns with mean values found for visualization."
    );
    // analysis results are still present alongside the absent chart
    assert!(result.analysis.contains(AnalysisKind::DescriptiveStatistics));
}

#[test]
fn test_correlation_on_single_numeric_column_is_empty() {
    let df = df!(
        "amount" => &[1.0f64, 2.0, 3.0],
        "label" => &["a", "b", "c"],
    )
    .unwrap();

    let flags = AnalysisFlags::none().with(AnalysisKind::CorrelationMatrix);
    let result = pipeline().process(df, &flags, "Default styling.").unwrap();

    assert_eq!(
        result.analysis.get(AnalysisKind::CorrelationMatrix).unwrap(),
        &json!({})
    );
}

// ============================================================================
// Query-Driven Runs
// ============================================================================

#[test]
fn test_query_driven_run_attaches_explanation() {
    let df = load_csv("sales.csv");
    let result = pipeline()
        .process_with_query(
            df,
            "how are amount and quantity correlated?",
            &KeywordInterpreter,
            "Default styling.",
        )
        .unwrap();

    assert!(result.analysis.contains(AnalysisKind::CorrelationMatrix));
    assert!(result.explanation.unwrap().contains("correlation_matrix"));
    assert_eq!(result.chart.unwrap().kind, ChartKind::Heatmap);
}

// ============================================================================
// Job Queue End-to-End
// ============================================================================

fn queue_with_pipeline(blob_dir: &std::path::Path, workers: usize) -> JobQueue {
    let executor = AnalyticsJobExecutor::new(
        pipeline(),
        Arc::new(EchoGenerator),
        Arc::new(EchoGenerator),
        Arc::new(DirectoryBlobStore::new(blob_dir)),
    );
    JobQueue::start(Arc::new(executor), workers)
}

#[test]
fn test_deferred_analysis_over_path_reference() {
    let dir = tempfile::tempdir().unwrap();
    let queue = queue_with_pipeline(dir.path(), 2);

    let id = queue
        .enqueue(JobRequest::Analysis {
            source: DatasetSource::Path(fixtures_path().join("sales.csv")),
            flags: AnalysisFlags::fallback(),
            styling: "Default styling.".to_string(),
        })
        .unwrap();

    let view = await_terminal(&queue, &id);
    assert_eq!(view.state, JobState::Succeeded);

    let result = view.result.unwrap();
    assert_eq!(
        result["analysis"]["descriptive_statistics"]["amount"]["mean"],
        json!(340.0)
    );
    assert_eq!(result["chart"]["kind"], "bar");
}

#[test]
fn test_deferred_analysis_with_bad_reference_fails_job() {
    let dir = tempfile::tempdir().unwrap();
    let queue = queue_with_pipeline(dir.path(), 1);

    let id = queue
        .enqueue(JobRequest::Analysis {
            source: DatasetSource::Path(dir.path().join("missing.csv")),
            flags: AnalysisFlags::fallback(),
            styling: "Default styling.".to_string(),
        })
        .unwrap();

    let view = await_terminal(&queue, &id);
    assert_eq!(view.state, JobState::Failed);
    assert!(view.error.is_some());
    assert!(view.result.is_none());
}

#[test]
fn test_mixed_analysis_and_generation_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let queue = queue_with_pipeline(dir.path(), 2);

    let analysis_id = queue
        .enqueue(JobRequest::Analysis {
            source: DatasetSource::InMemory(load_csv("sales.csv")),
            flags: AnalysisFlags::fallback(),
            styling: "Default styling.".to_string(),
        })
        .unwrap();
    let generation_id = queue
        .enqueue(JobRequest::Generation {
            text_prompt: "a short note".to_string(),
            image_prompt: "a chart illustration".to_string(),
        })
        .unwrap();

    let analysis = await_terminal(&queue, &analysis_id);
    let generation = await_terminal(&queue, &generation_id);

    assert_eq!(analysis.state, JobState::Succeeded);
    assert_eq!(generation.state, JobState::Succeeded);
    assert_eq!(generation.result.unwrap()["text"], "[generated] a short note");
}

#[test]
fn test_polling_unknown_job_id_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let queue = queue_with_pipeline(dir.path(), 1);

    let known = queue
        .enqueue(JobRequest::Generation {
            text_prompt: "t".to_string(),
            image_prompt: "i".to_string(),
        })
        .unwrap();
    let unknown: vizier_analytics::JobId =
        "00000000-0000-4000-8000-000000000000".parse().unwrap();

    assert!(queue.poll(&unknown).is_none());
    assert!(queue.poll(&known).is_some());
}
