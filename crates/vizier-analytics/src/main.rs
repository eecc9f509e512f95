//! CLI entry point for the analysis pipeline.

use anyhow::{Context, Result, bail};
use clap::Parser;
use dotenv::dotenv;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use vizier_analytics::{
    AnalysisFlags, AnalyticsJobExecutor, DatasetSource, DirectoryBlobStore, EchoGenerator,
    JobQueue, JobRequest, JobState, KeywordInterpreter, Pipeline, PipelineConfig, read_csv,
    resolve_flags, upload_chart,
};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Statistical analysis and charting pipeline",
    long_about = "Runs a tabular dataset through cleaning, type coercion, a configurable set\n\
                  of statistical analyses, and single-chart visualization.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  PLACEHOLDER_CHART_URL    URL returned when chart storage fails\n\n\
                  EXAMPLES:\n  \
                  # Descriptive statistics (the default analysis set)\n  \
                  vizier-analytics -i data.csv\n\n  \
                  # Explicit analysis selection\n  \
                  vizier-analytics -i data.csv -a descriptive_statistics,correlation_matrix\n\n  \
                  # Free-text selection\n  \
                  vizier-analytics -i data.csv -q \"show correlations and clusters\"\n\n  \
                  # Deferred execution through the job queue\n  \
                  vizier-analytics -i data.csv --workers 2"
)]
struct Args {
    /// Path to the CSV file to analyze
    #[arg(short, long)]
    input: String,

    /// Comma-separated analyses to run (unknown names are ignored)
    #[arg(short, long)]
    analyses: Option<String>,

    /// Free-text description of the desired analyses
    ///
    /// Ignored when --analyses is given
    #[arg(short, long)]
    query: Option<String>,

    /// Styling label attached to the chart
    #[arg(long)]
    styling: Option<String>,

    /// Output directory for the report and the stored chart
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Run through the job queue with this many workers instead of inline
    #[arg(long)]
    workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&args.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config_builder = PipelineConfig::builder();
    if let Ok(url) = std::env::var("PLACEHOLDER_CHART_URL") {
        config_builder = config_builder.placeholder_chart_url(url);
    }
    let config = config_builder.build().context("invalid configuration")?;

    let styling = args
        .styling
        .clone()
        .unwrap_or_else(|| config.default_styling.clone());

    // flags: explicit list beats free text beats the fallback default
    let (flags, explanation) = if let Some(analyses) = &args.analyses {
        let flags = AnalysisFlags::from_names(analyses.split(','));
        if flags.is_empty() {
            warn!("No valid analyses in --analyses; using the fallback set");
            (AnalysisFlags::fallback(), None)
        } else {
            (flags, None)
        }
    } else if let Some(query) = &args.query {
        let interpretation = resolve_flags(&KeywordInterpreter, query);
        (interpretation.flags, Some(interpretation.explanation))
    } else {
        (AnalysisFlags::fallback(), None)
    };

    let pipeline = Pipeline::builder()
        .config(config.clone())
        .build()
        .context("failed to build pipeline")?;

    let mut report = if let Some(workers) = args.workers {
        run_deferred(pipeline, &args.input, &args.output, flags, styling, workers)?
    } else {
        let df = read_csv(&PathBuf::from(&args.input))
            .with_context(|| format!("failed to read {}", args.input))?;
        let result = pipeline.process(df, &flags, &styling)?;
        serde_json::to_value(&result)?
    };

    if let Some(explanation) = explanation {
        report["explanation"] = json!(explanation);
    }

    // store the chart (if any) and attach its URL, falling back to the
    // placeholder on storage failure
    let image_url = match report.get("chart") {
        Some(chart_value) if !chart_value.is_null() => {
            let chart = serde_json::from_value(chart_value.clone())
                .context("chart payload did not round-trip")?;
            let store = DirectoryBlobStore::new(&args.output);
            let name = format!("{}.chart.json", Uuid::new_v4());
            upload_chart(&store, &chart, &name, &config.placeholder_chart_url)
        }
        _ => config.placeholder_chart_url.clone(),
    };
    report["image_url"] = json!(image_url);

    let output_dir = PathBuf::from(&args.output);
    std::fs::create_dir_all(&output_dir)?;
    let report_path = output_dir.join("report.json");
    std::fs::write(&report_path, serde_json::to_vec_pretty(&report)?)?;
    info!("Report written to {:?}", report_path);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Run the pipeline off the request path: enqueue, then poll to completion.
fn run_deferred(
    pipeline: Pipeline,
    input: &str,
    output: &str,
    flags: AnalysisFlags,
    styling: String,
    workers: usize,
) -> Result<serde_json::Value> {
    let executor = AnalyticsJobExecutor::new(
        pipeline,
        Arc::new(EchoGenerator),
        Arc::new(EchoGenerator),
        Arc::new(DirectoryBlobStore::new(output)),
    );
    let queue = JobQueue::start(Arc::new(executor), workers);

    // the worker resolves the path reference into a frame
    let id = queue.enqueue(JobRequest::Analysis {
        source: DatasetSource::Path(PathBuf::from(input)),
        flags,
        styling,
    })?;
    info!("Enqueued job {}", id);

    loop {
        let Some(view) = queue.poll(&id) else {
            bail!("job {} disappeared from the queue", id);
        };
        match view.state {
            JobState::Succeeded => {
                queue.shutdown();
                return view.result.context("succeeded job carried no result");
            }
            JobState::Failed => {
                queue.shutdown();
                bail!(
                    "job {} failed: {}",
                    id,
                    view.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
            JobState::Queued | JobState::Running => {
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    }
}
