use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use docpipe::{
    aws::AwsBackends,
    config::{Config, FailurePolicy},
    logging,
    pipeline::{BatchRequest, PipelineService},
    summarization::build_summarizer,
};

#[derive(Parser)]
#[command(
    name = "docpipe-run",
    about = "Run the extraction pipeline for one identifier and print its summary"
)]
struct Cli {
    /// Identifier whose `<id>/` folder is processed.
    #[arg(long)]
    id: String,
    /// Configuration document (defaults to `DOCPIPE_CONFIG` or `config/aws-config.json`).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Keep going when a job fails and report the failed keys.
    #[arg(long)]
    skip_failed: bool,
    /// Extraction jobs allowed in flight at once.
    #[arg(long)]
    concurrency: Option<usize>,
    /// Print the full outcome as JSON instead of the summary alone.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let mut config = match &cli.config {
        Some(path) => Config::from_path(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    if cli.skip_failed {
        config.pipeline.failure_policy = FailurePolicy::SkipFailed;
    }
    if let Some(concurrency) = cli.concurrency {
        config.pipeline.max_concurrent_jobs = concurrency.max(1);
    }

    let backends = AwsBackends::connect(&config)
        .await
        .context("Failed to initialize AWS clients")?;
    let summarizer =
        build_summarizer(&config.summarizer).context("Failed to initialize summarizer")?;
    let service = PipelineService::from_config(
        &config,
        backends.storage.clone(),
        backends.job_router(&config.pipeline),
        summarizer,
    );

    let request = BatchRequest::for_identifier(&cli.id)?;
    let outcome = service
        .run(&request)
        .await
        .with_context(|| format!("Pipeline failed for '{}'", request.identifier))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.summary);
        if !outcome.failed.is_empty() {
            eprintln!("Failed objects: {}", outcome.failed.join(", "));
        }
    }
    Ok(())
}
