use anyhow::Context;
use docpipe::{
    api::{self, AppState},
    aws::AwsBackends,
    config::Config,
    logging,
    pipeline::PipelineService,
    services::{FunctionInvoker, QueryExecutor},
    summarization::build_summarizer,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let config = Arc::new(Config::load().context("Failed to load configuration")?);

    let backends = AwsBackends::connect(&config)
        .await
        .context("Failed to initialize AWS clients")?;
    let summarizer =
        build_summarizer(&config.summarizer).context("Failed to initialize summarizer")?;
    let pipeline = PipelineService::from_config(
        &config,
        backends.storage.clone(),
        backends.job_router(&config.pipeline),
        summarizer,
    );

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        pipeline: Arc::new(pipeline),
        storage: backends.storage.clone(),
        functions: backends
            .functions
            .clone()
            .map(|invoker| invoker as Arc<dyn FunctionInvoker>),
        queries: backends
            .queries
            .clone()
            .map(|executor| executor as Arc<dyn QueryExecutor>),
    });

    let port = config.server.port.unwrap_or(DEFAULT_PORT);
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    tracing::info!(
        bucket = %config.s3.default_bucket,
        "Listening on http://0.0.0.0:{}",
        port
    );
    axum::serve(listener, api::create_router(state))
        .await
        .context("HTTP server terminated")?;
    Ok(())
}
