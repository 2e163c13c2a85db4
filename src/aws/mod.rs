//! AWS SDK adapters for storage, extraction jobs, functions and queries.
//!
//! Every client is built once from the validated configuration and handed to the pipeline and
//! the REST layer as a trait object.

pub mod lambda;
pub mod rds;
pub mod s3;
pub mod textract;
pub mod transcribe;

use crate::config::{Config, PipelineConfig};
use crate::jobs::JobRouter;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::Credentials;
use std::sync::Arc;
use thiserror::Error;

pub use lambda::LambdaInvoker;
pub use rds::RdsQueryExecutor;
pub use s3::S3ObjectStore;
pub use textract::TextractJobClient;
pub use transcribe::TranscribeJobClient;

/// Errors raised while constructing the AWS adapters.
#[derive(Debug, Error)]
pub enum AwsSetupError {
    /// The HTTP client used for transcript downloads could not be built.
    #[error("Failed to construct HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Load the shared SDK configuration for the configured region and credentials.
///
/// Static credentials from the document take precedence; otherwise the default provider chain
/// (environment, profile, instance metadata) applies.
pub async fn load_sdk_config(config: &Config) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
    if let Some((access_key, secret_key)) = config.static_credentials() {
        loader = loader.credentials_provider(Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "docpipe-config",
        ));
    }
    if let Some(endpoint) = config.endpoint_url.as_deref() {
        loader = loader.endpoint_url(endpoint);
    }
    loader.load().await
}

/// Every AWS-backed adapter the application needs.
pub struct AwsBackends {
    /// S3 object store.
    pub storage: Arc<S3ObjectStore>,
    /// Textract text detection.
    pub ocr: Arc<TextractJobClient>,
    /// Transcribe speech-to-text.
    pub transcription: Arc<TranscribeJobClient>,
    /// Lambda invoker, when a function is configured.
    pub functions: Option<Arc<LambdaInvoker>>,
    /// RDS Data API executor, when a cluster is configured.
    pub queries: Option<Arc<RdsQueryExecutor>>,
}

impl AwsBackends {
    /// Build all adapters from configuration.
    pub async fn connect(config: &Config) -> Result<Self, AwsSetupError> {
        let sdk = load_sdk_config(config).await;
        tracing::info!(
            region = %config.region,
            static_credentials = config.static_credentials().is_some(),
            endpoint_override = config.endpoint_url.is_some(),
            "Initialized AWS SDK configuration"
        );

        let storage = Arc::new(S3ObjectStore::new(&sdk, config.endpoint_url.is_some()));
        let ocr = Arc::new(TextractJobClient::new(&sdk));
        let transcription = Arc::new(TranscribeJobClient::new(
            &sdk,
            &config.pipeline.transcription_language,
        )?);
        let functions = config.lambda.as_ref().map(|_| Arc::new(LambdaInvoker::new(&sdk)));
        let queries = config
            .rds
            .clone()
            .map(|rds| Arc::new(RdsQueryExecutor::new(&sdk, rds)));

        Ok(Self {
            storage,
            ocr,
            transcription,
            functions,
            queries,
        })
    }

    /// Route extraction kinds to backends; transcription only when enabled.
    pub fn job_router(&self, pipeline: &PipelineConfig) -> JobRouter {
        let router = JobRouter::new().with_client(self.ocr.clone());
        if pipeline.transcription_enabled {
            router.with_client(self.transcription.clone())
        } else {
            tracing::info!("Transcription disabled; audio objects will be skipped");
            router
        }
    }
}
