use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Location of the configuration document when `DOCPIPE_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/aws-config.json";

/// Environment variable overriding the configuration document path.
pub const CONFIG_PATH_VAR: &str = "DOCPIPE_CONFIG";

const REDACTED: &str = "********";

/// Errors encountered while loading or validating the configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        /// Path we attempted to read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration document is not valid JSON for the expected shape.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field was present but held an unusable value.
    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}

/// Runtime configuration shared (read-only) by every backend adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// AWS region used by all service clients.
    pub region: String,
    /// Static access key; falls back to the default credential chain when absent.
    #[serde(default)]
    pub aws_access_key_id: Option<String>,
    /// Static secret key paired with `aws_access_key_id`.
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,
    /// Optional endpoint override (LocalStack and similar emulators).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Object storage settings.
    pub s3: S3Config,
    /// Serverless function settings, required only by the invoke route.
    #[serde(default)]
    pub lambda: Option<LambdaConfig>,
    /// Relational query settings, required only by the query route.
    #[serde(default)]
    pub rds: Option<RdsConfig>,
    /// Batch pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Summarization provider selection.
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Bucket used for uploads, downloads and batch listings.
    pub default_bucket: String,
}

/// Serverless function settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaConfig {
    /// Named functions callable through the façade.
    pub functions: LambdaFunctions,
}

/// Function names keyed by purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaFunctions {
    /// Function invoked by `POST /aws/invoke-default-lambda`.
    #[serde(rename = "processData")]
    pub process_data: String,
}

/// RDS Data API coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RdsConfig {
    /// Secrets Manager ARN holding the database credentials.
    pub secret_arn: String,
    /// ARN of the Aurora cluster.
    pub resource_arn: String,
    /// Database name statements run against.
    pub database_name: String,
    /// Statement executed by `POST /aws/query-default-aurora`.
    #[serde(default = "default_statement")]
    pub default_statement: String,
}

fn default_statement() -> String {
    "SELECT 1".to_string()
}

/// How the orchestrator reacts to a failed extraction job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole request on the first failure; nothing is summarized.
    #[default]
    FailFast,
    /// Record the failed source and keep processing the remaining objects.
    SkipFailed,
}

/// Batch pipeline tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seconds to wait between job status checks.
    pub poll_interval_secs: u64,
    /// Optional cap on status checks per job.
    pub max_poll_attempts: Option<u32>,
    /// Wall-clock budget per job in seconds; `null` disables the deadline.
    pub job_timeout_secs: Option<u64>,
    /// Whether audio/video objects are sent to transcription.
    pub transcription_enabled: bool,
    /// Language code passed to the transcription backend.
    pub transcription_language: String,
    /// Number of extraction jobs allowed in flight at once.
    pub max_concurrent_jobs: usize,
    /// Reaction to failed jobs.
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_poll_attempts: None,
            job_timeout_secs: Some(15 * 60),
            transcription_enabled: false,
            transcription_language: "en-US".to_string(),
            max_concurrent_jobs: 1,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

/// Supported summarization backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Deterministic truncation placeholder.
    #[default]
    Truncate,
    /// Local Ollama runtime.
    Ollama,
}

/// Summarizer selection and parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Provider used to reduce the aggregated text.
    pub provider: SummarizationProvider,
    /// Characters kept by the truncating summarizer.
    pub max_chars: usize,
    /// Base URL of the Ollama runtime.
    pub ollama_url: Option<String>,
    /// Model identifier passed to Ollama.
    pub model: Option<String>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: SummarizationProvider::Truncate,
            max_chars: 100,
            ollama_url: None,
            model: None,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port (defaults to 3000).
    pub port: Option<u16>,
    /// Collapse every failure into HTTP 200 with a generic `{error}` body.
    pub legacy_error_responses: bool,
}

impl Config {
    /// Load configuration from `DOCPIPE_CONFIG` (or the default path), honouring `.env`.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let path = env::var(CONFIG_PATH_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::from_path(&path)
    }

    /// Read and validate the configuration document at `path`.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&raw)?;
        tracing::debug!(
            path = %path.display(),
            region = %config.region,
            bucket = %config.s3.default_bucket,
            lambda = config.lambda.is_some(),
            rds = config.rds.is_some(),
            summarizer = ?config.summarizer.provider,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate a JSON configuration document.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the static credential pair when both halves are configured.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.aws_access_key_id, &self.aws_secret_access_key) {
            (Some(key), Some(secret)) => Some((key.as_str(), secret.as_str())),
            _ => None,
        }
    }

    /// Copy of the configuration safe to expose over HTTP.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.aws_access_key_id.is_some() {
            copy.aws_access_key_id = Some(REDACTED.to_string());
        }
        if copy.aws_secret_access_key.is_some() {
            copy.aws_secret_access_key = Some(REDACTED.to_string());
        }
        if let Some(rds) = copy.rds.as_mut() {
            rds.secret_arn = REDACTED.to_string();
        }
        copy
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::Invalid("region must not be empty".into()));
        }
        if self.s3.default_bucket.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "s3.default_bucket must not be empty".into(),
            ));
        }
        if self.aws_access_key_id.is_some() != self.aws_secret_access_key.is_some() {
            return Err(ConfigError::Invalid(
                "aws_access_key_id and aws_secret_access_key must be set together".into(),
            ));
        }
        if self
            .rds
            .as_ref()
            .is_some_and(|rds| rds.default_statement.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "rds.default_statement must not be empty".into(),
            ));
        }
        if self.pipeline.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.poll_interval_secs must be greater than zero".into(),
            ));
        }
        if self.pipeline.max_poll_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "pipeline.max_poll_attempts must be at least 1 when set".into(),
            ));
        }
        if let Some(timeout) = self
            .pipeline
            .job_timeout_secs
            .filter(|timeout| *timeout < self.pipeline.poll_interval_secs)
        {
            return Err(ConfigError::Invalid(format!(
                "pipeline.job_timeout_secs ({timeout}) must not be shorter than \
                 pipeline.poll_interval_secs ({})",
                self.pipeline.poll_interval_secs
            )));
        }
        if self.pipeline.max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.max_concurrent_jobs must be at least 1".into(),
            ));
        }
        if self.summarizer.provider == SummarizationProvider::Ollama
            && self
                .summarizer
                .model
                .as_deref()
                .is_none_or(|model| model.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "summarizer.model is required for the ollama provider".into(),
            ));
        }
        Ok(())
    }
}
