//! Contract for asynchronous extraction backends (text detection, transcription).

use crate::pipeline::ExtractionKind;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Backend-assigned identifier of a started job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by a single backend query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Job is queued or running.
    InProgress,
    /// Job finished; carries the extracted text.
    Succeeded(String),
    /// Backend reported a terminal failure; carries its reason.
    Failed(String),
}

/// Errors raised while talking to an extraction backend.
#[derive(Debug, Error)]
pub enum JobError {
    /// The backend rejected the request or returned no job identifier.
    #[error("Failed to start extraction job for {key}: {reason}")]
    Start {
        /// Object the job was meant to process.
        key: String,
        /// Backend or transport diagnostic.
        reason: String,
    },
    /// A status query failed in transport.
    #[error("Failed to query extraction job {job_id}: {reason}")]
    Query {
        /// Job that was being queried.
        job_id: String,
        /// Backend or transport diagnostic.
        reason: String,
    },
}

/// Interface implemented by long-running extraction backends.
#[async_trait]
pub trait ExtractionJobClient: Send + Sync {
    /// Kind of extraction this backend performs.
    fn kind(&self) -> ExtractionKind;

    /// Start a job over `s3://bucket/key`.
    async fn start(&self, bucket: &str, key: &str) -> Result<JobId, JobError>;

    /// Query the job status once.
    async fn poll(&self, job_id: &JobId) -> Result<JobState, JobError>;
}

/// Maps extraction kinds to the backend that serves them.
///
/// A kind without a registered client is treated as disabled by the orchestrator.
#[derive(Clone, Default)]
pub struct JobRouter {
    clients: Vec<Arc<dyn ExtractionJobClient>>,
}

impl JobRouter {
    /// Create a router with no backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client` for its kind, replacing any earlier registration.
    pub fn with_client(mut self, client: Arc<dyn ExtractionJobClient>) -> Self {
        let kind = client.kind();
        self.clients.retain(|existing| existing.kind() != kind);
        self.clients.push(client);
        self
    }

    /// Backend serving `kind`, if one is registered.
    pub fn client_for(&self, kind: ExtractionKind) -> Option<&Arc<dyn ExtractionJobClient>> {
        self.clients.iter().find(|client| client.kind() == kind)
    }
}
