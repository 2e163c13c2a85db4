//! Core data types and error definitions for the extraction pipeline.

use crate::jobs::{JobError, JobId};
use crate::storage::{ObjectRef, StorageError};
use crate::summarization::SummarizationError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// Caller-supplied identifier.
    pub identifier: String,
    /// Storage prefix holding the identifier's objects.
    pub prefix: String,
}

impl BatchRequest {
    /// Build a request whose prefix is `<identifier>/`.
    pub fn for_identifier(identifier: &str) -> Result<Self, PipelineError> {
        let trimmed = identifier.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "identifier must not be empty".into(),
            ));
        }
        Ok(Self {
            identifier: trimmed.to_string(),
            prefix: format!("{trimmed}/"),
        })
    }
}

/// Kind of long-running extraction applied to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionKind {
    /// Document text detection.
    Ocr,
    /// Speech-to-text.
    Transcription,
}

impl ExtractionKind {
    /// Label used in aggregated block headers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ocr => "OCR",
            Self::Transcription => "Transcription",
        }
    }
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of classifying an object by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Object should be sent to the given extraction backend.
    Extract(ExtractionKind),
    /// Object is skipped silently.
    Unsupported,
}

/// Lifecycle of an extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Started, not yet observed running.
    Pending,
    /// Observed running at least once.
    InProgress,
    /// Finished with text.
    Succeeded,
    /// Finished with a backend failure.
    Failed,
}

impl JobStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether moving to `next` keeps the lifecycle strictly forward.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Succeeded)
                | (Self::Pending, Self::Failed)
                | (Self::InProgress, Self::Succeeded)
                | (Self::InProgress, Self::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// A dispatched job and its observed state. Only the poller mutates it.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    job_id: JobId,
    kind: ExtractionKind,
    source: ObjectRef,
    status: JobStatus,
    result_text: Option<String>,
}

impl ExtractionJob {
    /// Track a freshly started job.
    pub fn new(job_id: JobId, kind: ExtractionKind, source: ObjectRef) -> Self {
        Self {
            job_id,
            kind,
            source,
            status: JobStatus::Pending,
            result_text: None,
        }
    }

    /// Backend identifier.
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Extraction kind.
    pub fn kind(&self) -> ExtractionKind {
        self.kind
    }

    /// Object being processed.
    pub fn source(&self) -> &ObjectRef {
        &self.source
    }

    /// Current status.
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Extracted text, present only once `Succeeded`.
    pub fn result_text(&self) -> Option<&str> {
        self.result_text.as_deref()
    }

    /// Record that the backend reports the job as running.
    pub fn mark_in_progress(&mut self) -> Result<(), PipelineError> {
        if self.status == JobStatus::InProgress {
            return Ok(());
        }
        self.transition(JobStatus::InProgress)
    }

    /// Record success together with the extracted text.
    pub fn succeed(&mut self, text: String) -> Result<(), PipelineError> {
        self.transition(JobStatus::Succeeded)?;
        self.result_text = Some(text);
        Ok(())
    }

    /// Record a backend-reported failure.
    pub fn fail(&mut self) -> Result<(), PipelineError> {
        self.transition(JobStatus::Failed)
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), PipelineError> {
        if !self.status.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                key: self.source.key.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    /// Identifier the run was requested for.
    pub identifier: String,
    /// Summarizer output.
    pub summary: String,
    /// Hex SHA-256 of the text handed to the summarizer.
    pub input_digest: String,
    /// Keys that contributed text, in listing order.
    pub processed: Vec<String>,
    /// Keys that were listed but not dispatched.
    pub skipped: Vec<String>,
    /// Keys whose jobs failed; only populated under the skip-failed policy.
    pub failed: Vec<String>,
}

/// Errors emitted by the extraction pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Request could not be turned into a batch.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// The prefix matched zero objects.
    #[error("No files found under prefix '{prefix}'")]
    NotFound {
        /// Prefix that was listed.
        prefix: String,
    },
    /// Listing or fetching failed in transport.
    #[error(transparent)]
    Storage(StorageError),
    /// Starting or querying a job failed.
    #[error(transparent)]
    Job(#[from] JobError),
    /// The backend reported a terminal failure.
    #[error("Extraction job failed for {key}: {reason}")]
    JobFailed {
        /// Object whose job failed.
        key: String,
        /// Backend-supplied reason.
        reason: String,
    },
    /// The job did not reach a terminal state within the poll budget.
    #[error("Extraction job for {key} did not finish after {attempts} status checks")]
    JobTimedOut {
        /// Object whose job was abandoned.
        key: String,
        /// Status checks issued before giving up.
        attempts: u32,
    },
    /// The summarizer failed.
    #[error(transparent)]
    Summarization(#[from] SummarizationError),
    /// A job status was asked to move backwards or skip to an invalid state.
    #[error("Invalid job status transition for {key}: {from} -> {to}")]
    InvalidTransition {
        /// Object whose job was being updated.
        key: String,
        /// Status before the attempted transition.
        from: JobStatus,
        /// Rejected target status.
        to: JobStatus,
    },
}

impl From<StorageError> for PipelineError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound { prefix } => Self::NotFound { prefix },
            other => Self::Storage(other),
        }
    }
}

impl PipelineError {
    /// Stable tag naming the error kind, suitable for structured payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound { .. } => "not_found",
            Self::Storage(_) => "storage_error",
            Self::Job(JobError::Start { .. }) => "job_start_error",
            Self::Job(JobError::Query { .. }) => "job_query_error",
            Self::JobFailed { .. } => "job_failed",
            Self::JobTimedOut { .. } => "job_timed_out",
            Self::Summarization(_) => "summarization_error",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ExtractionJob {
        ExtractionJob::new(
            JobId::from("job-1"),
            ExtractionKind::Ocr,
            ObjectRef::from_key("case1/a.pdf"),
        )
    }

    #[test]
    fn request_prefix_is_identifier_folder() {
        let request = BatchRequest::for_identifier("case123").expect("request");
        assert_eq!(request.identifier, "case123");
        assert_eq!(request.prefix, "case123/");

        let normalised = BatchRequest::for_identifier(" case123/ ").expect("request");
        assert_eq!(normalised.prefix, "case123/");
    }

    #[test]
    fn blank_identifier_is_rejected() {
        let error = BatchRequest::for_identifier("  / ").expect_err("blank");
        assert_eq!(error.kind(), "invalid_request");
    }

    #[test]
    fn forward_transitions_are_allowed() {
        let mut running = job();
        running.mark_in_progress().expect("pending -> in progress");
        running.mark_in_progress().expect("repeat in progress is a no-op");
        running.succeed("text".into()).expect("in progress -> succeeded");
        assert_eq!(running.status(), JobStatus::Succeeded);
        assert_eq!(running.result_text(), Some("text"));

        let mut immediate = job();
        immediate.fail().expect("pending -> failed");
        assert!(immediate.status().is_terminal());
        assert_eq!(immediate.result_text(), None);
    }

    #[test]
    fn terminal_states_never_regress() {
        let mut done = job();
        done.succeed("text".into()).expect("succeeded");

        let error = done.mark_in_progress().expect_err("no regression");
        assert!(matches!(
            error,
            PipelineError::InvalidTransition {
                from: JobStatus::Succeeded,
                to: JobStatus::InProgress,
                ..
            }
        ));
        assert!(done.fail().is_err());
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn storage_not_found_maps_to_pipeline_not_found() {
        let error = PipelineError::from(StorageError::NotFound {
            prefix: "empty/".into(),
        });
        assert_eq!(error.kind(), "not_found");

        let transport = PipelineError::from(StorageError::Transport("denied".into()));
        assert_eq!(transport.kind(), "storage_error");
    }

    #[test]
    fn job_errors_keep_their_kind() {
        let start = PipelineError::from(JobError::Start {
            key: "a.pdf".into(),
            reason: "throttled".into(),
        });
        assert_eq!(start.kind(), "job_start_error");
        assert!(start.to_string().contains("a.pdf"));
    }
}
