//! Amazon Transcribe speech-to-text.
//!
//! Jobs are started without an output bucket so Transcribe hands back a pre-signed transcript
//! URL, which is then downloaded with a plain HTTP client.

use crate::jobs::{ExtractionJobClient, JobError, JobId, JobState};
use crate::pipeline::ExtractionKind;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_transcribe::{
    Client,
    error::DisplayErrorContext,
    types::{LanguageCode, Media, TranscriptionJob, TranscriptionJobStatus},
};
use serde::Deserialize;
use uuid::Uuid;

/// Transcription backend for audio and video objects.
pub struct TranscribeJobClient {
    client: Client,
    http: reqwest::Client,
    language: LanguageCode,
}

impl TranscribeJobClient {
    /// Build a client from shared SDK configuration and a language code such as `en-US`.
    pub fn new(sdk: &SdkConfig, language: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent("docpipe/transcript")
            .build()?;
        Ok(Self {
            client: Client::new(sdk),
            http,
            language: LanguageCode::from(language),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptDocument {
    results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptResults {
    transcripts: Vec<TranscriptEntry>,
}

#[derive(Debug, Deserialize)]
struct TranscriptEntry {
    transcript: String,
}

/// Download a transcript document and join its alternatives line by line.
async fn fetch_transcript(http: &reqwest::Client, uri: &str) -> Result<String, reqwest::Error> {
    let document: TranscriptDocument = http
        .get(uri)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(document
        .results
        .transcripts
        .into_iter()
        .map(|entry| entry.transcript)
        .collect::<Vec<_>>()
        .join("\n"))
}

#[async_trait]
impl ExtractionJobClient for TranscribeJobClient {
    fn kind(&self) -> ExtractionKind {
        ExtractionKind::Transcription
    }

    async fn start(&self, bucket: &str, key: &str) -> Result<JobId, JobError> {
        let job_name = format!("transcription-job-{}", Uuid::new_v4());
        let media = Media::builder()
            .media_file_uri(format!("s3://{bucket}/{key}"))
            .build();

        self.client
            .start_transcription_job()
            .transcription_job_name(&job_name)
            .language_code(self.language.clone())
            .media(media)
            .send()
            .await
            .map_err(|error| JobError::Start {
                key: key.to_string(),
                reason: DisplayErrorContext(&error).to_string(),
            })?;

        tracing::info!(bucket, key, job_id = %job_name, "Started transcription job");
        Ok(JobId::from(job_name))
    }

    async fn poll(&self, job_id: &JobId) -> Result<JobState, JobError> {
        let query_error = |reason: String| JobError::Query {
            job_id: job_id.to_string(),
            reason,
        };

        let output = self
            .client
            .get_transcription_job()
            .transcription_job_name(job_id.as_str())
            .send()
            .await
            .map_err(|error| query_error(DisplayErrorContext(&error).to_string()))?;

        let Some(job) = output.transcription_job() else {
            return Err(query_error("response carried no transcription job".into()));
        };

        match transcription_state(job).map_err(query_error)? {
            Transcription::Running => Ok(JobState::InProgress),
            Transcription::Ready(uri) => {
                let text = fetch_transcript(&self.http, uri)
                    .await
                    .map_err(|error| query_error(format!("failed to download transcript: {error}")))?;
                Ok(JobState::Succeeded(text))
            }
            Transcription::Stopped(reason) => Ok(JobState::Failed(reason)),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Transcription<'a> {
    Running,
    /// Completed; the transcript lives at this URI.
    Ready(&'a str),
    Stopped(String),
}

/// Map a job description to its state. A completed job without a transcript URI is an error
/// in the status response itself, not a failed job.
fn transcription_state(job: &TranscriptionJob) -> Result<Transcription<'_>, String> {
    match job.transcription_job_status() {
        Some(TranscriptionJobStatus::Queued) | Some(TranscriptionJobStatus::InProgress) => {
            Ok(Transcription::Running)
        }
        Some(TranscriptionJobStatus::Completed) => job
            .transcript()
            .and_then(|transcript| transcript.transcript_file_uri())
            .map(Transcription::Ready)
            .ok_or_else(|| "completed job has no transcript URI".to_string()),
        Some(TranscriptionJobStatus::Failed) => Ok(Transcription::Stopped(
            job.failure_reason()
                .unwrap_or("transcription failed")
                .to_string(),
        )),
        Some(other) => Ok(Transcription::Stopped(format!(
            "unexpected transcription status {}",
            other.as_str()
        ))),
        None => Ok(Transcription::Stopped(
            "Transcribe reported no job status".into(),
        )),
    }
}
