//! Textract asynchronous text detection.

use crate::jobs::{ExtractionJobClient, JobError, JobId, JobState};
use crate::pipeline::ExtractionKind;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_textract::{
    Client,
    error::DisplayErrorContext,
    operation::get_document_text_detection::GetDocumentTextDetectionOutput,
    types::{Block, BlockType, DocumentLocation, JobStatus, S3Object},
};

/// Text-detection backend for PDF documents.
pub struct TextractJobClient {
    client: Client,
}

impl TextractJobClient {
    /// Build a client from shared SDK configuration.
    pub fn new(sdk: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk),
        }
    }

    async fn fetch_page(
        &self,
        job_id: &JobId,
        next_token: Option<String>,
    ) -> Result<GetDocumentTextDetectionOutput, JobError> {
        self.client
            .get_document_text_detection()
            .job_id(job_id.as_str())
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|error| JobError::Query {
                job_id: job_id.to_string(),
                reason: DisplayErrorContext(&error).to_string(),
            })
    }
}

/// Text of the `LINE` blocks, in document order.
fn line_texts(blocks: &[Block]) -> Vec<String> {
    blocks
        .iter()
        .filter(|block| block.block_type() == Some(&BlockType::Line))
        .filter_map(|block| block.text())
        .map(str::to_owned)
        .collect()
}

#[async_trait]
impl ExtractionJobClient for TextractJobClient {
    fn kind(&self) -> ExtractionKind {
        ExtractionKind::Ocr
    }

    async fn start(&self, bucket: &str, key: &str) -> Result<JobId, JobError> {
        let location = DocumentLocation::builder()
            .s3_object(S3Object::builder().bucket(bucket).name(key).build())
            .build();

        let output = self
            .client
            .start_document_text_detection()
            .document_location(location)
            .send()
            .await
            .map_err(|error| JobError::Start {
                key: key.to_string(),
                reason: DisplayErrorContext(&error).to_string(),
            })?;

        let job_id = output
            .job_id()
            .filter(|id| !id.is_empty())
            .map(JobId::from)
            .ok_or_else(|| JobError::Start {
                key: key.to_string(),
                reason: "Textract returned no job identifier".into(),
            })?;
        tracing::info!(bucket, key, job_id = %job_id, "Started text detection job");
        Ok(job_id)
    }

    async fn poll(&self, job_id: &JobId) -> Result<JobState, JobError> {
        let first = self.fetch_page(job_id, None).await?;

        match detection_state(first.job_status(), first.status_message()) {
            Detection::Ready => {
                let text = collect_lines(first, |token| self.fetch_page(job_id, Some(token))).await?;
                Ok(JobState::Succeeded(text))
            }
            Detection::Running => Ok(JobState::InProgress),
            Detection::Stopped(reason) => Ok(JobState::Failed(reason)),
        }
    }
}

/// Where a text detection job stands after one status query.
#[derive(Debug, PartialEq, Eq)]
enum Detection {
    /// Finished; the detected lines can be read.
    Ready,
    Running,
    /// Terminal without usable output.
    Stopped(String),
}

/// Partial success still yields the lines that were detected.
fn detection_state(status: Option<&JobStatus>, message: Option<&str>) -> Detection {
    match status {
        Some(JobStatus::Succeeded) | Some(JobStatus::PartialSuccess) => Detection::Ready,
        Some(JobStatus::InProgress) => Detection::Running,
        Some(JobStatus::Failed) => {
            Detection::Stopped(message.unwrap_or("text detection failed").to_string())
        }
        Some(other) => Detection::Stopped(format!("unexpected job status {}", other.as_str())),
        None => Detection::Stopped("Textract reported no job status".into()),
    }
}

/// Gather `LINE` text from the first result page and every page its `NextToken` chain leads to.
async fn collect_lines<F, Fut>(
    first: GetDocumentTextDetectionOutput,
    mut next_page: F,
) -> Result<String, JobError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<GetDocumentTextDetectionOutput, JobError>>,
{
    let mut lines = line_texts(first.blocks());
    let mut next_token = first.next_token().map(str::to_owned);
    while let Some(token) = next_token {
        let page = next_page(token).await?;
        lines.extend(line_texts(page.blocks()));
        next_token = page.next_token().map(str::to_owned);
    }
    Ok(lines.join("\n"))
}
