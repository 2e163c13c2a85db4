//! Summarization backends that reduce aggregated extraction text.
//!
//! The default provider is a deterministic truncation placeholder. The Ollama-backed client
//! issues HTTP requests directly to a local runtime and is selected through configuration.

use crate::config::{SummarizationProvider, SummarizerConfig};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors surfaced while attempting summarization.
#[derive(Debug, Error)]
pub enum SummarizationError {
    /// Provider was unreachable or could not be constructed.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by summarization providers.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Reduce `text` to a short summary.
    async fn summarize(&self, text: &str) -> Result<String, SummarizationError>;
}

/// Build the summarizer selected by configuration.
pub fn build_summarizer(
    config: &SummarizerConfig,
) -> Result<Arc<dyn Summarizer>, SummarizationError> {
    match config.provider {
        SummarizationProvider::Truncate => Ok(Arc::new(TruncatingSummarizer::new(config.max_chars))),
        SummarizationProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            let model = config.model.clone().ok_or_else(|| {
                SummarizationError::ProviderUnavailable("no Ollama model configured".into())
            })?;
            Ok(Arc::new(OllamaSummarizer::new(
                base_url,
                model,
                config.max_chars,
            )?))
        }
    }
}

/// Placeholder summarizer keeping the first `max_chars` characters.
#[derive(Debug, Clone, Copy)]
pub struct TruncatingSummarizer {
    max_chars: usize,
}

impl TruncatingSummarizer {
    /// Create a summarizer that keeps at most `max_chars` characters.
    pub const fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    fn truncate(&self, text: &str) -> String {
        let head: String = text.chars().take(self.max_chars).collect();
        format!("Summary: {head}...")
    }
}

#[async_trait]
impl Summarizer for TruncatingSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizationError> {
        Ok(self.truncate(text))
    }
}

/// Summarizer backed by a local Ollama runtime.
pub struct OllamaSummarizer {
    http: Client,
    base_url: String,
    model: String,
    fallback: TruncatingSummarizer,
}

impl OllamaSummarizer {
    /// Create a client for `base_url` using `model`.
    pub fn new(
        base_url: String,
        model: String,
        fallback_chars: usize,
    ) -> Result<Self, SummarizationError> {
        let http = Client::builder()
            .user_agent("docpipe/summary")
            .build()
            .map_err(|error| {
                SummarizationError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url,
            model,
            fallback: TruncatingSummarizer::new(fallback_chars),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizationError> {
        // Nothing was extracted; don't ask a model to summarize an empty prompt.
        if text.trim().is_empty() {
            return Ok(self.fallback.truncate(text));
        }

        let payload = json!({
            "model": self.model,
            "prompt": format!(
                "Summarize the following extracted document text in a few sentences.\n{text}"
            ),
            "stream": false,
            "options": {
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationError::ProviderUnavailable(format!(
                    "Ollama at {} is unreachable: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationError::ProviderUnavailable(format!(
                "{} not found; is the Ollama runtime running?",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationError::GenerationFailed(format!(
                "Ollama answered {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(SummarizationError::InvalidResponse(
                "Ollama reported an unfinished generation".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}
