//! Pipeline service coordinating listing, extraction jobs, aggregation and summarization.

use super::{
    aggregate::{AggregatedDocument, AggregatedPart},
    classify::classify_object,
    poller::{PollPolicy, poll_until_terminal},
    types::{
        BatchRequest, Classification, ExtractionJob, ExtractionKind, PipelineError,
        PipelineOutcome,
    },
};
use crate::{
    config::{Config, FailurePolicy, PipelineConfig},
    jobs::{ExtractionJobClient, JobRouter},
    metrics::{MetricsSnapshot, PipelineMetrics},
    storage::{ObjectRef, ObjectStore},
    summarization::Summarizer,
};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Runtime knobs derived from [`PipelineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Polling cadence and budget per job.
    pub poll_policy: PollPolicy,
    /// Jobs allowed in flight at once; `1` keeps processing strictly sequential.
    pub max_concurrent_jobs: usize,
    /// Reaction to a failed job.
    pub failure_policy: FailurePolicy,
}

impl PipelineSettings {
    /// Derive settings from the pipeline section of the configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            poll_policy: PollPolicy::from_config(config),
            max_concurrent_jobs: config.max_concurrent_jobs.max(1),
            failure_policy: config.failure_policy,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Abstraction over the pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Extract, aggregate and summarize every object under the request prefix.
    async fn process(&self, request: BatchRequest) -> Result<PipelineOutcome, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Coordinates a batch: list, classify, dispatch and poll jobs, aggregate, summarize.
///
/// Backends are injected once at construction and shared through `Arc`s; every request owns its
/// own job set and aggregated document.
pub struct PipelineService {
    bucket: String,
    settings: PipelineSettings,
    storage: Arc<dyn ObjectStore>,
    router: JobRouter,
    summarizer: Arc<dyn Summarizer>,
    metrics: Arc<PipelineMetrics>,
}

/// An object selected for extraction, tagged with its listing position.
struct Candidate {
    index: usize,
    kind: ExtractionKind,
    object: ObjectRef,
    client: Arc<dyn ExtractionJobClient>,
}

impl PipelineService {
    /// Build a service over explicit settings and backends.
    pub fn new(
        bucket: impl Into<String>,
        settings: PipelineSettings,
        storage: Arc<dyn ObjectStore>,
        router: JobRouter,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            settings,
            storage,
            router,
            summarizer,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build a service for the configured default bucket and pipeline settings.
    pub fn from_config(
        config: &Config,
        storage: Arc<dyn ObjectStore>,
        router: JobRouter,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self::new(
            config.s3.default_bucket.clone(),
            PipelineSettings::from_config(&config.pipeline),
            storage,
            router,
            summarizer,
        )
    }

    /// Run one batch end to end.
    pub async fn run(&self, request: &BatchRequest) -> Result<PipelineOutcome, PipelineError> {
        tracing::info!(
            identifier = %request.identifier,
            bucket = %self.bucket,
            prefix = %request.prefix,
            "Processing batch"
        );
        let result = self.execute(request).await;
        match &result {
            Ok(outcome) => {
                self.metrics.record_request_success();
                tracing::info!(
                    identifier = %outcome.identifier,
                    processed = outcome.processed.len(),
                    skipped = outcome.skipped.len(),
                    failed = outcome.failed.len(),
                    digest = %outcome.input_digest,
                    "Batch completed"
                );
            }
            Err(error) => {
                self.metrics.record_request_failure();
                tracing::warn!(
                    identifier = %request.identifier,
                    kind = error.kind(),
                    error = %error,
                    "Batch failed"
                );
            }
        }
        result
    }

    async fn execute(&self, request: &BatchRequest) -> Result<PipelineOutcome, PipelineError> {
        let objects = self.storage.list(&self.bucket, &request.prefix).await?;
        if objects.is_empty() {
            return Err(PipelineError::NotFound {
                prefix: request.prefix.clone(),
            });
        }

        let (candidates, skipped) = self.plan(objects);
        self.metrics.record_skipped(skipped.len() as u64);
        let (document, failed) = self.dispatch(candidates).await?;

        let text = document.render();
        let input_digest = hex::encode(Sha256::digest(text.as_bytes()));
        let summary = self.summarizer.summarize(&text).await?;

        Ok(PipelineOutcome {
            identifier: request.identifier.clone(),
            summary,
            input_digest,
            processed: document.source_keys(),
            skipped,
            failed,
        })
    }

    /// Split listed objects into dispatchable candidates and skipped keys, in listing order.
    fn plan(&self, objects: Vec<ObjectRef>) -> (Vec<Candidate>, Vec<String>) {
        let mut candidates = Vec::new();
        let mut skipped = Vec::new();

        for (index, object) in objects.into_iter().enumerate() {
            match classify_object(&object) {
                Classification::Unsupported => {
                    tracing::debug!(key = %object.key, "Skipping unsupported object");
                    skipped.push(object.key);
                }
                Classification::Extract(kind) => match self.router.client_for(kind) {
                    Some(client) => candidates.push(Candidate {
                        index,
                        kind,
                        object,
                        client: Arc::clone(client),
                    }),
                    None => {
                        tracing::info!(key = %object.key, kind = %kind, "Extraction disabled; skipping");
                        skipped.push(object.key);
                    }
                },
            }
        }

        (candidates, skipped)
    }

    /// Run every candidate's job with bounded concurrency and collect the text by listing index.
    async fn dispatch(
        &self,
        candidates: Vec<Candidate>,
    ) -> Result<(AggregatedDocument, Vec<String>), PipelineError> {
        let jobs: Vec<_> = candidates
            .into_iter()
            .map(|candidate| self.extract(candidate))
            .collect();
        let mut results =
            std::pin::pin!(stream::iter(jobs).buffer_unordered(self.settings.max_concurrent_jobs));

        let mut parts = Vec::new();
        let mut failed = Vec::new();
        while let Some((candidate, result)) = results.next().await {
            match result {
                Ok(text) => {
                    self.metrics.record_job_success();
                    parts.push((
                        candidate.index,
                        AggregatedPart {
                            source_key: candidate.object.key,
                            kind: candidate.kind,
                            text,
                        },
                    ));
                }
                Err(error) => {
                    self.metrics.record_job_failure();
                    match self.settings.failure_policy {
                        FailurePolicy::FailFast => return Err(error),
                        FailurePolicy::SkipFailed => {
                            tracing::warn!(
                                key = %candidate.object.key,
                                error = %error,
                                "Continuing without failed object"
                            );
                            failed.push((candidate.index, candidate.object.key));
                        }
                    }
                }
            }
        }

        failed.sort_by_key(|(index, _)| *index);
        Ok((
            AggregatedDocument::from_indexed(parts),
            failed.into_iter().map(|(_, key)| key).collect(),
        ))
    }

    /// Start one job and poll it to a terminal state.
    async fn extract(&self, candidate: Candidate) -> (Candidate, Result<String, PipelineError>) {
        let result: Result<String, PipelineError> = async {
            let job_id = candidate
                .client
                .start(&self.bucket, &candidate.object.key)
                .await?;
            let mut job = ExtractionJob::new(job_id, candidate.kind, candidate.object.clone());
            poll_until_terminal(candidate.client.as_ref(), &mut job, &self.settings.poll_policy)
                .await
        }
        .await;
        (candidate, result)
    }
}

#[async_trait]
impl PipelineApi for PipelineService {
    async fn process(&self, request: BatchRequest) -> Result<PipelineOutcome, PipelineError> {
        self.run(&request).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobError, JobId, JobState};
    use crate::storage::InMemoryObjectStore;
    use crate::summarization::TruncatingSummarizer;

    /// Finishes every job on the first status check with a fixed text.
    struct InstantClient(ExtractionKind);

    #[async_trait]
    impl ExtractionJobClient for InstantClient {
        fn kind(&self) -> ExtractionKind {
            self.0
        }

        async fn start(&self, _bucket: &str, key: &str) -> Result<JobId, JobError> {
            Ok(JobId::from(key))
        }

        async fn poll(&self, job_id: &JobId) -> Result<JobState, JobError> {
            Ok(JobState::Succeeded(format!("text of {job_id}")))
        }
    }

    fn service(objects: &[&str], router: JobRouter) -> PipelineService {
        let storage = InMemoryObjectStore::with_objects(
            "bucket",
            objects.iter().map(|key| (*key, Vec::<u8>::new())),
        );
        PipelineService::new(
            "bucket",
            PipelineSettings::default(),
            Arc::new(storage),
            router,
            Arc::new(TruncatingSummarizer::new(100)),
        )
    }

    #[test]
    fn plan_skips_unsupported_and_unrouted_objects() {
        let router = JobRouter::new().with_client(Arc::new(InstantClient(ExtractionKind::Ocr)));
        let service = service(&[], router);
        let objects = ["id/a.pdf", "id/b.wav", "id/notes.txt", "id/c.PDF"]
            .into_iter()
            .map(ObjectRef::from_key)
            .collect();

        let (candidates, skipped) = service.plan(objects);

        let planned: Vec<(usize, &str)> = candidates
            .iter()
            .map(|candidate| (candidate.index, candidate.object.key.as_str()))
            .collect();
        assert_eq!(planned, [(0, "id/a.pdf"), (3, "id/c.PDF")]);
        assert_eq!(skipped, ["id/b.wav", "id/notes.txt"]);
    }

    #[tokio::test(start_paused = true)]
    async fn digest_covers_the_summarizer_input() {
        let router = JobRouter::new().with_client(Arc::new(InstantClient(ExtractionKind::Ocr)));
        let service = service(&["id/a.pdf"], router);
        let request = BatchRequest::for_identifier("id").expect("request");

        let outcome = service.run(&request).await.expect("outcome");

        let expected = "\n\nOCR from id/a.pdf:\ntext of id/a.pdf";
        assert_eq!(
            outcome.input_digest,
            hex::encode(Sha256::digest(expected.as_bytes()))
        );
        assert_eq!(outcome.processed, ["id/a.pdf"]);
        assert_eq!(service.metrics_snapshot().jobs_succeeded, 1);
    }

    #[test]
    fn settings_never_allow_zero_concurrency() {
        let config = PipelineConfig {
            max_concurrent_jobs: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(PipelineSettings::from_config(&config).max_concurrent_jobs, 1);
    }
}
