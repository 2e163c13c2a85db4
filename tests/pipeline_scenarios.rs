use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use docpipe::{
    config::FailurePolicy,
    jobs::{ExtractionJobClient, JobError, JobId, JobRouter, JobState},
    pipeline::{
        BatchRequest, ExtractionKind, PipelineApi, PipelineError, PipelineService,
        PipelineSettings, PollPolicy,
    },
    storage::InMemoryObjectStore,
    summarization::{SummarizationError, Summarizer, TruncatingSummarizer},
};
use tokio::time::Instant;

const BUCKET: &str = "case-files";

/// Extraction backend replaying a per-key script of job states.
struct ScriptedBackend {
    kind: ExtractionKind,
    scripts: Mutex<HashMap<String, VecDeque<JobState>>>,
    started: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    fn new(kind: ExtractionKind) -> Self {
        Self {
            kind,
            scripts: Mutex::new(HashMap::new()),
            started: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Report `InProgress` for `pending` checks, then `last`.
    fn script(self, key: &str, pending: usize, last: JobState) -> Self {
        let mut states: VecDeque<JobState> =
            std::iter::repeat_n(JobState::InProgress, pending).collect();
        states.push_back(last);
        self.scripts.lock().unwrap().insert(key.to_string(), states);
        self
    }

    fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionJobClient for ScriptedBackend {
    fn kind(&self) -> ExtractionKind {
        self.kind
    }

    async fn start(&self, bucket: &str, key: &str) -> Result<JobId, JobError> {
        assert_eq!(bucket, BUCKET);
        self.started.lock().unwrap().push(key.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Ok(JobId::from(key))
    }

    async fn poll(&self, job_id: &JobId) -> Result<JobState, JobError> {
        let state = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(job_id.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or(JobState::InProgress);
        if state != JobState::InProgress {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(state)
    }
}

/// Truncating summarizer that remembers every input it was handed.
struct RecordingSummarizer {
    inner: TruncatingSummarizer,
    inputs: Mutex<Vec<String>>,
}

impl RecordingSummarizer {
    fn new() -> Self {
        Self {
            inner: TruncatingSummarizer::new(100),
            inputs: Mutex::new(Vec::new()),
        }
    }

    fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for RecordingSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizationError> {
        self.inputs.lock().unwrap().push(text.to_string());
        self.inner.summarize(text).await
    }
}

fn settings(max_concurrent_jobs: usize, failure_policy: FailurePolicy) -> PipelineSettings {
    PipelineSettings {
        poll_policy: PollPolicy {
            interval: Duration::from_secs(5),
            max_attempts: None,
            deadline: None,
        },
        max_concurrent_jobs,
        failure_policy,
    }
}

fn pipeline(
    keys: &[&str],
    router: JobRouter,
    summarizer: Arc<RecordingSummarizer>,
    settings: PipelineSettings,
) -> PipelineService {
    let storage = InMemoryObjectStore::with_objects(
        BUCKET,
        keys.iter().map(|key| (*key, b"payload".to_vec())),
    );
    PipelineService::new(BUCKET, settings, Arc::new(storage), router, summarizer)
}

fn request(id: &str) -> BatchRequest {
    BatchRequest::for_identifier(id).expect("valid identifier")
}

#[tokio::test(start_paused = true)]
async fn single_document_is_extracted_and_summarized() {
    let ocr = Arc::new(ScriptedBackend::new(ExtractionKind::Ocr).script(
        "case123/scan.pdf",
        1,
        JobState::Succeeded("Hello\nWorld".into()),
    ));
    let summarizer = Arc::new(RecordingSummarizer::new());
    let service = pipeline(
        &["case123/scan.pdf"],
        JobRouter::new().with_client(ocr.clone()),
        summarizer.clone(),
        PipelineSettings::default(),
    );

    let outcome = service.run(&request("case123")).await.expect("outcome");

    let expected = "\n\nOCR from case123/scan.pdf:\nHello\nWorld";
    assert_eq!(summarizer.inputs(), [expected]);
    assert_eq!(outcome.summary, format!("Summary: {expected}..."));
    assert_eq!(outcome.processed, ["case123/scan.pdf"]);
    assert!(outcome.skipped.is_empty());
}

#[tokio::test(start_paused = true)]
async fn disabled_transcription_contributes_nothing() {
    let ocr = Arc::new(ScriptedBackend::new(ExtractionKind::Ocr).script(
        "case1/a.pdf",
        0,
        JobState::Succeeded("alpha".into()),
    ));
    let summarizer = Arc::new(RecordingSummarizer::new());
    let service = pipeline(
        &["case1/a.pdf", "case1/b.wav"],
        JobRouter::new().with_client(ocr.clone()),
        summarizer.clone(),
        PipelineSettings::default(),
    );

    let outcome = service.run(&request("case1")).await.expect("outcome");

    assert_eq!(summarizer.inputs(), ["\n\nOCR from case1/a.pdf:\nalpha"]);
    assert_eq!(outcome.skipped, ["case1/b.wav"]);
    assert_eq!(ocr.started(), ["case1/a.pdf"]);
    assert_eq!(service.metrics_snapshot().objects_skipped, 1);
}

#[tokio::test(start_paused = true)]
async fn enabled_transcription_adds_its_block_in_listing_order() {
    let ocr = Arc::new(ScriptedBackend::new(ExtractionKind::Ocr).script(
        "case1/a.pdf",
        0,
        JobState::Succeeded("alpha".into()),
    ));
    let audio = Arc::new(ScriptedBackend::new(ExtractionKind::Transcription).script(
        "case1/b.wav",
        2,
        JobState::Succeeded("spoken words".into()),
    ));
    let summarizer = Arc::new(RecordingSummarizer::new());
    let service = pipeline(
        &["case1/a.pdf", "case1/b.wav"],
        JobRouter::new().with_client(ocr).with_client(audio),
        summarizer.clone(),
        PipelineSettings::default(),
    );

    let outcome = service.run(&request("case1")).await.expect("outcome");

    assert_eq!(
        summarizer.inputs(),
        ["\n\nOCR from case1/a.pdf:\nalpha\n\nTranscription from case1/b.wav:\nspoken words"]
    );
    assert_eq!(outcome.processed, ["case1/a.pdf", "case1/b.wav"]);
}

#[tokio::test(start_paused = true)]
async fn failed_job_aborts_and_discards_accumulated_text() {
    let ocr = Arc::new(
        ScriptedBackend::new(ExtractionKind::Ocr)
            .script("case1/a.pdf", 0, JobState::Succeeded("alpha".into()))
            .script("case1/b.pdf", 1, JobState::Failed("corrupt file".into())),
    );
    let summarizer = Arc::new(RecordingSummarizer::new());
    let service = pipeline(
        &["case1/a.pdf", "case1/b.pdf"],
        JobRouter::new().with_client(ocr),
        summarizer.clone(),
        PipelineSettings::default(),
    );

    let error = service.run(&request("case1")).await.expect_err("job failure");

    assert!(matches!(
        &error,
        PipelineError::JobFailed { key, reason } if key == "case1/b.pdf" && reason == "corrupt file"
    ));
    assert!(summarizer.inputs().is_empty(), "no summary after a failure");
    let metrics = service.metrics_snapshot();
    assert_eq!(metrics.jobs_succeeded, 1);
    assert_eq!(metrics.jobs_failed, 1);
    assert_eq!(metrics.requests_failed, 1);
}

#[tokio::test(start_paused = true)]
async fn empty_prefix_is_not_found_without_dispatching() {
    let ocr = Arc::new(ScriptedBackend::new(ExtractionKind::Ocr));
    let summarizer = Arc::new(RecordingSummarizer::new());
    let service = pipeline(
        &["other/scan.pdf"],
        JobRouter::new().with_client(ocr.clone()),
        summarizer.clone(),
        PipelineSettings::default(),
    );

    let error = service.run(&request("empty")).await.expect_err("not found");

    assert!(matches!(&error, PipelineError::NotFound { prefix } if prefix == "empty/"));
    assert!(ocr.started().is_empty());
    assert!(summarizer.inputs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unsupported_objects_summarize_empty_text() {
    let ocr = Arc::new(ScriptedBackend::new(ExtractionKind::Ocr));
    let summarizer = Arc::new(RecordingSummarizer::new());
    let service = pipeline(
        &["case1/readme.txt"],
        JobRouter::new().with_client(ocr.clone()),
        summarizer.clone(),
        PipelineSettings::default(),
    );

    let outcome = service.run(&request("case1")).await.expect("outcome");

    assert!(ocr.started().is_empty());
    assert_eq!(summarizer.inputs(), [""]);
    assert_eq!(outcome.summary, "Summary: ...");
    assert_eq!(outcome.skipped, ["case1/readme.txt"]);
}

#[tokio::test(start_paused = true)]
async fn identical_inputs_produce_identical_digests() {
    let script = || {
        ScriptedBackend::new(ExtractionKind::Ocr)
            .script("case1/a.pdf", 1, JobState::Succeeded("alpha".into()))
            .script("case1/b.pdf", 0, JobState::Succeeded("beta".into()))
    };
    let keys = ["case1/a.pdf", "case1/b.pdf"];

    let first = pipeline(
        &keys,
        JobRouter::new().with_client(Arc::new(script())),
        Arc::new(RecordingSummarizer::new()),
        PipelineSettings::default(),
    )
    .run(&request("case1"))
    .await
    .expect("first run");
    let second = pipeline(
        &keys,
        JobRouter::new().with_client(Arc::new(script())),
        Arc::new(RecordingSummarizer::new()),
        settings(2, FailurePolicy::FailFast),
    )
    .run(&request("case1"))
    .await
    .expect("second run");

    assert_eq!(first.input_digest, second.input_digest);
    assert_eq!(first.summary, second.summary);
}

#[tokio::test(start_paused = true)]
async fn skip_failed_policy_reports_failed_sources() {
    let ocr = Arc::new(
        ScriptedBackend::new(ExtractionKind::Ocr)
            .script("case1/a.pdf", 0, JobState::Succeeded("alpha".into()))
            .script("case1/b.pdf", 0, JobState::Failed("corrupt".into()))
            .script("case1/c.pdf", 0, JobState::Succeeded("gamma".into())),
    );
    let summarizer = Arc::new(RecordingSummarizer::new());
    let service = pipeline(
        &["case1/a.pdf", "case1/b.pdf", "case1/c.pdf"],
        JobRouter::new().with_client(ocr),
        summarizer.clone(),
        settings(1, FailurePolicy::SkipFailed),
    );

    let outcome = service.run(&request("case1")).await.expect("outcome");

    assert_eq!(outcome.processed, ["case1/a.pdf", "case1/c.pdf"]);
    assert_eq!(outcome.failed, ["case1/b.pdf"]);
    assert_eq!(
        summarizer.inputs(),
        ["\n\nOCR from case1/a.pdf:\nalpha\n\nOCR from case1/c.pdf:\ngamma"]
    );
}

#[tokio::test(start_paused = true)]
async fn default_dispatch_is_sequential() {
    let ocr = Arc::new(
        ScriptedBackend::new(ExtractionKind::Ocr)
            .script("case1/a.pdf", 2, JobState::Succeeded("alpha".into()))
            .script("case1/b.pdf", 2, JobState::Succeeded("beta".into())),
    );
    let service = pipeline(
        &["case1/a.pdf", "case1/b.pdf"],
        JobRouter::new().with_client(ocr.clone()),
        Arc::new(RecordingSummarizer::new()),
        settings(1, FailurePolicy::FailFast),
    );
    let started = Instant::now();

    service.run(&request("case1")).await.expect("outcome");

    assert_eq!(ocr.max_in_flight.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn concurrent_dispatch_keeps_listing_order() {
    let ocr = Arc::new(
        ScriptedBackend::new(ExtractionKind::Ocr)
            .script("case1/a.pdf", 4, JobState::Succeeded("alpha".into()))
            .script("case1/b.pdf", 0, JobState::Succeeded("beta".into()))
            .script("case1/c.pdf", 1, JobState::Succeeded("gamma".into())),
    );
    let summarizer = Arc::new(RecordingSummarizer::new());
    let service = pipeline(
        &["case1/a.pdf", "case1/b.pdf", "case1/c.pdf"],
        JobRouter::new().with_client(ocr.clone()),
        summarizer.clone(),
        settings(3, FailurePolicy::FailFast),
    );
    let started = Instant::now();

    let outcome = service.run(&request("case1")).await.expect("outcome");

    assert_eq!(ocr.max_in_flight.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(outcome.processed, ["case1/a.pdf", "case1/b.pdf", "case1/c.pdf"]);
    assert_eq!(
        summarizer.inputs(),
        ["\n\nOCR from case1/a.pdf:\nalpha\n\nOCR from case1/b.pdf:\nbeta\n\nOCR from case1/c.pdf:\ngamma"]
    );
}

#[tokio::test(start_paused = true)]
async fn stuck_job_times_out_after_attempt_cap() {
    let ocr = Arc::new(ScriptedBackend::new(ExtractionKind::Ocr));
    let mut bounded = settings(1, FailurePolicy::FailFast);
    bounded.poll_policy.max_attempts = Some(2);
    let service = pipeline(
        &["case1/a.pdf"],
        JobRouter::new().with_client(ocr),
        Arc::new(RecordingSummarizer::new()),
        bounded,
    );

    let error = service.run(&request("case1")).await.expect_err("timeout");

    assert!(matches!(error, PipelineError::JobTimedOut { attempts: 2, .. }));
    assert_eq!(error.kind(), "job_timed_out");
}
