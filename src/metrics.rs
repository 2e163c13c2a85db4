use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    jobs_succeeded: AtomicU64,
    jobs_failed: AtomicU64,
    objects_skipped: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a batch request that produced a summary.
    pub fn record_request_success(&self) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch request that ended in an error.
    pub fn record_request_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an extraction job that reached `Succeeded`.
    pub fn record_job_success(&self) {
        self.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an extraction job that failed to start, failed, or timed out.
    pub fn record_job_failure(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record objects that were listed but never dispatched.
    pub fn record_skipped(&self, count: u64) {
        self.objects_skipped.fetch_add(count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            objects_skipped: self.objects_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Batch requests that returned a summary.
    pub requests_succeeded: u64,
    /// Batch requests that returned an error.
    pub requests_failed: u64,
    /// Extraction jobs that succeeded.
    pub jobs_succeeded: u64,
    /// Extraction jobs that failed, were rejected, or timed out.
    pub jobs_failed: u64,
    /// Listed objects skipped as unsupported or disabled.
    pub objects_skipped: u64,
}
