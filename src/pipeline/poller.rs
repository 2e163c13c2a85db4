//! Bounded polling loop that drives one extraction job to a terminal state.
//!
//! Waits go through tokio's timer, so tests run with paused time and never sleep for real.

use super::types::{ExtractionJob, PipelineError};
use crate::config::PipelineConfig;
use crate::jobs::{ExtractionJobClient, JobState};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Wait between status checks when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Per-job wall-clock budget when nothing else is configured.
pub const DEFAULT_JOB_DEADLINE: Duration = Duration::from_secs(15 * 60);

/// How often and how long to poll a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before each status check.
    pub interval: Duration,
    /// Upper bound on status checks.
    pub max_attempts: Option<u32>,
    /// Upper bound on total waiting time.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            deadline: Some(DEFAULT_JOB_DEADLINE),
        }
    }
}

impl PollPolicy {
    /// Derive the policy from pipeline settings.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_secs),
            max_attempts: config.max_poll_attempts,
            deadline: config.job_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Poll `job` until the backend reports a terminal state.
///
/// Each cycle waits one interval, then issues exactly one status query. Returns the extracted
/// text on success, [`PipelineError::JobFailed`] on a backend failure, and
/// [`PipelineError::JobTimedOut`] once the next wait would exceed the attempt cap or deadline.
pub async fn poll_until_terminal(
    client: &dyn ExtractionJobClient,
    job: &mut ExtractionJob,
    policy: &PollPolicy,
) -> Result<String, PipelineError> {
    let deadline = policy.deadline.map(|budget| Instant::now() + budget);
    let mut attempts: u32 = 0;

    loop {
        let attempts_exhausted = policy.max_attempts.is_some_and(|max| attempts >= max);
        let past_deadline =
            deadline.is_some_and(|deadline| Instant::now() + policy.interval > deadline);
        if attempts_exhausted || past_deadline {
            tracing::warn!(
                key = %job.source().key,
                job_id = %job.job_id(),
                attempts,
                "Abandoning extraction job"
            );
            return Err(PipelineError::JobTimedOut {
                key: job.source().key.clone(),
                attempts,
            });
        }

        sleep(policy.interval).await;
        attempts += 1;

        match client.poll(job.job_id()).await? {
            JobState::InProgress => {
                job.mark_in_progress()?;
                tracing::debug!(
                    key = %job.source().key,
                    job_id = %job.job_id(),
                    attempt = attempts,
                    "Extraction job still running"
                );
            }
            JobState::Succeeded(text) => {
                job.succeed(text.clone())?;
                tracing::info!(
                    key = %job.source().key,
                    job_id = %job.job_id(),
                    kind = %job.kind(),
                    attempts,
                    chars = text.len(),
                    "Extraction job succeeded"
                );
                return Ok(text);
            }
            JobState::Failed(reason) => {
                job.fail()?;
                tracing::warn!(
                    key = %job.source().key,
                    job_id = %job.job_id(),
                    attempts,
                    reason = %reason,
                    "Extraction job failed"
                );
                return Err(PipelineError::JobFailed {
                    key: job.source().key.clone(),
                    reason,
                });
            }
        }
    }
}
