//! # Status Polling
//!
//! Bounded, cancellable polling of `GET /status/{jobId}`.
//!
//! ## Workflow
//!
//! 1. Check the cancellation token and the wall-clock deadline
//! 2. Request the status envelope
//! 3. Discard the response if the run was cancelled meanwhile
//! 4. Stop on `completed` (with the file name) or `failed`
//! 5. Otherwise wait one interval, aborting early on cancellation
//!
//! Running out of attempts, or passing the deadline, yields
//! [`PipelineError::Timeout`]. The deadline also bounds the delay between
//! requests and an in-flight status request.

use crate::api::Backend;
use crate::error::{PipelineError, Result, Stage};
use crate::models::{Job, JobId, JobStatus, StatusData, StatusEnvelope};
use bridge_traits::HttpRequest;
use core_runtime::config::{CoreConfig, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use std::time::Duration;
use tokio::time::{sleep_until, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Bounds on status polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two status requests
    pub interval: Duration,
    /// Maximum number of status requests
    pub max_attempts: u32,
    /// Optional wall-clock bound measured from the first request
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            deadline: None,
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            interval: config.poll_interval,
            max_attempts: config.max_poll_attempts,
            deadline: config.poll_timeout,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// A job that reached `completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    pub job: Job,
    pub file_name: String,
    /// Number of status requests it took
    pub attempts: u32,
}

/// Repeatedly queries job status until a terminal state.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    backend: Backend,
    policy: PollPolicy,
}

impl StatusPoller {
    pub fn new(backend: Backend, policy: PollPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll until `job` reaches a terminal status.
    ///
    /// `on_status` is invoked with the updated job and the 1-based attempt
    /// number for every observation that does not move the status backwards.
    #[instrument(skip(self, job, token, on_status), fields(job_id = %job.id))]
    pub async fn poll<F>(
        &self,
        job: &Job,
        token: &CancellationToken,
        mut on_status: F,
    ) -> Result<CompletedJob>
    where
        F: FnMut(&Job, u32),
    {
        let started = Instant::now();
        let deadline_at = self.policy.deadline.map(|deadline| started + deadline);
        let mut current = job.clone();
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if token.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            if deadline_at.is_some_and(|at| Instant::now() >= at) {
                return Err(self.timeout(&current.id, attempt - 1, started));
            }

            debug!(attempt, max_attempts, "Checking job status");
            let fetched = match deadline_at {
                Some(at) => timeout_at(at, self.fetch_status(&current.id)).await.ok(),
                None => Some(self.fetch_status(&current.id).await),
            };

            if token.is_cancelled() {
                debug!(attempt, "Discarding status response after cancellation");
                return Err(PipelineError::Cancelled);
            }

            let Some(result) = fetched else {
                debug!(attempt, "Status request outlived the polling deadline");
                return Err(self.timeout(&current.id, attempt, started));
            };
            let (status, data) = result?;

            if !status.advances_from(current.status) {
                warn!(
                    previous = %current.status,
                    reported = %status,
                    "Ignoring job status regression"
                );
            } else {
                current = current.with_status(status);
                on_status(&current, attempt);
            }

            match current.status {
                JobStatus::Completed => {
                    let file_name = data
                        .file_name
                        .filter(|name| !name.trim().is_empty())
                        .ok_or_else(|| PipelineError::protocol(Stage::Status, "data.fileName"))?;

                    info!(attempt, file_name = %file_name, "Job completed");
                    return Ok(CompletedJob {
                        job: current,
                        file_name,
                        attempts: attempt,
                    });
                }
                JobStatus::Failed => {
                    warn!(attempt, message = ?data.message, "Job failed on the backend");
                    return Err(PipelineError::JobFailure {
                        job_id: current.id.to_string(),
                        message: data.message,
                    });
                }
                JobStatus::Queued | JobStatus::Processing => {}
            }

            if attempt < max_attempts {
                let next = Instant::now() + self.policy.interval;
                let wake = deadline_at.map_or(next, |at| next.min(at));
                tokio::select! {
                    _ = token.cancelled() => return Err(PipelineError::Cancelled),
                    _ = sleep_until(wake) => {}
                }
            }
        }

        Err(self.timeout(&current.id, max_attempts, started))
    }

    async fn fetch_status(&self, job_id: &JobId) -> Result<(JobStatus, StatusData)> {
        let url = self.backend.endpoint(&["status", job_id.as_str()]);
        let envelope: StatusEnvelope = self
            .backend
            .execute_json(Stage::Status, HttpRequest::get(url.as_str()))
            .await?;

        if envelope.status.as_deref() != Some("ok") {
            return Err(PipelineError::api(
                Stage::Status,
                None,
                format!(
                    "backend reported status {:?}",
                    envelope.status.as_deref().unwrap_or("<missing>")
                ),
            ));
        }

        let data = envelope
            .data
            .filter(|data| !data.is_null())
            .ok_or_else(|| PipelineError::protocol(Stage::Status, "data"))?;
        let data = StatusData::parse(data)?;

        let status = data
            .status
            .as_deref()
            .and_then(|s| s.parse::<JobStatus>().ok())
            .ok_or_else(|| PipelineError::protocol(Stage::Status, "data.status"))?;

        Ok((status, data))
    }

    fn timeout(&self, job_id: &JobId, attempts: u32, started: Instant) -> PipelineError {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        warn!(attempts, elapsed_ms, "Giving up on job status polling");
        PipelineError::Timeout {
            job_id: job_id.to_string(),
            attempts,
            elapsed_ms,
        }
    }
}
