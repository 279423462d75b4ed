//! Status polling with exponential backoff and cooperative cancellation.
//!
//! A [`JobPoller`] owns one job. After a short warm-up it checks the status
//! endpoint, waiting `base_delay`, then `base_delay * factor`, and so on up to
//! `max_delay` between checks. At most one check is in flight: the next wait
//! only starts once the previous response (or error) has arrived.
//!
//! Network errors end the run. There is no retry; a transient outage shows up
//! as [`JobFailure::Network`] and the caller may start a fresh poller.

use std::time::Duration;

use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, instrument, warn};

use alignwatch_client::ArtifactFetcher;
use alignwatch_shared::{
    AlignwatchError, Job, JobId, JobStatus, PollConfig, ReportedStatus, Result, ResultView,
};

use crate::assembler::{AssemblyError, ResultAssembler};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why a job ended without results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    /// The server reported a terminal non-success status.
    Reported { status: ReportedStatus },
    /// A status check failed in transport.
    Network(String),
    /// A status response could not be understood.
    MalformedPayload(String),
}

impl JobFailure {
    pub fn from_error(err: &AlignwatchError) -> Self {
        match err {
            AlignwatchError::Network(message) => Self::Network(message.clone()),
            AlignwatchError::MalformedPayload { message } => Self::MalformedPayload(message.clone()),
            other => Self::MalformedPayload(other.to_string()),
        }
    }
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reported { status } => write!(f, "job reported {status}"),
            Self::Network(message) => write!(f, "status check failed: {message}"),
            Self::MalformedPayload(message) => write!(f, "unreadable status: {message}"),
        }
    }
}

/// How a polling run ended. Exactly one is produced per run.
#[derive(Debug)]
pub enum PollOutcome {
    Completed(ResultView),
    /// The job completed but its mandatory artifact could not be loaded.
    AssemblyFailed(AssemblyError),
    Failed(JobFailure),
    /// Stopped by the caller; no further checks were issued.
    Cancelled,
}

impl PollOutcome {
    /// Final job status implied by this outcome.
    pub fn job_status(&self) -> JobStatus {
        match self {
            Self::Completed(_) | Self::AssemblyFailed(_) => JobStatus::Completed,
            Self::Failed(_) => JobStatus::Failed,
            Self::Cancelled => JobStatus::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Progress trait
// ---------------------------------------------------------------------------

/// Progress callback for polling runs.
pub trait PollProgress: Send + Sync {
    /// The next check (1-based) will be issued after `delay`.
    fn check_scheduled(&self, attempt: u32, delay: Duration);
    /// A check returned a status.
    fn status_observed(&self, attempt: u32, status: ReportedStatus);
    /// The run is over.
    fn finished(&self, outcome: &PollOutcome);
}

/// No-op progress reporter.
pub struct SilentPoll;

impl PollProgress for SilentPoll {
    fn check_scheduled(&self, _attempt: u32, _delay: Duration) {}
    fn status_observed(&self, _attempt: u32, _status: ReportedStatus) {}
    fn finished(&self, _outcome: &PollOutcome) {}
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Delay after `current`: multiplied by the factor, capped at `max_delay`,
/// never shorter than `current`.
pub fn next_delay(current: Duration, config: &PollConfig) -> Duration {
    Duration::try_from_secs_f64(current.as_secs_f64() * config.backoff_factor)
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
        .max(current)
}

#[derive(Debug, Clone, Copy)]
struct PollState {
    /// Wait before the next check once the current one reports PENDING.
    delay: Duration,
    checks: u32,
}

impl PollState {
    fn new(config: &PollConfig) -> Self {
        Self {
            delay: config.base_delay,
            checks: 0,
        }
    }

    /// Take the current delay and grow the stored one.
    fn advance(&mut self, config: &PollConfig) -> Duration {
        let delay = self.delay;
        self.delay = next_delay(delay, config);
        delay
    }
}

// ---------------------------------------------------------------------------
// Cancellation handle
// ---------------------------------------------------------------------------

/// Stops a running poller from another task.
#[derive(Debug, Clone)]
pub struct PollCanceller {
    token: CancellationToken,
}

impl PollCanceller {
    /// Idempotent; a no-op once the run has ended.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancels the poller when dropped, e.g. when a results screen closes.
    pub fn guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

pub struct JobPoller {
    job: Job,
    fetcher: ArtifactFetcher,
    config: PollConfig,
    state: PollState,
    cancel: CancellationToken,
}

impl JobPoller {
    /// Create a poller for a freshly submitted (PENDING) job.
    pub fn new(fetcher: ArtifactFetcher, job_id: JobId, config: PollConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            job: Job {
                id: job_id,
                status: JobStatus::Pending,
            },
            fetcher,
            state: PollState::new(&config),
            config,
            cancel: CancellationToken::new(),
        })
    }

    pub fn canceller(&self) -> PollCanceller {
        PollCanceller {
            token: self.cancel.clone(),
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Poll until the job is terminal or the run is cancelled.
    ///
    /// Once a COMPLETED status has been observed the run is terminal:
    /// cancelling during result assembly has no effect. Afterwards
    /// [`job`](Self::job) reports the terminal status; running a poller whose
    /// job is already terminal issues no checks and returns `Cancelled`.
    #[instrument(skip_all, fields(job_id = %self.job.id))]
    pub async fn run(&mut self, progress: &dyn PollProgress) -> PollOutcome {
        if self.job.status.is_terminal() {
            debug!(status = ?self.job.status, "job already terminal");
            let outcome = PollOutcome::Cancelled;
            progress.finished(&outcome);
            return outcome;
        }
        let outcome = self.drive(progress).await;
        if !matches!(outcome, PollOutcome::Cancelled) {
            self.job.status = outcome.job_status();
        }
        match &outcome {
            PollOutcome::Completed(view) => info!(
                checks = self.state.checks,
                warnings = view.warnings.len(),
                "job completed"
            ),
            PollOutcome::AssemblyFailed(e) => warn!(error = %e, "job completed without results"),
            PollOutcome::Failed(failure) => warn!(checks = self.state.checks, %failure, "job failed"),
            PollOutcome::Cancelled => info!(checks = self.state.checks, "polling cancelled"),
        }
        progress.finished(&outcome);
        outcome
    }

    async fn drive(&mut self, progress: &dyn PollProgress) -> PollOutcome {
        let mut wait = self.config.warmup_delay;

        loop {
            let attempt = self.state.checks + 1;
            progress.check_scheduled(attempt, wait);
            if !self.sleep(wait).await {
                return PollOutcome::Cancelled;
            }

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return PollOutcome::Cancelled,
                fetched = self.fetcher.status(&self.job.id) => fetched,
            };
            self.state.checks = attempt;

            let payload = match fetched {
                Ok(payload) => payload,
                Err(e) => return PollOutcome::Failed(JobFailure::from_error(&e)),
            };
            debug!(attempt, status = %payload.status, "status checked");
            progress.status_observed(attempt, payload.status);

            if let Some(reported) = &payload.job_id {
                if reported != &self.job.id {
                    return PollOutcome::Failed(JobFailure::MalformedPayload(format!(
                        "status response is for job {reported}"
                    )));
                }
            }

            match payload.status.job_status() {
                JobStatus::Pending => wait = self.state.advance(&self.config),
                JobStatus::Failed => {
                    return PollOutcome::Failed(JobFailure::Reported {
                        status: payload.status,
                    });
                }
                JobStatus::Completed => {
                    let completed = match payload.into_completed(&self.job.id) {
                        Ok(completed) => completed,
                        Err(e) => return PollOutcome::Failed(JobFailure::from_error(&e)),
                    };
                    return match ResultAssembler::new(self.fetcher.clone())
                        .assemble(&completed)
                        .await
                    {
                        Ok(view) => PollOutcome::Completed(view),
                        Err(e) => PollOutcome::AssemblyFailed(e),
                    };
                }
            }
        }
    }

    /// Wait `delay` unless cancelled first. Returns `false` when cancelled.
    async fn sleep(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => !self.cancel.is_cancelled(),
        }
    }
}
