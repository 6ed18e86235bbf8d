//! The status polling loop.
//!
//! A poll moves through [`PollPhase`]s: it starts in `Validating`, alternates
//! between `Polling` and `Sleeping`, and ends in exactly one terminal phase.

mod scheduler;

pub use scheduler::{FixedJitter, IntervalScheduler, JitterSource, PollState, RandomJitter};

use crate::config::PollerConfig;
use crate::domain::{JobId, JobResult, StatusResponse};
use crate::error::{Error, ErrorKind, Result};
use crate::infra::{RawStatus, StatusApi, TransportError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

/// Where a poll is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Validating,
    Polling,
    Sleeping,
    Succeeded,
    TimedOut,
    ApiError,
    TranslationFailed,
    InvalidJob,
    Cancelled,
}

impl PollPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            PollPhase::Validating | PollPhase::Polling | PollPhase::Sleeping
        )
    }

    /// The terminal phase a finished poll ended in.
    pub fn of_outcome(outcome: &Result<StatusResponse>) -> Self {
        match outcome {
            Ok(_) => PollPhase::Succeeded,
            Err(e) => match e.kind() {
                ErrorKind::InvalidJobId => PollPhase::InvalidJob,
                ErrorKind::Timeout => PollPhase::TimedOut,
                ErrorKind::TranslationFailed => PollPhase::TranslationFailed,
                ErrorKind::Cancelled => PollPhase::Cancelled,
                ErrorKind::Api | ErrorKind::Configuration => PollPhase::ApiError,
            },
        }
    }
}

impl fmt::Display for PollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollPhase::Validating => "validating",
            PollPhase::Polling => "polling",
            PollPhase::Sleeping => "sleeping",
            PollPhase::Succeeded => "succeeded",
            PollPhase::TimedOut => "timed_out",
            PollPhase::ApiError => "api_error",
            PollPhase::TranslationFailed => "translation_failed",
            PollPhase::InvalidJob => "invalid_job",
            PollPhase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Polls a job's status until it completes, fails, or runs out of time.
///
/// One poller can serve any number of concurrent polls; each call to
/// [`StatusPoller::poll_status`] owns its own [`PollState`].
pub struct StatusPoller<A: StatusApi> {
    api: Arc<A>,
    config: PollerConfig,
    scheduler: IntervalScheduler,
}

impl<A: StatusApi> StatusPoller<A> {
    /// Creates a poller, failing fast on an invalid configuration.
    pub fn new(api: Arc<A>, config: PollerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            api,
            config,
            scheduler: IntervalScheduler::default(),
        })
    }

    /// Replaces the scheduler, e.g. to make waits deterministic.
    pub fn with_scheduler(mut self, scheduler: IntervalScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Polls `job_id` until a terminal state, or fails once `timeout` has
    /// elapsed.
    pub async fn poll_status(&self, job_id: &str, timeout: Duration) -> Result<StatusResponse> {
        self.poll_status_with_cancel(job_id, timeout, &CancellationToken::new())
            .await
    }

    /// Like [`poll_status`](Self::poll_status), but also stops as soon as
    /// `cancel` fires, whether the poll is waiting on a request or sleeping.
    #[instrument(skip(self, timeout, cancel), fields(timeout_secs = timeout.as_secs_f64()))]
    pub async fn poll_status_with_cancel(
        &self,
        job_id: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<StatusResponse> {
        trace!(phase = %PollPhase::Validating);
        let outcome = match JobId::parse(job_id) {
            Ok(job_id) => self.run(&job_id, timeout, cancel).await,
            Err(e) => Err(Error::InvalidJobId {
                job_id: e.input().to_string(),
                reason: e.reason().to_string(),
            }),
        };

        let phase = PollPhase::of_outcome(&outcome);
        match &outcome {
            Ok(_) => info!(phase = %phase, "Job completed"),
            Err(e) => debug!(phase = %phase, error = %e, "Polling stopped"),
        }
        outcome
    }

    async fn run(
        &self,
        job_id: &JobId,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<StatusResponse> {
        let mut state = PollState::new(&self.config, Instant::now());
        let mut polls = 0u32;
        let mut transport_failures = 0u32;

        loop {
            let elapsed = state.observe(Instant::now());
            if elapsed > timeout {
                return Err(timed_out(job_id, timeout, elapsed));
            }

            polls += 1;
            trace!(phase = %PollPhase::Polling, poll = polls);

            let remaining = timeout.saturating_sub(elapsed);
            let request = self
                .api
                .fetch_status(job_id, remaining.min(self.config.request_timeout));

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(cancelled(job_id, state.observe(Instant::now())));
                }
                fetched = tokio::time::timeout(remaining, request) => fetched,
            };

            let raw = match fetched {
                Err(_) => return Err(timed_out(job_id, timeout, state.observe(Instant::now()))),
                Ok(Err(e)) => {
                    let elapsed = state.observe(Instant::now());
                    if elapsed >= timeout {
                        return Err(timed_out(job_id, timeout, elapsed));
                    }
                    if transport_failures >= self.config.transport_retries {
                        return Err(transport_failed(e));
                    }
                    transport_failures += 1;
                    warn!(
                        poll = polls,
                        attempt = transport_failures,
                        max_retries = self.config.transport_retries,
                        error = %e,
                        "Status request failed; will retry"
                    );
                    None
                }
                Ok(Ok(raw)) => {
                    transport_failures = 0;
                    Some(raw)
                }
            };

            if let Some(raw) = raw {
                let status = interpret(job_id, raw)?;
                match status.result() {
                    JobResult::Completed => return Ok(status),
                    JobResult::Error => {
                        return Err(Error::TranslationFailed {
                            job_id: job_id.to_string(),
                        });
                    }
                    JobResult::Pending => debug!(poll = polls, "Job still pending"),
                    JobResult::Unknown(tag) => {
                        warn!(
                            poll = polls,
                            result = %tag,
                            "Unrecognized job result; treating as pending"
                        )
                    }
                }
            }

            let delay = self.scheduler.next(&mut state);
            let remaining = timeout.saturating_sub(state.observe(Instant::now()));
            // A wake-up landing exactly on the deadline still gets one last poll.
            let hits_deadline = delay > remaining;
            trace!(phase = %PollPhase::Sleeping, ?delay, ?remaining);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(cancelled(job_id, state.observe(Instant::now())));
                }
                _ = tokio::time::sleep(delay.min(remaining)) => {}
            }

            if hits_deadline {
                return Err(timed_out(job_id, timeout, state.observe(Instant::now())));
            }
        }
    }
}

impl<A: StatusApi> fmt::Debug for StatusPoller<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusPoller")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Maps one HTTP reply onto the poll's outcome. Only 200 replies with a
/// decodable body get past this point.
fn interpret(job_id: &JobId, raw: RawStatus) -> Result<StatusResponse> {
    match raw.status_code {
        200 => StatusResponse::decode(&raw.body).map_err(|e| Error::Api {
            status_code: 200,
            message: format!("failed to decode status body: {e}"),
            response_body: raw.body,
        }),
        404 => Err(Error::InvalidJobId {
            job_id: job_id.to_string(),
            reason: "job not found on server".to_string(),
        }),
        code => Err(Error::Api {
            status_code: code,
            message: format!("unexpected status code {code}"),
            response_body: raw.body,
        }),
    }
}

fn transport_failed(e: TransportError) -> Error {
    Error::Api {
        status_code: 0,
        message: e.to_string(),
        response_body: String::new(),
    }
}

fn timed_out(job_id: &JobId, timeout: Duration, elapsed: Duration) -> Error {
    Error::Timeout {
        job_id: job_id.to_string(),
        timeout,
        elapsed,
    }
}

fn cancelled(job_id: &JobId, elapsed: Duration) -> Error {
    Error::Cancelled {
        job_id: job_id.to_string(),
        elapsed,
    }
}
