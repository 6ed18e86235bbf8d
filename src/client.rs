use crate::config::ClientConfig;
use crate::domain::StatusResponse;
use crate::error::Result;
use crate::infra::{HttpStatusApi, StatusApi};
use crate::poller::StatusPoller;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default overall wait for a translation to finish.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Entry point for callers: a poller bound to one status endpoint and
/// credential.
///
/// Cheap to share; concurrent calls for different jobs do not interact. All
/// calls go through one HTTP connection pool owned by the client instead of
/// a session per call; see [`HttpStatusApi`] for how connections are scoped.
#[derive(Debug)]
pub struct TranslationClient<A: StatusApi = HttpStatusApi> {
    poller: StatusPoller<A>,
}

impl TranslationClient<HttpStatusApi> {
    /// Create a client talking HTTP to `config.base_url`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let api = Arc::new(HttpStatusApi::new(&config)?);
        let poller = StatusPoller::new(api, config.poller)?;

        Ok(Self { poller })
    }
}

impl<A: StatusApi> TranslationClient<A> {
    /// Create a client around an already configured poller.
    pub fn with_poller(poller: StatusPoller<A>) -> Self {
        Self { poller }
    }

    pub fn poller(&self) -> &StatusPoller<A> {
        &self.poller
    }

    /// Waits for `job_id` to finish and returns its completed status body.
    pub async fn get_translation_status(
        &self,
        job_id: &str,
        timeout: Duration,
    ) -> Result<StatusResponse> {
        self.poller.poll_status(job_id, timeout).await
    }

    /// Like [`get_translation_status`](Self::get_translation_status), stopping
    /// early when `cancel` fires.
    pub async fn get_translation_status_with_cancel(
        &self,
        job_id: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<StatusResponse> {
        self.poller
            .poll_status_with_cancel(job_id, timeout, cancel)
            .await
    }
}
