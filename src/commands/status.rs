use crate::cli::StatusArgs;
use crate::client::TranslationClient;
use crate::config::{ClientConfig, ConfigFile};
use crate::domain::StatusResponse;
use crate::error::{Error, Result};
use crate::infra::StatusApi;
use crate::term;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Builds the client configuration from defaults, the config file, and the
/// command's flags (which already carry their `TPOLL_*` environment values).
pub fn resolve_config(args: &StatusArgs, file: &ConfigFile) -> Result<ClientConfig> {
    let mut config = ClientConfig::default();
    file.apply_to(&mut config)?;

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(api_key) = &args.api_key {
        config.api_key = Some(api_key.clone());
    }

    let poller = &mut config.poller;
    if let Some(interval) = args.initial_interval {
        poller.initial_interval = interval;
    }
    if let Some(interval) = args.max_interval {
        poller.max_interval = interval;
    }
    if let Some(factor) = args.backoff_factor {
        poller.backoff_factor = factor;
    }
    if let Some(retries) = args.transport_retries {
        poller.transport_retries = retries;
    }
    if let Some(timeout) = args.request_timeout {
        poller.request_timeout = timeout;
    }

    config.validate()?;
    Ok(config)
}

pub async fn execute(
    args: StatusArgs,
    config: ClientConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    info!(
        job_id = %args.job_id,
        base_url = %config.base_url,
        timeout_secs = args.timeout.as_secs_f64(),
        attempts = args.attempts,
        "Starting status poll"
    );

    term::warn_if_no_api_key(config.api_key.as_deref());

    let client = TranslationClient::new(config)?;

    let spinner = term::spinner(format!("Waiting for job {}...", term::bold(&args.job_id)));
    let outcome =
        poll_with_attempts(&client, &args.job_id, args.timeout, args.attempts, cancel).await;
    spinner.finish_and_clear();

    let status = outcome?;

    term::success(format!("Job {} completed", args.job_id));
    term::output(format!("{:#}", Value::Object(status.into_body())));

    Ok(())
}

/// Polls `job_id` up to `attempts` times, starting over only when the job
/// reports failure. Each attempt gets the full `timeout`.
pub async fn poll_with_attempts<A: StatusApi>(
    client: &TranslationClient<A>,
    job_id: &str,
    timeout: Duration,
    attempts: u32,
    cancel: &CancellationToken,
) -> Result<StatusResponse> {
    let mut attempt = 1;
    loop {
        match client
            .get_translation_status_with_cancel(job_id, timeout, cancel)
            .await
        {
            Err(e @ Error::TranslationFailed { .. }) if attempt < attempts => {
                warn!(job_id, attempt, attempts, error = %e, "Job failed, retrying");
                term::warning(format!("Attempt {attempt}/{attempts} failed: {e}"));
                attempt += 1;
            }
            outcome => return outcome,
        }
    }
}
