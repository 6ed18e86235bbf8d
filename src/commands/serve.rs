use crate::cli::ServeArgs;
use crate::error::Result;
use crate::mock_server::{self, JobStore, MockConfig};
use crate::term;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

impl From<&ServeArgs> for MockConfig {
    fn from(args: &ServeArgs) -> Self {
        Self {
            min_duration: args.min_duration,
            max_duration: args.max_duration,
            error_rate: args.error_rate,
            seed: args.seed,
        }
    }
}

/// Runs the mock status server until `shutdown` resolves.
pub async fn execute<F>(args: ServeArgs, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let config = MockConfig::from(&args);
    config.validate()?;

    info!(
        min_duration_secs = config.min_duration.as_secs_f64(),
        max_duration_secs = config.max_duration.as_secs_f64(),
        error_rate = config.error_rate,
        seed = ?config.seed,
        "Starting mock status server"
    );

    let listener = mock_server::bind(SocketAddr::new(args.host, args.port)).await?;
    let addr = listener.local_addr().unwrap_or_else(|_| SocketAddr::new(args.host, args.port));

    term::success(format!("Mock status server listening on http://{addr}"));
    term::hint(format!("Try: tpoll status job-1 --base-url http://{addr}"));

    let store = Arc::new(JobStore::new(config));
    mock_server::serve(listener, Arc::clone(&store), shutdown).await?;

    term::info(format!("Stopped after tracking {} job(s)", store.len()));
    Ok(())
}
