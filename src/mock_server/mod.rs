//! Mock translation status server.
//!
//! Serves `GET /status/{job_id}` with simulated jobs that finish after a
//! random duration and fail at random while running. Used by the `serve`
//! command and by integration tests.

mod store;

pub use store::JobStore;

use crate::config::validation;
use crate::error::{Error, Result};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde_json::{Value, json};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

const DEFAULT_MIN_DURATION_SECS: u64 = 15;
const DEFAULT_MAX_DURATION_SECS: u64 = 30;
const DEFAULT_ERROR_RATE: f64 = 0.15;

/// Behaviour of simulated jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct MockConfig {
    /// Shortest job duration.
    pub min_duration: Duration,
    /// Longest job duration.
    pub max_duration: Duration,
    /// Probability in `[0, 1]` that a query on a running job reports `error`.
    pub error_rate: f64,
    /// Seed for reproducible runs. Random when unset.
    pub seed: Option<u64>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            min_duration: Duration::from_secs(DEFAULT_MIN_DURATION_SECS),
            max_duration: Duration::from_secs(DEFAULT_MAX_DURATION_SECS),
            error_rate: DEFAULT_ERROR_RATE,
            seed: None,
        }
    }
}

impl MockConfig {
    /// Every job takes exactly `duration` and never fails.
    pub fn fixed(duration: Duration) -> Self {
        Self {
            min_duration: duration,
            max_duration: duration,
            error_rate: 0.0,
            seed: None,
        }
    }

    pub fn with_error_rate(mut self, error_rate: f64) -> Self {
        self.error_rate = error_rate;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validation::validate_interval_bounds(self.min_duration, self.max_duration)
            .map_err(|_| Error::config("max_duration", "must be at least min_duration"))?;

        if !(0.0..=1.0).contains(&self.error_rate) {
            return Err(Error::config(
                "error_rate",
                format!("must be between 0 and 1 (got {})", self.error_rate),
            ));
        }

        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    store: Arc<JobStore>,
}

/// Builds the router around `store`.
pub fn router(store: Arc<JobStore>) -> Router {
    Router::new()
        .route("/status/{job_id}", get(get_status))
        .route("/health", get(health))
        .with_state(AppState { store })
}

async fn get_status(State(state): State<AppState>, Path(job_id): Path<String>) -> Json<Value> {
    let result = state.store.query(&job_id);
    debug!(job_id = %job_id, result = %result, "Status query");
    Json(json!({ "result": result.as_str() }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Serves on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, store: Arc<JobStore>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());

    info!(%addr, "Mock status server listening");

    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Server { addr, source: e })
}

/// Binds `addr` and returns the listener.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|e| Error::Server {
        addr: addr.to_string(),
        source: e,
    })
}

/// A server running on a background task. Stops when dropped.
#[derive(Debug)]
pub struct SpawnedServer {
    addr: SocketAddr,
    store: Arc<JobStore>,
    shutdown: CancellationToken,
    handle: JoinHandle<Result<()>>,
    _guard: DropGuard,
}

impl SpawnedServer {
    /// Starts a server for `config` on an ephemeral localhost port.
    pub async fn start(config: MockConfig) -> Result<Self> {
        config.validate()?;

        let listener = bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr().map_err(|e| Error::Server {
            addr: "127.0.0.1:0".to_string(),
            source: e,
        })?;

        let store = Arc::new(JobStore::new(config));
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let handle = tokio::spawn(serve(listener, Arc::clone(&store), async move {
            signal.cancelled().await
        }));

        Ok(Self {
            addr,
            store,
            _guard: shutdown.clone().drop_guard(),
            shutdown,
            handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Stops the server and waits for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.cancel();
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::Server {
                addr: self.addr.to_string(),
                source: std::io::Error::other(e),
            }),
        }
    }
}
