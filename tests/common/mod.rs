#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use translation_poller::client::TranslationClient;
use translation_poller::config::{ClientConfig, PollerConfig};
use translation_poller::infra::HttpStatusApi;
use translation_poller::poller::{FixedJitter, IntervalScheduler, StatusPoller};

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Poller settings that keep real-time tests short.
pub fn fast_poller() -> PollerConfig {
    PollerConfig {
        initial_interval: Duration::from_millis(50),
        max_interval: Duration::from_millis(200),
        backoff_factor: 2.0,
        transport_retries: 0,
        request_timeout: Duration::from_secs(5),
    }
}

/// Client with the default poller settings and random jitter.
pub fn default_client(base_url: &str) -> TranslationClient {
    TranslationClient::new(ClientConfig::new(base_url)).expect("Failed to build client")
}

/// Client with [`fast_poller`] settings and no jitter.
pub fn fast_client(base_url: &str) -> TranslationClient {
    let config = ClientConfig::new(base_url).with_poller(fast_poller());
    let api = Arc::new(HttpStatusApi::new(&config).expect("Failed to build transport"));
    let poller = StatusPoller::new(api, config.poller)
        .expect("Failed to build poller")
        .with_scheduler(IntervalScheduler::new(FixedJitter(0.0)));
    TranslationClient::with_poller(poller)
}

/// Base URL of a localhost port that nothing listens on.
pub fn unused_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read addr");
    drop(listener);
    format!("http://{addr}")
}

/// Temporary directory holding an optional `tpoll.toml`.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("tpoll.toml");

        Self {
            temp_dir,
            config_path,
        }
    }

    pub fn write_config(&self, content: &str) {
        std::fs::write(&self.config_path, content).expect("Failed to write config");
    }
}
