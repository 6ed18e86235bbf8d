use super::validation;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "tpoll.toml";
/// Polling target used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Header carrying the API key on every status request.
pub const API_KEY_HEADER: &str = "x-api-key";

const DEFAULT_INITIAL_INTERVAL_SECS: u64 = 1;
const DEFAULT_MAX_INTERVAL_SECS: u64 = 30;
const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Tuning of the polling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    /// Interval the backoff starts from.
    pub initial_interval: Duration,
    /// Ceiling for any single wait between polls.
    pub max_interval: Duration,
    /// Growth applied to the interval after every non-terminal poll.
    pub backoff_factor: f64,
    /// Consecutive transport failures tolerated before giving up.
    /// `0` surfaces the first failure immediately.
    pub transport_retries: u32,
    /// Upper bound for a single status request.
    pub request_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(DEFAULT_INITIAL_INTERVAL_SECS),
            max_interval: Duration::from_secs(DEFAULT_MAX_INTERVAL_SECS),
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            transport_retries: 0,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl PollerConfig {
    pub fn validate(&self) -> Result<()> {
        validation::validate_positive("initial_interval", self.initial_interval)?;
        validation::validate_interval_bounds(self.initial_interval, self.max_interval)?;
        validation::validate_backoff_factor(self.backoff_factor)?;
        validation::validate_positive("request_timeout", self.request_timeout)?;
        Ok(())
    }
}

/// Everything needed to build a client against one status endpoint.
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    /// Root URL; requests go to `{base_url}/status/{job_id}`.
    pub base_url: String,
    /// Opaque credential sent in the [`API_KEY_HEADER`] header.
    pub api_key: Option<String>,
    pub poller: PollerConfig,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            poller: PollerConfig::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_poller(mut self, poller: PollerConfig) -> Self {
        self.poller = poller;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validation::validate_base_url(&self.base_url)?;

        if let Some(key) = &self.api_key {
            if key.is_empty() {
                return Err(Error::config("api_key", "API key is empty"));
            }
        }

        self.poller.validate()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("poller", &self.poller)
            .finish()
    }
}

/// On-disk configuration (`tpoll.toml`). Every field is optional and only
/// overrides the built-in defaults.
///
/// ```toml
/// [server]
/// base_url = "https://api.example.com"
/// api_key = "..."
///
/// [polling]
/// initial_interval = 1.0
/// max_interval = 30.0
/// backoff_factor = 2.0
/// ```
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub polling: PollingSection,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// Intervals and timeouts are given in (fractional) seconds.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PollingSection {
    pub initial_interval: Option<f64>,
    pub max_interval: Option<f64>,
    pub backoff_factor: Option<f64>,
    pub transport_retries: Option<u32>,
    pub request_timeout: Option<f64>,
}

impl ConfigFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path_str.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path_str,
            source: e,
        })
    }

    /// Loads the file if it exists. A missing file is only an error when the
    /// caller asked for it explicitly.
    pub fn load_optional<P: AsRef<Path>>(path: P, explicit: bool) -> Result<Self> {
        let path = path.as_ref();
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Applies the file's values on top of `config`.
    pub fn apply_to(&self, config: &mut ClientConfig) -> Result<()> {
        if let Some(base_url) = &self.server.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(api_key) = &self.server.api_key {
            config.api_key = Some(api_key.clone());
        }

        let polling = &self.polling;
        if let Some(secs) = polling.initial_interval {
            config.poller.initial_interval = validation::seconds("initial_interval", secs)?;
        }
        if let Some(secs) = polling.max_interval {
            config.poller.max_interval = validation::seconds("max_interval", secs)?;
        }
        if let Some(factor) = polling.backoff_factor {
            config.poller.backoff_factor = factor;
        }
        if let Some(retries) = polling.transport_retries {
            config.poller.transport_retries = retries;
        }
        if let Some(secs) = polling.request_timeout {
            config.poller.request_timeout = validation::seconds("request_timeout", secs)?;
        }

        Ok(())
    }
}
