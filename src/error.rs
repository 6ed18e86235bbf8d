use indexmap::IndexMap;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

/// Exit codes following sysexits.h conventions where applicable.
/// See: https://man.freebsd.org/cgi/man.cgi?query=sysexits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    /// General error (job reported failure)
    pub const FAILURE: Self = Self(1);
    /// Data format error (undecodable response body)
    pub const DATA: Self = Self(65);
    /// Job identifier unknown or malformed
    pub const NO_INPUT: Self = Self(66);
    /// Network/service unavailable
    pub const UNAVAILABLE: Self = Self(69);
    /// I/O error (listener bind, file read)
    pub const IO: Self = Self(74);
    /// Temporary failure (timed out, try again later)
    pub const TEMP_FAIL: Self = Self(75);
    /// Configuration error (invalid config file, validation failed)
    pub const CONFIG: Self = Self(78);
    /// Interrupted by the user (128 + SIGINT)
    pub const INTERRUPTED: Self = Self(130);
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.0 as u8)
    }
}

/// Coarse classification of an [`Error`], for callers that dispatch on the
/// failure mode rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidJobId,
    Timeout,
    Api,
    TranslationFailed,
    Configuration,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidJobId => "invalid_job_id",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Api => "api_error",
            ErrorKind::TranslationFailed => "translation_failed",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid job ID '{job_id}': {reason}")]
    InvalidJobId { job_id: String, reason: String },

    #[error(
        "Timed out waiting for job '{job_id}' after {:.2}s (timeout {:.2}s)",
        .elapsed.as_secs_f64(),
        .timeout.as_secs_f64()
    )]
    Timeout {
        job_id: String,
        timeout: Duration,
        elapsed: Duration,
    },

    #[error("API error (status {status_code}): {message}")]
    Api {
        status_code: u16,
        message: String,
        response_body: String,
    },

    #[error("Translation job '{job_id}' failed")]
    TranslationFailed { job_id: String },

    #[error("Invalid configuration for '{field}': {reason}")]
    Config { field: String, reason: String },

    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Polling of job '{job_id}' was cancelled after {:.2}s", .elapsed.as_secs_f64())]
    Cancelled { job_id: String, elapsed: Duration },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Mock server failed on '{addr}': {source}")]
    Server {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidJobId { .. } => ErrorKind::InvalidJobId,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Api { .. } => ErrorKind::Api,
            Error::TranslationFailed { .. } => ErrorKind::TranslationFailed,
            Error::Config { .. }
            | Error::ConfigRead { .. }
            | Error::ConfigParse { .. }
            | Error::HttpClient(_)
            | Error::Server { .. } => ErrorKind::Configuration,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Structured, machine-checkable fields describing this error.
    ///
    /// The first entry is always `kind`; the remaining keys depend on the kind
    /// (for example `status_code` and `response_body` for API errors).
    pub fn details(&self) -> IndexMap<&'static str, Value> {
        let mut details = IndexMap::new();
        details.insert("kind", json!(self.kind().as_str()));

        match self {
            Error::InvalidJobId { job_id, reason } => {
                details.insert("job_id", json!(job_id));
                details.insert("reason", json!(reason));
            }
            Error::Timeout {
                job_id,
                timeout,
                elapsed,
            } => {
                details.insert("job_id", json!(job_id));
                details.insert("timeout_seconds", json!(timeout.as_secs_f64()));
                details.insert("elapsed_seconds", json!(elapsed.as_secs_f64()));
            }
            Error::Api {
                status_code,
                response_body,
                ..
            } => {
                details.insert("status_code", json!(status_code));
                details.insert("response_body", json!(response_body));
            }
            Error::TranslationFailed { job_id } => {
                details.insert("job_id", json!(job_id));
            }
            Error::Config { field, reason } => {
                details.insert("field", json!(field));
                details.insert("reason", json!(reason));
            }
            Error::ConfigRead { path, source } => {
                details.insert("path", json!(path));
                details.insert("reason", json!(source.to_string()));
            }
            Error::ConfigParse { path, source } => {
                details.insert("path", json!(path));
                details.insert("reason", json!(source.to_string()));
            }
            Error::Cancelled { job_id, elapsed } => {
                details.insert("job_id", json!(job_id));
                details.insert("elapsed_seconds", json!(elapsed.as_secs_f64()));
            }
            Error::HttpClient(source) => {
                details.insert("reason", json!(source.to_string()));
            }
            Error::Server { addr, source } => {
                details.insert("addr", json!(addr));
                details.insert("reason", json!(source.to_string()));
            }
        }

        details
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Error::InvalidJobId { .. } => ExitCode::NO_INPUT,
            Error::Timeout { .. } => ExitCode::TEMP_FAIL,
            Error::Api { status_code, .. } if *status_code == 200 => ExitCode::DATA,
            Error::Api { .. } => ExitCode::UNAVAILABLE,
            Error::TranslationFailed { .. } => ExitCode::FAILURE,
            Error::Config { .. } | Error::ConfigParse { .. } | Error::HttpClient(_) => {
                ExitCode::CONFIG
            }
            Error::ConfigRead { .. } | Error::Server { .. } => ExitCode::IO,
            Error::Cancelled { .. } => ExitCode::INTERRUPTED,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
