use crate::error::{Error, Result};
use reqwest::Url;
use std::time::Duration;

/// Validates that a base URL can be used as a polling target.
///
/// Valid examples: "http://localhost:8000", "https://api.example.com/v2"
/// Invalid examples: "", "example.com", "ftp://example.com"
///
/// Rules:
/// - Must not be empty
/// - Must start with http:// or https://
/// - Must include a host
pub fn validate_base_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(Error::config("base_url", "URL is empty"));
    }

    let parsed = Url::parse(url)
        .map_err(|e| Error::config("base_url", format!("invalid URL '{url}': {e}")))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::config(
            "base_url",
            format!("'{url}' must start with http:// or https://"),
        ));
    }

    if parsed.host_str().is_none() {
        return Err(Error::config(
            "base_url",
            format!("'{url}' must include a host"),
        ));
    }

    Ok(())
}

/// Validates that an interval is strictly positive.
pub fn validate_positive(field: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(Error::config(field, "must be greater than zero"));
    }
    Ok(())
}

/// Validates the growth factor applied between polls.
///
/// Must be finite and strictly greater than 1, otherwise the interval never
/// grows.
pub fn validate_backoff_factor(factor: f64) -> Result<()> {
    if !factor.is_finite() {
        return Err(Error::config("backoff_factor", "must be a finite number"));
    }
    if factor <= 1.0 {
        return Err(Error::config(
            "backoff_factor",
            format!("must be greater than 1 (got {factor})"),
        ));
    }
    Ok(())
}

/// Validates that the interval ceiling is not below the starting interval.
pub fn validate_interval_bounds(initial: Duration, max: Duration) -> Result<()> {
    if max < initial {
        return Err(Error::config(
            "max_interval",
            format!(
                "must be at least initial_interval ({:.3}s), got {:.3}s",
                initial.as_secs_f64(),
                max.as_secs_f64()
            ),
        ));
    }
    Ok(())
}

/// Converts a number of seconds read from a config file or flag.
pub fn seconds(field: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        Error::config(
            field,
            format!("'{value}' is not a valid non-negative number of seconds"),
        )
    })
}
