use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

#[cfg(test)]
use mockall::automock;

use crate::config::{API_KEY_HEADER, ClientConfig};
use crate::domain::JobId;
use crate::error::{Error, Result};

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub(crate) fn build_http_client(config: &ClientConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Some(key) = &config.api_key {
        let mut value = HeaderValue::from_str(key).map_err(|_| {
            Error::config("api_key", "contains characters not allowed in an HTTP header")
        })?;
        value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, value);
    }

    Client::builder()
        .user_agent(concat!("tpoll/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .timeout(config.poller.request_timeout)
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .build()
        .map_err(Error::HttpClient)
}

/// Reply to one status request, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatus {
    pub status_code: u16,
    pub body: String,
}

impl RawStatus {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Trait for the status endpoint, enabling dependency injection and testing.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StatusApi: Send + Sync {
    /// Issues one status request for `job_id`. `timeout` bounds the whole
    /// request, including reading the body.
    async fn fetch_status(
        &self,
        job_id: &JobId,
        timeout: Duration,
    ) -> std::result::Result<RawStatus, TransportError>;
}

/// [`StatusApi`] over HTTP: `GET {base_url}/status/{job_id}`.
///
/// Polls do not each open their own session: one reqwest connection pool is
/// shared by every poll using this value. Each request checks out its own
/// connection, so concurrent polls never share one in flight, and the
/// connection goes back to the pool when the request future completes or is
/// dropped (timeout and cancellation included). The pool itself is released
/// when the last clone of this value is dropped.
#[derive(Debug, Clone)]
pub struct HttpStatusApi {
    client: Client,
    base_url: String,
}

impl HttpStatusApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = build_http_client(config)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn status_url(&self, job_id: &JobId) -> String {
        format!("{}/status/{}", self.base_url, job_id)
    }

    #[instrument(skip(self), fields(%job_id))]
    pub async fn fetch_status(
        &self,
        job_id: &JobId,
        timeout: Duration,
    ) -> std::result::Result<RawStatus, TransportError> {
        let url = self.status_url(job_id);

        let response = self.client.get(&url).timeout(timeout).send().await?;
        let status_code = response.status().as_u16();
        let body = response.text().await?;

        debug!(url = %url, status_code, bytes = body.len(), "Status request completed");
        Ok(RawStatus { status_code, body })
    }
}

#[async_trait]
impl StatusApi for HttpStatusApi {
    async fn fetch_status(
        &self,
        job_id: &JobId,
        timeout: Duration,
    ) -> std::result::Result<RawStatus, TransportError> {
        HttpStatusApi::fetch_status(self, job_id, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        std::net::TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn api_for(base_url: &str) -> HttpStatusApi {
        HttpStatusApi::new(&ClientConfig::new(base_url)).unwrap()
    }

    fn job(id: &str) -> JobId {
        JobId::parse(id).unwrap()
    }

    mod fetch_status {
        use super::*;

        #[tokio::test]
        async fn returns_status_and_body() {
            if !can_bind_localhost() {
                return;
            }
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/status/123"))
                .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"result":"pending"}"#))
                .expect(1)
                .mount(&mock_server)
                .await;

            let api = api_for(&mock_server.uri());
            let raw = api
                .fetch_status(&job("123"), Duration::from_secs(5))
                .await
                .unwrap();

            assert_eq!(raw, RawStatus::new(200, r#"{"result":"pending"}"#));
        }

        #[tokio::test]
        async fn passes_through_error_statuses() {
            if !can_bind_localhost() {
                return;
            }
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/status/missing"))
                .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
                .mount(&mock_server)
                .await;

            let api = api_for(&mock_server.uri());
            let raw = api
                .fetch_status(&job("missing"), Duration::from_secs(5))
                .await
                .unwrap();

            assert_eq!(raw.status_code, 404);
            assert_eq!(raw.body, "not found");
        }

        #[tokio::test]
        async fn sends_api_key_header() {
            if !can_bind_localhost() {
                return;
            }
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(header("x-api-key", "secret"))
                .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"result":"pending"}"#))
                .expect(1)
                .mount(&mock_server)
                .await;

            let config = ClientConfig::new(mock_server.uri()).with_api_key("secret");
            let api = HttpStatusApi::new(&config).unwrap();

            let raw = api
                .fetch_status(&job("abc"), Duration::from_secs(5))
                .await
                .unwrap();
            assert_eq!(raw.status_code, 200);
        }

        #[tokio::test]
        async fn omits_api_key_header_when_unset() {
            if !can_bind_localhost() {
                return;
            }
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(header_exists("x-api-key"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&mock_server)
                .await;

            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&mock_server)
                .await;

            let api = api_for(&mock_server.uri());
            let raw = api
                .fetch_status(&job("abc"), Duration::from_secs(5))
                .await
                .unwrap();
            assert_eq!(raw.status_code, 200);
        }

        #[tokio::test]
        async fn times_out_slow_responses() {
            if !can_bind_localhost() {
                return;
            }
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
                .mount(&mock_server)
                .await;

            let api = api_for(&mock_server.uri());
            let err = api
                .fetch_status(&job("slow"), Duration::from_millis(100))
                .await
                .unwrap_err();

            assert!(matches!(err, TransportError::Timeout(_)), "{err:?}");
        }

        #[tokio::test]
        async fn reports_connection_failures() {
            if !can_bind_localhost() {
                return;
            }
            let port = {
                let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
                listener.local_addr().unwrap().port()
            };

            let api = api_for(&format!("http://127.0.0.1:{port}"));
            let err = api
                .fetch_status(&job("abc"), Duration::from_secs(5))
                .await
                .unwrap_err();

            assert!(matches!(err, TransportError::Connect(_)), "{err:?}");
        }
    }

    mod http_status_api_new {
        use super::*;

        #[test]
        fn builds_status_url_without_double_slash() {
            let api = api_for("http://localhost:8000/");
            assert_eq!(
                api.status_url(&job("42")),
                "http://localhost:8000/status/42"
            );
        }

        #[test]
        fn rejects_api_key_with_newline() {
            let config = ClientConfig::default().with_api_key("bad\nkey");
            let err = HttpStatusApi::new(&config).unwrap_err();
            assert!(matches!(err, Error::Config { ref field, .. } if field == "api_key"));
        }
    }
}
