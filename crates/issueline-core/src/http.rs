//! HTTP transport behind a sync interface.
//!
//! Uses async reqwest internally on a shared tokio runtime, but presents a
//! blocking `get` so the pipeline can stay sequential per project and run
//! projects on plain worker threads.

use std::sync::LazyLock;
use std::time::Duration;

use crate::error::{FetchError, TransportError};

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for the production transport
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout (connect + headers + body)
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("issueline/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Response as seen by the retry loop: status, rate-limit hint and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Retry-After` header, unparsed
    pub retry_after: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One GET request. Implementations must not retry on their own.
pub trait Transport: Send + Sync {
    /// Any HTTP status is `Ok`; only a missing response is an error.
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, TransportFailure>;
}

/// Why a request produced no response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// Retryable network condition
    Network(TransportError),
    /// Permanent: the request itself is invalid
    Invalid(FetchError),
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Transport over a pooled reqwest client.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, TransportFailure> {
        SHARED_RUNTIME.handle().block_on(async {
            let response = self
                .client
                .get(url)
                .query(query)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(classify)?;

            let status = response.status().as_u16();
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.map_err(classify)?;

            Ok(HttpResponse {
                status,
                retry_after,
                body,
            })
        })
    }
}

fn classify(e: reqwest::Error) -> TransportFailure {
    if e.is_builder() {
        TransportFailure::Invalid(FetchError::Request(e.without_url().to_string()))
    } else {
        TransportFailure::Network(TransportError::from_reqwest(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            retry_after: None,
            body: String::new(),
        }
    }

    #[test]
    fn success_range() {
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(301).is_success());
        assert!(!response(429).is_success());
        assert!(!response(500).is_success());
    }

    #[test]
    fn default_user_agent_has_version() {
        let config = HttpConfig::default();
        assert!(config.user_agent.starts_with("issueline/"));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn client_builds_from_default_config() {
        assert!(ReqwestTransport::new(&HttpConfig::default()).is_ok());
    }
}
