//! HTTP transport seam.
//!
//! The client talks to the wire through this trait so tests can script
//! responses without a network. The production implementation is a pooled
//! reqwest client.

use corpusdb_core::error::{Error, Result};
use std::time::Duration;

/// What the client needs from an HTTP response: status, the parsed
/// `Retry-After` header (seconds) and the raw body.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub retry_after_secs: Option<u64>,
    pub body: String,
}

#[async_trait::async_trait]
pub trait EmbedTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<WireResponse>;
}

/// Pooled reqwest transport. One client per process; reqwest handles
/// connection reuse internally.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl EmbedTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<WireResponse> {
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("POST {url}: {e}"))
                } else {
                    Error::Network(format!("POST {url}: {e}"))
                }
            })?;

        let status = response.status().as_u16();
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("reading response body: {e}")))?;

        Ok(WireResponse {
            status,
            retry_after_secs,
            body,
        })
    }
}
