//! Provider adapters.
//!
//! Each remote assessor has its own schema; the adapter translates it to
//! `ProviderAssessment`. The generic HTTP adapter posts the content and
//! expects `{quality_score, confidence, reasoning}` back.

use corpusdb_core::error::{Error, Result};
use corpusdb_core::traits::QualityProvider;
use corpusdb_core::types::ProviderAssessment;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct WireAssessment {
    quality_score: f32,
    confidence: f32,
    #[serde(default)]
    reasoning: String,
}

pub struct HttpQualityProvider {
    name: String,
    url: String,
    api_key: String,
    cost_per_call: f64,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpQualityProvider {
    pub fn new(
        name: &str,
        url: &str,
        api_key: &str,
        cost_per_call: f64,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
            api_key: api_key.to_string(),
            cost_per_call,
            timeout,
            client,
        })
    }
}

#[async_trait::async_trait]
impl QualityProvider for HttpQualityProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn cost_per_call(&self) -> f64 {
        self.cost_per_call
    }

    async fn assess(&self, content: &str) -> Result<ProviderAssessment> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "content": content }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("POST {}: {e}", self.url))
                } else {
                    Error::Network(format!("POST {}: {e}", self.url))
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("reading response body: {e}")))?;
        if !(200..300).contains(&status) {
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let wire: WireAssessment =
            serde_json::from_str(&body).map_err(|e| Error::MalformedResponse(e.to_string()))?;
        if !(0.0..=1.0).contains(&wire.quality_score) || !(0.0..=1.0).contains(&wire.confidence) {
            return Err(Error::MalformedResponse(format!(
                "scores out of range: quality {} confidence {}",
                wire.quality_score, wire.confidence
            )));
        }
        Ok(ProviderAssessment {
            quality_score: wire.quality_score,
            confidence: wire.confidence,
            reasoning: wire.reasoning,
        })
    }
}
