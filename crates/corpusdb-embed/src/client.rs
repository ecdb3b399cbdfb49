//! Remote embedding/rerank client.
//!
//! Requests are auto-batched (`batch_size` texts per call), issued with at
//! most `max_concurrent_requests` in flight, and results are re-associated
//! by positional index so callers always get one vector per input text in
//! input order, whatever order batches or items come back in.
//!
//! HTTP 429 is retried exactly once after sleeping for the `Retry-After`
//! header; all other failures surface immediately as typed errors.

use crate::pii;
use crate::transport::{EmbedTransport, ReqwestTransport, WireResponse};
use corpusdb_core::config::EngineConfig;
use corpusdb_core::error::{Error, Result};
use corpusdb_core::traits::{EmbeddingBackend, RerankHit};
use corpusdb_core::usage::UsageTracker;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct RerankItem {
    relevance_score: f32,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: Vec<T>,
    #[allow(dead_code)]
    model: Option<String>,
    usage: Option<Usage>,
}

pub struct RemoteEmbedder {
    config: Arc<EngineConfig>,
    transport: Arc<dyn EmbedTransport>,
    usage: Arc<UsageTracker>,
    semaphore: Arc<Semaphore>,
    embed_url: String,
    rerank_url: String,
    api_key: String,
}

impl RemoteEmbedder {
    pub fn new(
        config: Arc<EngineConfig>,
        base_url: &str,
        api_key: &str,
        usage: Arc<UsageTracker>,
    ) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Ok(Self::with_transport(config, base_url, api_key, usage, transport))
    }

    /// Construct with an explicit transport; the seam the tests use to
    /// script wire behavior.
    pub fn with_transport(
        config: Arc<EngineConfig>,
        base_url: &str,
        api_key: &str,
        usage: Arc<UsageTracker>,
        transport: Arc<dyn EmbedTransport>,
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            embed_url: format!("{base}/v1/embeddings"),
            rerank_url: format!("{base}/v1/rerank"),
            api_key: api_key.to_string(),
            config,
            transport,
            usage,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    /// One POST with a single retry on 429 honoring `Retry-After`.
    async fn post_with_rate_limit_retry(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<WireResponse> {
        let response = self
            .transport
            .post_json(url, &self.api_key, body, self.timeout())
            .await?;
        if response.status != 429 {
            return Ok(response);
        }

        let wait = response.retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        tracing::warn!(url, wait, "rate limited, retrying once");
        tokio::time::sleep(Duration::from_secs(wait)).await;

        let retried = self
            .transport
            .post_json(url, &self.api_key, body, self.timeout())
            .await?;
        if retried.status == 429 {
            return Err(Error::RateLimited {
                retry_after_secs: retried.retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            });
        }
        Ok(retried)
    }

    fn parse<T: for<'de> Deserialize<'de>>(&self, response: &WireResponse) -> Result<ApiResponse<T>> {
        if !(200..300).contains(&response.status) {
            return Err(Error::Api {
                status: response.status,
                message: response.body.clone(),
            });
        }
        let parsed: ApiResponse<T> = serde_json::from_str(&response.body)
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;
        if let Some(usage) = &parsed.usage {
            self.usage.record_tokens(usage.total_tokens);
        }
        Ok(parsed)
    }

    /// Embed one batch; the response's `index` fields restore input order.
    async fn embed_one_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "input": batch,
            "model": self.config.embed_model,
            "encoding_format": "float",
            "output_dimension": self.config.embedding_dimension,
        });
        let response = self.post_with_rate_limit_retry(&self.embed_url, &body).await?;
        let parsed: ApiResponse<EmbeddingItem> = self.parse(&response)?;

        if parsed.data.len() != batch.len() {
            return Err(Error::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                parsed.data.len()
            )));
        }
        let mut ordered: Vec<Option<Vec<f32>>> = vec![None; batch.len()];
        for item in parsed.data {
            if item.embedding.len() != self.config.embedding_dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.config.embedding_dimension,
                    actual: item.embedding.len(),
                });
            }
            let slot = ordered.get_mut(item.index).ok_or_else(|| {
                Error::MalformedResponse(format!("embedding index {} out of range", item.index))
            })?;
            *slot = Some(item.embedding);
        }
        ordered
            .into_iter()
            .map(|v| v.ok_or_else(|| Error::MalformedResponse("missing embedding index".into())))
            .collect()
    }
}

#[async_trait::async_trait]
impl EmbeddingBackend for RemoteEmbedder {
    fn dim(&self) -> usize {
        self.config.embedding_dimension
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let prepared: Vec<String> = if self.config.enable_pii_detection {
            texts.iter().map(|t| pii::redact(t)).collect()
        } else {
            texts.to_vec()
        };

        // Fan the batches out behind the concurrency gate, then gather in
        // order: try_join_all preserves input positions regardless of
        // completion order.
        let futures = prepared
            .chunks(self.config.batch_size)
            .map(|batch| {
                let semaphore = Arc::clone(&self.semaphore);
                async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| Error::Network("concurrency gate closed".to_string()))?;
                    self.embed_one_batch(batch).await
                }
            })
            .collect::<Vec<_>>();

        let batches = futures::future::try_join_all(futures).await?;
        Ok(batches.into_iter().flatten().collect())
    }

    async fn rerank_documents(&self, query: &str, documents: &[String]) -> Result<Vec<RerankHit>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let query = if self.config.enable_pii_detection {
            pii::redact(query)
        } else {
            query.to_string()
        };
        let body = serde_json::json!({
            "query": query,
            "documents": documents,
            "model": self.config.rerank_model,
            "top_k": documents.len(),
        });
        let response = self.post_with_rate_limit_retry(&self.rerank_url, &body).await?;
        let parsed: ApiResponse<RerankItem> = self.parse(&response)?;

        // The contract is a reorder of the input set: every document comes
        // back exactly once. Unscored documents (a provider returning fewer
        // than top_k) sink to the bottom with score 0.
        let mut scores = vec![0.0f32; documents.len()];
        for item in &parsed.data {
            if item.index >= documents.len() {
                return Err(Error::MalformedResponse(format!(
                    "rerank index {} out of range",
                    item.index
                )));
            }
            scores[item.index] = item.relevance_score;
        }
        if parsed.data.len() < documents.len() {
            tracing::warn!(
                scored = parsed.data.len(),
                total = documents.len(),
                "reranker scored fewer documents than requested"
            );
        }

        let mut hits: Vec<RerankHit> = documents
            .iter()
            .enumerate()
            .map(|(index, text)| RerankHit {
                index,
                text: text.clone(),
                score: scores[index],
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        Ok(hits)
    }

    async fn validate_connection(&self) -> bool {
        match self.embed_texts(&["ping".to_string()]).await {
            Ok(vectors) => vectors.len() == 1,
            Err(e) => {
                tracing::warn!(error = %e, "connection validation failed");
                false
            }
        }
    }
}
