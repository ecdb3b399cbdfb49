use crate::error::Result;
use crate::types::{Document, ProviderAssessment, SearchResult};

/// One reranked candidate. `index` is the position of `text` in the input
/// slice so callers can map scores back onto richer candidate records.
#[derive(Debug, Clone)]
pub struct RerankHit {
    pub index: usize,
    pub text: String,
    pub score: f32,
}

/// Produces fixed-dimension embeddings and relevance reranks.
///
/// Implementations must return exactly one vector per input text, in input
/// order, regardless of how requests are batched or how responses arrive.
#[async_trait::async_trait]
pub trait EmbeddingBackend: Send + Sync {
    fn dim(&self) -> usize;

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Reorders `documents` by descending relevance to `query`. The returned
    /// set is exactly the input set; nothing is dropped or added.
    async fn rerank_documents(&self, query: &str, documents: &[String]) -> Result<Vec<RerankHit>>;

    /// Minimal round-trip call to check the backend is reachable.
    async fn validate_connection(&self) -> bool;
}

/// An external quality assessor queried by the consensus validator.
#[async_trait::async_trait]
pub trait QualityProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Estimated cost in dollars of one `assess` call, charged against the
    /// daily usage tracker.
    fn cost_per_call(&self) -> f64;

    async fn assess(&self, content: &str) -> Result<ProviderAssessment>;
}

/// Pushes embeddings/results into an external knowledge system.
///
/// Adapters are pure side-effecting collaborators: their failures must
/// never abort the primary index or search operation.
#[async_trait::async_trait]
pub trait IntegrationAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn store_embeddings(
        &self,
        documents: &[Document],
        embeddings: &[Vec<f32>],
    ) -> Result<()>;

    async fn enhance_search_results(
        &self,
        results: Vec<SearchResult>,
        context: &str,
    ) -> Result<Vec<SearchResult>>;
}
