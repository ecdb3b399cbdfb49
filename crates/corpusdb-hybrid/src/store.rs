//! The hybrid store orchestrator.
//!
//! One instance owns a document store, a dense index and a lexical index
//! and keeps them in step. Mutations assume a single writer; reads may run
//! concurrently with each other but not with a mutation in flight.

use crate::fusion;
use corpusdb_core::config::{EngineConfig, FusionStrategy};
use corpusdb_core::error::{Error, Result};
use corpusdb_core::store::DocumentStore;
use corpusdb_core::traits::EmbeddingBackend;
use corpusdb_core::types::{Document, Metadata, SearchHit, SearchResult};
use corpusdb_dense::DenseIndex;
use corpusdb_lexical::LexicalIndex;
use std::sync::Arc;

pub struct HybridStore {
    config: Arc<EngineConfig>,
    embedder: Arc<dyn EmbeddingBackend>,
    pub(crate) documents: DocumentStore,
    pub(crate) dense: DenseIndex,
    lexical: LexicalIndex,
}

impl HybridStore {
    pub fn new(config: Arc<EngineConfig>, embedder: Arc<dyn EmbeddingBackend>) -> Result<Self> {
        config.validate()?;
        if embedder.dim() != config.embedding_dimension {
            return Err(Error::InvalidConfig(format!(
                "embedder dimension {} does not match configured {}",
                embedder.dim(),
                config.embedding_dimension
            )));
        }
        let dense = DenseIndex::new(config.embedding_dimension, config.hnsw.clone());
        let lexical = LexicalIndex::new()?;
        Ok(Self {
            config,
            embedder,
            documents: DocumentStore::new(),
            dense,
            lexical,
        })
    }

    pub(crate) fn from_parts(
        config: Arc<EngineConfig>,
        embedder: Arc<dyn EmbeddingBackend>,
        documents: DocumentStore,
        dense: DenseIndex,
        lexical: LexicalIndex,
    ) -> Self {
        Self {
            config,
            embedder,
            documents,
            dense,
            lexical,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingBackend> {
        &self.embedder
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn document_count(&self) -> usize {
        self.documents.stats().document_count
    }

    /// The stored embedding for a live document, if any.
    pub fn embedding(&self, id: &str) -> Option<&[f32]> {
        self.dense.vector(id)
    }

    /// Embed and insert a batch. Embedding happens first for the whole
    /// batch: if it fails, none of the three stores is touched, so the
    /// batch is atomic from the caller's perspective.
    pub async fn add_documents(&mut self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        for d in documents {
            if d.id.is_empty() {
                return Err(Error::Validation("document with empty id".to_string()));
            }
        }
        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = self.embedder.embed_texts(&texts).await?;
        if vectors.len() != documents.len() {
            return Err(Error::MalformedResponse(format!(
                "embedder returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }
        let ids: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();

        self.dense.add(&vectors, &ids)?;
        self.lexical.add(documents)?;
        self.documents.add(documents);
        tracing::debug!(count = documents.len(), "batch indexed");
        Ok(())
    }

    fn candidate_pool(&self, k: usize) -> usize {
        k.saturating_mul(self.config.search_k_multiplier).max(k)
    }

    /// Hydrate raw hits against the document store and apply metadata
    /// post-filters. Filtering happens before truncation to k; narrow
    /// filters therefore eat into the candidate pool, which is why the
    /// pool is larger than k to begin with.
    fn hydrate(
        &self,
        hits: Vec<SearchHit>,
        filters: Option<&Metadata>,
        k: usize,
    ) -> Vec<SearchResult> {
        hits.into_iter()
            .filter_map(|hit| {
                let doc = self.documents.get(&hit.id)?;
                if let Some(filters) = filters {
                    let matches_all = filters
                        .iter()
                        .all(|(key, expected)| doc.metadata.get(key) == Some(expected));
                    if !matches_all {
                        return None;
                    }
                }
                Some(SearchResult {
                    doc_id: hit.id,
                    score: hit.score,
                    content: doc.content.clone(),
                    metadata: doc.metadata.clone(),
                })
            })
            .take(k)
            .collect()
    }

    pub fn vector_search(
        &self,
        query_vector: &[f32],
        k: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>> {
        let hits = self.dense.search(query_vector, self.candidate_pool(k))?;
        Ok(self.hydrate(hits, filters, k))
    }

    pub fn lexical_search(
        &self,
        query_text: &str,
        k: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>> {
        let hits = self.lexical.search(query_text, self.candidate_pool(k))?;
        Ok(self.hydrate(hits, filters, k))
    }

    /// Embed the query, run both sub-searches over an enlarged candidate
    /// pool, fuse, filter, truncate to k, and optionally rerank the final
    /// candidates remotely. Reranking reorders the set without dropping or
    /// adding members.
    pub async fn hybrid_search(
        &self,
        query_text: &str,
        k: usize,
        filters: Option<&Metadata>,
        enable_reranking: bool,
    ) -> Result<Vec<SearchResult>> {
        if query_text.trim().is_empty() {
            return Err(Error::Validation("empty query".to_string()));
        }
        if k == 0 {
            return Err(Error::Validation("k must be positive".to_string()));
        }

        let query_vector = self
            .embedder
            .embed_texts(std::slice::from_ref(&query_text.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::MalformedResponse("no query embedding".to_string()))?;

        let pool = self.candidate_pool(k);
        let lexical_hits = self.lexical.search(query_text, pool)?;
        let dense_hits = self.dense.search(&query_vector, pool)?;

        let fused = match self.config.fusion {
            FusionStrategy::WeightedSum => fusion::weighted_sum(
                &lexical_hits,
                &dense_hits,
                self.config.bm25_weight,
                self.config.vector_weight,
            ),
            FusionStrategy::ReciprocalRank => {
                fusion::reciprocal_rank(&lexical_hits, &dense_hits, self.config.rrf_k)
            }
        };

        let mut results = self.hydrate(fused, filters, k);
        if enable_reranking && results.len() > 1 {
            results = self.rerank(query_text, results).await?;
        }
        Ok(results)
    }

    async fn rerank(&self, query: &str, candidates: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        let texts: Vec<String> = candidates.iter().map(|r| r.content.clone()).collect();
        let reranked = self.embedder.rerank_documents(query, &texts).await?;
        if reranked.len() != candidates.len() {
            return Err(Error::MalformedResponse(
                "reranker changed the candidate set".to_string(),
            ));
        }
        Ok(reranked
            .into_iter()
            .map(|hit| {
                let mut result = candidates[hit.index].clone();
                result.score = hit.score;
                result
            })
            .collect())
    }

    /// Re-embed and replace one document across all three stores. The id
    /// must already be live.
    pub async fn update_document(&mut self, id: &str, document: Document) -> Result<()> {
        if document.id != id {
            return Err(Error::Validation(format!(
                "update id {id} does not match document id {}",
                document.id
            )));
        }
        if !self.documents.contains(id) {
            return Err(Error::NotFound(format!("no live document {id}")));
        }
        let vector = self
            .embedder
            .embed_texts(std::slice::from_ref(&document.content))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::MalformedResponse("no embedding returned".to_string()))?;

        self.dense.update(id, &vector)?;
        self.lexical.update(id, &document)?;
        self.documents.update(id, document);
        Ok(())
    }

    /// Soft-delete across all three stores. Idempotent; returns whether a
    /// live document existed.
    pub fn delete_document(&mut self, id: &str) -> Result<bool> {
        let existed = self.documents.delete(id);
        self.dense.delete(id);
        self.lexical.delete(id)?;
        Ok(existed)
    }
}
