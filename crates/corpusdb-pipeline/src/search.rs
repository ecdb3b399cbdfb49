//! Search pipeline.
//!
//! Validation failures are decided before any external call is made; a bad
//! query never reaches the embedding provider.

use crate::stage_of;
use corpusdb_core::traits::IntegrationAdapter;
use corpusdb_core::types::{Metadata, PipelineResult, PipelineStage, SearchResult};
use corpusdb_hybrid::HybridStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// What one search run produced. `summary.success` is the only failure
/// signal; `results` is empty whenever it is false.
#[derive(Debug)]
pub struct SearchOutcome {
    pub summary: PipelineResult,
    pub results: Vec<SearchResult>,
}

pub struct SearchPipeline {
    store: Arc<Mutex<HybridStore>>,
    integrations: Vec<Arc<dyn IntegrationAdapter>>,
}

impl SearchPipeline {
    pub fn new(store: Arc<Mutex<HybridStore>>) -> Self {
        Self {
            store,
            integrations: Vec::new(),
        }
    }

    /// Attach a result enhancer applied during the enhancement stage.
    #[must_use]
    pub fn with_integration(mut self, adapter: Arc<dyn IntegrationAdapter>) -> Self {
        self.integrations.push(adapter);
        self
    }

    pub async fn execute(
        &self,
        query: &str,
        k: usize,
        filters: Option<&Metadata>,
        enable_reranking: bool,
    ) -> SearchOutcome {
        let started = Instant::now();
        let mut errors = Vec::new();

        // VALIDATION: reject before touching the store or the network.
        if query.trim().is_empty() {
            errors.push("empty query".to_string());
        }
        if k == 0 {
            errors.push("k must be positive".to_string());
        }
        if !errors.is_empty() {
            return SearchOutcome {
                summary: PipelineResult {
                    success: false,
                    stage: PipelineStage::Validation,
                    processed_items: 0,
                    failed_items: 1,
                    duration_seconds: started.elapsed().as_secs_f64(),
                    errors,
                    metadata: Metadata::new(),
                },
                results: Vec::new(),
            };
        }

        // PROCESSING: embed the query and run the fused search.
        let searched = self
            .store
            .lock()
            .await
            .hybrid_search(query, k, filters, enable_reranking)
            .await;
        let mut results = match searched {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(query, error = %e, "search failed");
                errors.push(e.to_string());
                return SearchOutcome {
                    summary: PipelineResult {
                        success: false,
                        stage: stage_of(&e),
                        processed_items: 0,
                        failed_items: 1,
                        duration_seconds: started.elapsed().as_secs_f64(),
                        errors,
                        metadata: Metadata::new(),
                    },
                    results: Vec::new(),
                };
            }
        };

        // ENHANCEMENT: best-effort; a failing enhancer leaves the results
        // it was handed untouched.
        for adapter in &self.integrations {
            match adapter.enhance_search_results(results.clone(), query).await {
                Ok(enhanced) => results = enhanced,
                Err(e) => {
                    tracing::warn!(adapter = adapter.name(), error = %e, "enhancement failed");
                    errors.push(format!("enhancement {}: {e}", adapter.name()));
                }
            }
        }

        let mut metadata = Metadata::new();
        metadata.insert("query".to_string(), serde_json::json!(query));
        metadata.insert("k".to_string(), serde_json::json!(k));

        SearchOutcome {
            summary: PipelineResult {
                success: true,
                stage: PipelineStage::Completion,
                processed_items: results.len(),
                failed_items: 0,
                duration_seconds: started.elapsed().as_secs_f64(),
                errors,
                metadata,
            },
            results,
        }
    }
}
