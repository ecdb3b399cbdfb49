//! Sync pipeline: push the store's live documents and their stored
//! embeddings into every configured integration adapter.

use corpusdb_core::traits::IntegrationAdapter;
use corpusdb_core::types::{Metadata, PipelineResult, PipelineStage};
use corpusdb_hybrid::HybridStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

pub struct SyncPipeline {
    store: Arc<Mutex<HybridStore>>,
    integrations: Vec<Arc<dyn IntegrationAdapter>>,
}

impl SyncPipeline {
    pub fn new(
        store: Arc<Mutex<HybridStore>>,
        integrations: Vec<Arc<dyn IntegrationAdapter>>,
    ) -> Self {
        Self {
            store,
            integrations,
        }
    }

    /// One adapter failing does not stop the push to the others; the run
    /// succeeds only if every adapter accepted the batch.
    pub async fn execute(&self) -> PipelineResult {
        let started = Instant::now();
        let mut errors = Vec::new();
        let mut metadata = Metadata::new();

        let (documents, embeddings) = {
            let store = self.store.lock().await;
            let documents: Vec<_> = store.documents().live_documents().cloned().collect();
            let embeddings: Vec<Vec<f32>> = documents
                .iter()
                .map(|d| store.embedding(&d.id).map(<[f32]>::to_vec).unwrap_or_default())
                .collect();
            (documents, embeddings)
        };
        metadata.insert("document_count".to_string(), serde_json::json!(documents.len()));

        let mut synced = 0;
        let mut failed = 0;
        for adapter in &self.integrations {
            match adapter.store_embeddings(&documents, &embeddings).await {
                Ok(()) => synced += 1,
                Err(e) => {
                    tracing::warn!(adapter = adapter.name(), error = %e, "sync push failed");
                    errors.push(format!("sync {}: {e}", adapter.name()));
                    failed += 1;
                }
            }
        }

        let success = failed == 0;
        PipelineResult {
            success,
            stage: if success {
                PipelineStage::Completion
            } else {
                PipelineStage::Storage
            },
            processed_items: synced,
            failed_items: failed,
            duration_seconds: started.elapsed().as_secs_f64(),
            errors,
            metadata,
        }
    }
}
