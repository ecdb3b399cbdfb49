//! Document ingestion pipeline.
//!
//! Validation is best-effort: documents missing an id or content are
//! counted as failed and the valid remainder proceeds. A provider outage
//! during embedding fails the run at the processing stage; batches already
//! stored by earlier runs stay stored (at-least-once, no rollback).

use crate::stage_of;
use corpusdb_consensus::ConsensusValidator;
use corpusdb_core::traits::IntegrationAdapter;
use corpusdb_core::types::{Document, Metadata, PipelineResult, PipelineStage};
use corpusdb_hybrid::HybridStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

pub struct DocumentPipeline {
    store: Arc<Mutex<HybridStore>>,
    validator: Option<Arc<ConsensusValidator>>,
    integrations: Vec<Arc<dyn IntegrationAdapter>>,
}

impl DocumentPipeline {
    pub fn new(store: Arc<Mutex<HybridStore>>) -> Self {
        Self {
            store,
            validator: None,
            integrations: Vec::new(),
        }
    }

    /// Attach a consensus validator; each stored document gets a quality
    /// pass during the enhancement stage.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<ConsensusValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn with_integration(mut self, adapter: Arc<dyn IntegrationAdapter>) -> Self {
        self.integrations.push(adapter);
        self
    }

    pub async fn execute(&self, documents: Vec<Document>) -> PipelineResult {
        let started = Instant::now();
        let mut errors = Vec::new();
        let mut metadata = Metadata::new();

        // VALIDATION: partition instead of aborting.
        let mut valid = Vec::new();
        let mut failed_items = 0;
        for (position, document) in documents.into_iter().enumerate() {
            if document.id.trim().is_empty() {
                errors.push(format!("document at position {position}: empty id"));
                failed_items += 1;
            } else if document.content.trim().is_empty() {
                errors.push(format!("document {}: empty content", document.id));
                failed_items += 1;
            } else {
                valid.push(document);
            }
        }

        if valid.is_empty() {
            let success = failed_items == 0;
            let stage = if success {
                PipelineStage::Completion
            } else {
                PipelineStage::Validation
            };
            return PipelineResult {
                success,
                stage,
                processed_items: 0,
                failed_items,
                duration_seconds: started.elapsed().as_secs_f64(),
                errors,
                metadata,
            };
        }

        // PROCESSING + STORAGE: one atomic batch against the store.
        if let Err(e) = self.store.lock().await.add_documents(&valid).await {
            tracing::error!(error = %e, count = valid.len(), "batch ingestion failed");
            errors.push(e.to_string());
            return PipelineResult {
                success: false,
                stage: stage_of(&e),
                processed_items: 0,
                failed_items: failed_items + valid.len(),
                duration_seconds: started.elapsed().as_secs_f64(),
                errors,
                metadata,
            };
        }

        // ENHANCEMENT: best-effort quality validation and integration
        // pushes. Their failures are diagnostics, never fatal.
        if let Some(validator) = &self.validator {
            let embeddings = self.stored_embeddings(&valid).await;
            let mut quality = serde_json::Map::new();
            for (document, embedding) in valid.iter().zip(&embeddings) {
                match validator
                    .validate_quality(&document.id, &document.content, Some(embedding))
                    .await
                {
                    Ok(consensus) => {
                        quality.insert(
                            document.id.clone(),
                            serde_json::json!({
                                "consensus_reached": consensus.consensus_reached,
                                "quality_score": consensus.overall_quality_score,
                            }),
                        );
                    }
                    Err(e) => {
                        tracing::warn!(doc_id = %document.id, error = %e, "quality pass failed");
                        errors.push(format!("quality pass for {}: {e}", document.id));
                    }
                }
            }
            metadata.insert("quality".to_string(), serde_json::Value::Object(quality));
        }

        if !self.integrations.is_empty() {
            let embeddings = self.stored_embeddings(&valid).await;
            for adapter in &self.integrations {
                if let Err(e) = adapter.store_embeddings(&valid, &embeddings).await {
                    tracing::warn!(adapter = adapter.name(), error = %e, "integration push failed");
                    errors.push(format!("integration {}: {e}", adapter.name()));
                }
            }
        }

        metadata.insert(
            "document_count".to_string(),
            serde_json::json!(self.store.lock().await.document_count()),
        );

        PipelineResult {
            success: true,
            stage: PipelineStage::Completion,
            processed_items: valid.len(),
            failed_items,
            duration_seconds: started.elapsed().as_secs_f64(),
            errors,
            metadata,
        }
    }

    async fn stored_embeddings(&self, documents: &[Document]) -> Vec<Vec<f32>> {
        let store = self.store.lock().await;
        documents
            .iter()
            .map(|d| store.embedding(&d.id).map(<[f32]>::to_vec).unwrap_or_default())
            .collect()
    }
}
