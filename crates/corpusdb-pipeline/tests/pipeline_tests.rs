use corpusdb_consensus::ConsensusValidator;
use corpusdb_core::config::EngineConfig;
use corpusdb_core::error::{Error, Result};
use corpusdb_core::traits::{EmbeddingBackend, IntegrationAdapter, QualityProvider, RerankHit};
use corpusdb_core::types::{Document, PipelineStage, ProviderAssessment, SearchResult};
use corpusdb_core::usage::UsageTracker;
use corpusdb_embed::HashingEmbedder;
use corpusdb_hybrid::HybridStore;
use corpusdb_pipeline::{DocumentPipeline, SearchPipeline, SyncPipeline};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

const DIM: usize = 256;

fn test_config() -> Arc<EngineConfig> {
    let mut cfg = EngineConfig::development();
    cfg.embedding_dimension = DIM;
    Arc::new(cfg)
}

fn shared_store() -> Arc<Mutex<HybridStore>> {
    let store =
        HybridStore::new(test_config(), Arc::new(HashingEmbedder::new(DIM))).expect("store");
    Arc::new(Mutex::new(store))
}

struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingBackend for FailingEmbedder {
    fn dim(&self) -> usize {
        DIM
    }

    async fn embed_texts(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::Network("provider offline".to_string()))
    }

    async fn rerank_documents(&self, _query: &str, _documents: &[String]) -> Result<Vec<RerankHit>> {
        Err(Error::Network("provider offline".to_string()))
    }

    async fn validate_connection(&self) -> bool {
        false
    }
}

/// Records every push; optionally fails on demand.
struct MemoryAdapter {
    name: String,
    fail: bool,
    pushes: StdMutex<Vec<(Vec<Document>, Vec<Vec<f32>>)>>,
}

impl MemoryAdapter {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: false,
            pushes: StdMutex::new(Vec::new()),
        })
    }

    fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: true,
            pushes: StdMutex::new(Vec::new()),
        })
    }

    fn push_count(&self) -> usize {
        self.pushes.lock().expect("lock").len()
    }
}

#[async_trait::async_trait]
impl IntegrationAdapter for MemoryAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn store_embeddings(
        &self,
        documents: &[Document],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        if self.fail {
            return Err(Error::Network("graph unreachable".to_string()));
        }
        self.pushes
            .lock()
            .expect("lock")
            .push((documents.to_vec(), embeddings.to_vec()));
        Ok(())
    }

    async fn enhance_search_results(
        &self,
        results: Vec<SearchResult>,
        _context: &str,
    ) -> Result<Vec<SearchResult>> {
        if self.fail {
            return Err(Error::Timeout("enhancer timed out".to_string()));
        }
        let mut enhanced = results;
        for r in &mut enhanced {
            r.metadata
                .insert("enhanced_by".to_string(), serde_json::json!(self.name));
        }
        Ok(enhanced)
    }
}

struct StaticProvider {
    name: String,
    quality: f32,
}

#[async_trait::async_trait]
impl QualityProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn cost_per_call(&self) -> f64 {
        0.001
    }

    async fn assess(&self, _content: &str) -> Result<ProviderAssessment> {
        Ok(ProviderAssessment {
            quality_score: self.quality,
            confidence: 0.9,
            reasoning: "static".to_string(),
        })
    }
}

fn mixed_batch() -> Vec<Document> {
    vec![
        Document::new("d1", "machine learning algorithms"),
        Document::new("", "document with no id"),
        Document::new("d2", "deep neural networks"),
        Document::new("d3", ""),
        Document::new("d4", "gradient descent optimization"),
    ]
}

#[tokio::test]
async fn invalid_documents_fail_without_aborting_the_batch() {
    let store = shared_store();
    let pipeline = DocumentPipeline::new(Arc::clone(&store));

    let result = pipeline.execute(mixed_batch()).await;

    assert!(result.success);
    assert_eq!(result.stage, PipelineStage::Completion);
    assert_eq!(result.processed_items, 3);
    assert_eq!(result.failed_items, 2);
    assert_eq!(result.errors.len(), 2);

    let store = store.lock().await;
    for id in ["d1", "d2", "d4"] {
        assert!(store.documents().get(id).is_some(), "{id} must be retrievable");
    }
    assert!(store.documents().get("d3").is_none());
}

#[tokio::test]
async fn all_invalid_batch_fails_at_validation() {
    let pipeline = DocumentPipeline::new(shared_store());
    let result = pipeline
        .execute(vec![Document::new("", "x"), Document::new("y", " ")])
        .await;

    assert!(!result.success);
    assert_eq!(result.stage, PipelineStage::Validation);
    assert_eq!(result.processed_items, 0);
    assert_eq!(result.failed_items, 2);
}

#[tokio::test]
async fn empty_batch_completes_trivially() {
    let pipeline = DocumentPipeline::new(shared_store());
    let result = pipeline.execute(Vec::new()).await;
    assert!(result.success);
    assert_eq!(result.stage, PipelineStage::Completion);
    assert_eq!(result.processed_items, 0);
    assert_eq!(result.failed_items, 0);
}

#[tokio::test]
async fn provider_outage_fails_at_processing_and_stores_nothing() {
    let store = HybridStore::new(test_config(), Arc::new(FailingEmbedder)).expect("store");
    let store = Arc::new(Mutex::new(store));
    let pipeline = DocumentPipeline::new(Arc::clone(&store));

    let result = pipeline
        .execute(vec![Document::new("d1", "some content")])
        .await;

    assert!(!result.success);
    assert_eq!(result.stage, PipelineStage::Processing);
    assert_eq!(result.failed_items, 1);
    assert_eq!(store.lock().await.document_count(), 0);
}

#[tokio::test]
async fn document_pipeline_pushes_embeddings_to_integrations() {
    let store = shared_store();
    let adapter = MemoryAdapter::new("graph");
    let pipeline =
        DocumentPipeline::new(store).with_integration(adapter.clone() as Arc<dyn IntegrationAdapter>);

    let result = pipeline
        .execute(vec![
            Document::new("d1", "machine learning"),
            Document::new("d2", "neural networks"),
        ])
        .await;

    assert!(result.success);
    assert_eq!(adapter.push_count(), 1);
    let pushes = adapter.pushes.lock().expect("lock");
    let (documents, embeddings) = &pushes[0];
    assert_eq!(documents.len(), 2);
    assert_eq!(embeddings.len(), 2);
    assert!(embeddings.iter().all(|v| v.len() == DIM));
}

#[tokio::test]
async fn quality_pass_annotates_result_metadata() {
    let store = shared_store();
    let mut cfg = EngineConfig::development();
    cfg.cost_limit_per_day = 10.0;
    let validator = ConsensusValidator::new(
        Arc::new(cfg),
        vec![
            Arc::new(StaticProvider { name: "a".to_string(), quality: 0.9 }),
            Arc::new(StaticProvider { name: "b".to_string(), quality: 0.85 }),
        ],
        Arc::new(UsageTracker::new()),
    )
    .expect("validator");
    let pipeline = DocumentPipeline::new(store).with_validator(Arc::new(validator));

    let result = pipeline
        .execute(vec![Document::new("d1", "well written content")])
        .await;

    assert!(result.success);
    let quality = result.metadata.get("quality").expect("quality metadata");
    let entry = quality.get("d1").expect("per-document entry");
    assert_eq!(entry.get("consensus_reached"), Some(&serde_json::json!(true)));
}

#[tokio::test]
async fn search_validation_fails_before_any_external_call() {
    // A failing embedder proves validation rejects without reaching it.
    let store = HybridStore::new(test_config(), Arc::new(FailingEmbedder)).expect("store");
    let pipeline = SearchPipeline::new(Arc::new(Mutex::new(store)));

    let outcome = pipeline.execute("", 5, None, false).await;
    assert!(!outcome.summary.success);
    assert_eq!(outcome.summary.stage, PipelineStage::Validation);
    assert!(outcome.results.is_empty());

    let outcome = pipeline.execute("query", 0, None, false).await;
    assert!(!outcome.summary.success);
    assert_eq!(outcome.summary.stage, PipelineStage::Validation);
}

#[tokio::test]
async fn search_pipeline_returns_ranked_results() {
    let store = shared_store();
    DocumentPipeline::new(Arc::clone(&store))
        .execute(vec![
            Document::new("d1", "machine learning algorithms"),
            Document::new("d2", "deep neural networks"),
            Document::new("d3", "machine learning with neural networks"),
        ])
        .await;

    let outcome = SearchPipeline::new(store)
        .execute("machine learning", 2, None, false)
        .await;

    assert!(outcome.summary.success);
    assert_eq!(outcome.summary.stage, PipelineStage::Completion);
    assert_eq!(outcome.summary.processed_items, outcome.results.len());
    assert!(!outcome.results.is_empty());
    for r in &outcome.results {
        assert!(r.doc_id == "d1" || r.doc_id == "d3");
    }
}

#[tokio::test]
async fn provider_outage_during_search_fails_at_processing() {
    let store = HybridStore::new(test_config(), Arc::new(FailingEmbedder)).expect("store");
    let outcome = SearchPipeline::new(Arc::new(Mutex::new(store)))
        .execute("query", 3, None, false)
        .await;
    assert!(!outcome.summary.success);
    assert_eq!(outcome.summary.stage, PipelineStage::Processing);
}

#[tokio::test]
async fn failing_enhancer_leaves_results_intact() {
    let store = shared_store();
    DocumentPipeline::new(Arc::clone(&store))
        .execute(vec![Document::new("d1", "machine learning")])
        .await;

    let pipeline = SearchPipeline::new(store)
        .with_integration(MemoryAdapter::failing("dead") as Arc<dyn IntegrationAdapter>);
    let outcome = pipeline.execute("machine learning", 1, None, false).await;

    assert!(outcome.summary.success, "enhancement is best-effort");
    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.summary.errors.iter().any(|e| e.contains("dead")));
    assert!(!outcome.results[0].metadata.contains_key("enhanced_by"));
}

#[tokio::test]
async fn working_enhancer_annotates_results() {
    let store = shared_store();
    DocumentPipeline::new(Arc::clone(&store))
        .execute(vec![Document::new("d1", "machine learning")])
        .await;

    let outcome = SearchPipeline::new(store)
        .with_integration(MemoryAdapter::new("graph") as Arc<dyn IntegrationAdapter>)
        .execute("machine learning", 1, None, false)
        .await;

    assert!(outcome.summary.success);
    assert_eq!(
        outcome.results[0].metadata.get("enhanced_by"),
        Some(&serde_json::json!("graph"))
    );
}

#[tokio::test]
async fn sync_pushes_only_live_documents() {
    let store = shared_store();
    DocumentPipeline::new(Arc::clone(&store))
        .execute(vec![
            Document::new("d1", "machine learning"),
            Document::new("d2", "neural networks"),
        ])
        .await;
    store.lock().await.delete_document("d2").expect("delete");

    let adapter = MemoryAdapter::new("graph");
    let result = SyncPipeline::new(store, vec![adapter.clone() as Arc<dyn IntegrationAdapter>])
        .execute()
        .await;

    assert!(result.success);
    assert_eq!(result.processed_items, 1);
    let pushes = adapter.pushes.lock().expect("lock");
    let (documents, _) = &pushes[0];
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].id, "d1");
}

#[tokio::test]
async fn one_failing_sync_target_does_not_stop_the_others() {
    let store = shared_store();
    DocumentPipeline::new(Arc::clone(&store))
        .execute(vec![Document::new("d1", "machine learning")])
        .await;

    let good = MemoryAdapter::new("good");
    let result = SyncPipeline::new(
        store,
        vec![
            MemoryAdapter::failing("bad") as Arc<dyn IntegrationAdapter>,
            good.clone() as Arc<dyn IntegrationAdapter>,
        ],
    )
    .execute()
    .await;

    assert!(!result.success);
    assert_eq!(result.processed_items, 1);
    assert_eq!(result.failed_items, 1);
    assert_eq!(good.push_count(), 1, "healthy adapter still receives the batch");
}
