//! Domain types shared by the dense, lexical and hybrid engines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocId = String;
pub type Metadata = HashMap<String, serde_json::Value>;

/// A raw document owned by the document store.
///
/// `id` is the stable external identity; a given id maps to at most one
/// live document at any time. `metadata` is free-form and is what search
/// filters match against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<DocId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Indicates which engine produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Dense,
    Lexical,
    Fused,
}

/// The minimal surface returned by the underlying indexes.
///
/// `score` is engine-specific but higher is always better within one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocId,
    pub score: f32,
    pub source: SourceKind,
}

/// A hydrated search result handed back to callers. Transient, never
/// persisted; scores are only comparable within one search call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub score: f32,
    pub content: String,
    pub metadata: Metadata,
}

/// One provider's independent quality judgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAssessment {
    /// Quality in [0, 1].
    pub quality_score: f32,
    /// Provider's confidence in its own judgment, in [0, 1]. A failed
    /// provider contributes a default assessment with confidence 0.0.
    pub confidence: f32,
    pub reasoning: String,
}

impl ProviderAssessment {
    /// Placeholder recorded for a provider that errored out.
    pub fn failed(reason: &str) -> Self {
        Self {
            quality_score: 0.0,
            confidence: 0.0,
            reasoning: format!("provider failed: {reason}"),
        }
    }
}

/// Outcome of one multi-provider consensus validation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub consensus_reached: bool,
    /// Confidence-weighted mean of provider quality scores, in [0, 1].
    pub overall_quality_score: f32,
    pub provider_results: HashMap<String, ProviderAssessment>,
    pub reasoning: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Stage a pipeline run reached; terminal on `Completion` or on the stage
/// where it failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PipelineStage {
    Validation,
    Processing,
    Storage,
    Enhancement,
    Completion,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Validation => "validation",
            PipelineStage::Processing => "processing",
            PipelineStage::Storage => "storage",
            PipelineStage::Enhancement => "enhancement",
            PipelineStage::Completion => "completion",
        };
        f.write_str(name)
    }
}

/// Structured outcome of one pipeline execution. Pipelines never raise past
/// their boundary: callers branch on `success` and read `errors` for
/// diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub stage: PipelineStage,
    pub processed_items: usize,
    pub failed_items: usize,
    pub duration_seconds: f64,
    pub errors: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}
