//! Engine configuration.
//!
//! One immutable struct per process, validated at construction and passed
//! by reference to every component. Presets are factory functions returning
//! fully-populated structs; derived configs are built via copy-with-override
//! (`with_*` methods re-validate), never in-place edits.
//!
//! `EngineConfig::load` merges `corpusdb.toml` and `CORPUSDB_*` environment
//! variables over the development preset via Figment.

use crate::error::{Error, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Tolerance for the fusion weight sum invariant.
const WEIGHT_TOLERANCE: f32 = 1e-3;

/// How dense and lexical result lists are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStrategy {
    WeightedSum,
    ReciprocalRank,
}

/// HNSW build/search parameters. Recall is tunable through `ef_search` and
/// `ef_construction`; approximation is a quality/speed trade-off, not a bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Bidirectional links per node.
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    /// Capacity hint for the graph allocator.
    pub max_elements: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub embed_model: String,
    pub rerank_model: String,
    pub embedding_dimension: usize,
    /// Texts per remote embedding request.
    pub batch_size: usize,
    /// Upper bound on in-flight remote calls (semaphore permits).
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
    /// Must sum with `vector_weight` to 1.0 within 1e-3.
    pub bm25_weight: f32,
    pub vector_weight: f32,
    pub fusion: FusionStrategy,
    /// Rank-dampening constant for reciprocal rank fusion.
    pub rrf_k: usize,
    /// Each sub-index is asked for `k * search_k_multiplier` candidates
    /// before fusion and filtering. Narrow metadata filters reduce
    /// effective recall; raise this to compensate.
    pub search_k_multiplier: usize,
    pub hnsw: HnswParams,
    /// Redact emails/SSNs/phone numbers before any text leaves the process.
    pub enable_pii_detection: bool,
    pub min_providers: usize,
    /// Weighted-mean quality a document must exceed for consensus.
    pub consensus_threshold: f32,
    /// Maximum allowed max-min spread between provider quality scores.
    pub max_provider_spread: f32,
    /// Daily ceiling in dollars for consensus provider spend.
    pub cost_limit_per_day: f64,
}

impl EngineConfig {
    /// Balanced defaults for local development.
    pub fn development() -> Self {
        Self {
            embed_model: "voyage-3-large".to_string(),
            rerank_model: "rerank-2".to_string(),
            embedding_dimension: 2048,
            batch_size: 32,
            max_concurrent_requests: 4,
            request_timeout_secs: 30,
            bm25_weight: 0.4,
            vector_weight: 0.6,
            fusion: FusionStrategy::WeightedSum,
            rrf_k: 60,
            search_k_multiplier: 3,
            hnsw: HnswParams {
                m: 16,
                ef_construction: 200,
                ef_search: 100,
                max_elements: 100_000,
            },
            enable_pii_detection: false,
            min_providers: 2,
            consensus_threshold: 0.7,
            max_provider_spread: 0.3,
            cost_limit_per_day: 5.0,
        }
    }

    pub fn production() -> Self {
        Self {
            max_concurrent_requests: 8,
            request_timeout_secs: 60,
            enable_pii_detection: true,
            cost_limit_per_day: 50.0,
            hnsw: HnswParams {
                m: 16,
                ef_construction: 400,
                ef_search: 200,
                max_elements: 1_000_000,
            },
            ..Self::development()
        }
    }

    /// Recall-heavy settings for offline experiments.
    pub fn research() -> Self {
        Self {
            fusion: FusionStrategy::ReciprocalRank,
            search_k_multiplier: 10,
            hnsw: HnswParams {
                m: 32,
                ef_construction: 800,
                ef_search: 400,
                max_elements: 1_000_000,
            },
            ..Self::development()
        }
    }

    pub fn high_security() -> Self {
        Self {
            enable_pii_detection: true,
            max_concurrent_requests: 2,
            min_providers: 3,
            consensus_threshold: 0.8,
            cost_limit_per_day: 10.0,
            ..Self::development()
        }
    }

    pub fn high_performance() -> Self {
        Self {
            batch_size: 128,
            max_concurrent_requests: 16,
            search_k_multiplier: 2,
            hnsw: HnswParams {
                m: 12,
                ef_construction: 100,
                ef_search: 50,
                max_elements: 1_000_000,
            },
            ..Self::development()
        }
    }

    /// Merge `corpusdb.toml` and `CORPUSDB_*` env vars over the development
    /// preset, then validate.
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Self::development()))
            .merge(Toml::file("corpusdb.toml"))
            .merge(Env::prefixed("CORPUSDB_"));
        let config: Self = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Copy-with-override for fusion weights; fails when the pair does not
    /// sum to 1.0 within tolerance.
    pub fn with_weights(mut self, bm25_weight: f32, vector_weight: f32) -> Result<Self> {
        self.bm25_weight = bm25_weight;
        self.vector_weight = vector_weight;
        self.validate()?;
        Ok(self)
    }

    /// Copy-with-override for the fusion strategy.
    #[must_use]
    pub fn with_fusion(mut self, fusion: FusionStrategy) -> Self {
        self.fusion = fusion;
        self
    }

    /// Copy-with-override for the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Result<Self> {
        self.embedding_dimension = dimension;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let weight_sum = self.bm25_weight + self.vector_weight;
        if (weight_sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(Error::InvalidConfig(format!(
                "fusion weights must sum to 1.0, got {weight_sum}"
            )));
        }
        if self.bm25_weight < 0.0 || self.vector_weight < 0.0 {
            return Err(Error::InvalidConfig(
                "fusion weights must be non-negative".to_string(),
            ));
        }
        if self.embedding_dimension == 0 {
            return Err(Error::InvalidConfig(
                "embedding_dimension must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 || self.max_concurrent_requests == 0 {
            return Err(Error::InvalidConfig(
                "batch_size and max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.search_k_multiplier == 0 {
            return Err(Error::InvalidConfig(
                "search_k_multiplier must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.consensus_threshold) {
            return Err(Error::InvalidConfig(
                "consensus_threshold must be in [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.max_provider_spread) {
            return Err(Error::InvalidConfig(
                "max_provider_spread must be in [0, 1]".to_string(),
            ));
        }
        if self.cost_limit_per_day < 0.0 {
            return Err(Error::InvalidConfig(
                "cost_limit_per_day must be non-negative".to_string(),
            ));
        }
        if self.hnsw.m == 0 || self.hnsw.ef_construction == 0 || self.hnsw.ef_search == 0 {
            return Err(Error::InvalidConfig(
                "hnsw parameters must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
