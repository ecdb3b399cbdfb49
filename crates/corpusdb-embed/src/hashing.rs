//! Deterministic local embedding backend.
//!
//! Feature-hashes lowercase word tokens into a fixed-dimension bucket
//! vector and L2-normalizes. Not semantically smart, but deterministic and
//! dimension-correct, which is exactly what the offline CLI mode and the
//! hybrid/pipeline tests need: token overlap translates into cosine
//! similarity.

use corpusdb_core::error::Result;
use corpusdb_core::traits::{EmbeddingBackend, RerankHit};
use std::hash::Hasher;
use twox_hash::XxHash64;

const HASH_SEED: u64 = 0x5eed;

pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = XxHash64::with_seed(HASH_SEED);
            hasher.write(token.to_lowercase().as_bytes());
            let bucket = (hasher.finish() % self.dim as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    // Inputs are already unit-length (or zero).
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[async_trait::async_trait]
impl EmbeddingBackend for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    async fn rerank_documents(&self, query: &str, documents: &[String]) -> Result<Vec<RerankHit>> {
        let query_vec = self.embed_one(query);
        let mut hits: Vec<RerankHit> = documents
            .iter()
            .enumerate()
            .map(|(index, text)| RerankHit {
                index,
                text: text.clone(),
                score: cosine(&query_vec, &self.embed_one(text)),
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
        true
    }
}
