use corpusdb_core::config::HnswParams;
use corpusdb_core::error::{Error, Result};
use corpusdb_core::types::{DocId, SearchHit, SourceKind};
use hnsw_rs::hnsw::Hnsw;
use hnsw_rs::prelude::DistCosine;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const MAX_LAYER: usize = 16;

/// Persisted form: stored vectors in insertion order plus the tombstone
/// set. The graph itself is rebuilt by re-inserting on load, which keeps
/// the format trivial and the round-trip lossless.
#[derive(Serialize, Deserialize)]
struct DenseSnapshot {
    dimension: usize,
    params: HnswParams,
    entries: Vec<(DocId, Vec<f32>)>,
    tombstones: Vec<DocId>,
}

/// Cosine-similarity HNSW index keyed by document id.
pub struct DenseIndex {
    hnsw: Hnsw<'static, f32, DistCosine>,
    params: HnswParams,
    dimension: usize,
    /// Live ids only; tombstoned and superseded ids are absent.
    id_to_slot: HashMap<DocId, usize>,
    slot_to_id: HashMap<usize, DocId>,
    /// Live vectors, kept for persistence and update-by-reinsert.
    vectors: HashMap<DocId, Vec<f32>>,
    tombstones: HashSet<DocId>,
    next_slot: usize,
    /// Graph points that no longer map to a live id. Search over-fetches
    /// by this amount so filtering them out cannot starve the result set.
    stale_slots: usize,
}

impl DenseIndex {
    pub fn new(dimension: usize, params: HnswParams) -> Self {
        let hnsw = Hnsw::<f32, DistCosine>::new(
            params.m,
            params.max_elements,
            MAX_LAYER,
            params.ef_construction,
            DistCosine {},
        );
        Self {
            hnsw,
            params,
            dimension,
            id_to_slot: HashMap::new(),
            slot_to_id: HashMap::new(),
            vectors: HashMap::new(),
            tombstones: HashSet::new(),
            next_slot: 0,
            stale_slots: 0,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Live vector count.
    pub fn len(&self) -> usize {
        self.id_to_slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_slot.is_empty()
    }

    /// Insert vectors keyed by id. Lengths must match pairwise and every
    /// vector must have the configured dimension; nothing is inserted
    /// otherwise. Re-adding a live or tombstoned id supersedes it.
    pub fn add(&mut self, vectors: &[Vec<f32>], ids: &[DocId]) -> Result<()> {
        if vectors.len() != ids.len() {
            return Err(Error::Validation(format!(
                "got {} vectors for {} ids",
                vectors.len(),
                ids.len()
            )));
        }
        for v in vectors {
            if v.len() != self.dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.dimension,
                    actual: v.len(),
                });
            }
        }
        for (vector, id) in vectors.iter().zip(ids) {
            self.insert_one(id, vector);
        }
        Ok(())
    }

    fn insert_one(&mut self, id: &str, vector: &[f32]) {
        if let Some(old_slot) = self.id_to_slot.remove(id) {
            self.slot_to_id.remove(&old_slot);
            self.stale_slots += 1;
        }
        self.tombstones.remove(id);

        let slot = self.next_slot;
        self.next_slot += 1;
        self.hnsw.insert_slice((vector, slot));
        self.id_to_slot.insert(id.to_string(), slot);
        self.slot_to_id.insert(slot, id.to_string());
        self.vectors.insert(id.to_string(), vector.to_vec());
    }

    /// Top-k by descending cosine similarity. An empty index returns an
    /// empty list, never an error; tombstoned ids are never returned.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.id_to_slot.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let fetch = (k + self.stale_slots).min(self.id_to_slot.len() + self.stale_slots);
        let ef = self.params.ef_search.max(fetch);
        let neighbours = self.hnsw.search(query, fetch, ef);

        let hits = neighbours
            .into_iter()
            .filter_map(|n| {
                self.slot_to_id.get(&n.d_id).map(|id| SearchHit {
                    id: id.clone(),
                    // DistCosine yields 1 - cos(a, b).
                    score: 1.0 - n.distance,
                    source: SourceKind::Dense,
                })
            })
            .take(k)
            .collect();
        Ok(hits)
    }

    /// Replace a live id's vector. Internally a delete-and-reinsert; the
    /// old graph point becomes a stale slot.
    pub fn update(&mut self, id: &str, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if !self.id_to_slot.contains_key(id) {
            return Err(Error::NotFound(format!("dense index has no id {id}")));
        }
        self.insert_one(id, vector);
        Ok(())
    }

    /// Tombstone an id. Idempotent; unknown ids are a no-op.
    pub fn delete(&mut self, id: &str) {
        if let Some(slot) = self.id_to_slot.remove(id) {
            self.slot_to_id.remove(&slot);
            self.vectors.remove(id);
            self.tombstones.insert(id.to_string());
            self.stale_slots += 1;
        }
    }

    /// Live vector for an id, if any.
    pub fn vector(&self, id: &str) -> Option<&[f32]> {
        self.vectors.get(id).map(Vec::as_slice)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut slots: Vec<(usize, &DocId)> =
            self.slot_to_id.iter().map(|(s, id)| (*s, id)).collect();
        slots.sort_unstable_by_key(|(s, _)| *s);
        let entries = slots
            .into_iter()
            .filter_map(|(_, id)| self.vectors.get(id).map(|v| (id.clone(), v.clone())))
            .collect();
        let snapshot = DenseSnapshot {
            dimension: self.dimension,
            params: self.params.clone(),
            entries,
            tombstones: self.tombstones.iter().cloned().collect(),
        };
        let bytes = serde_json::to_vec(&snapshot).map_err(storage)?;
        std::fs::write(path, bytes).map_err(storage)?;
        Ok(())
    }

    /// Rebuild from a saved snapshot by re-inserting stored vectors in
    /// their original slot order.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(storage)?;
        let snapshot: DenseSnapshot = serde_json::from_slice(&bytes).map_err(storage)?;
        let mut index = Self::new(snapshot.dimension, snapshot.params);
        for (id, vector) in &snapshot.entries {
            if vector.len() != index.dimension {
                return Err(Error::DimensionMismatch {
                    expected: index.dimension,
                    actual: vector.len(),
                });
            }
            index.insert_one(id, vector);
        }
        index.tombstones = snapshot.tombstones.into_iter().collect();
        tracing::debug!(count = index.len(), "dense index rebuilt from snapshot");
        Ok(index)
    }
}

fn storage(e: impl std::fmt::Display) -> Error {
    Error::Storage(e.to_string())
}
