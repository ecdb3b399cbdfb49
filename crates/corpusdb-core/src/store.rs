//! In-memory document store with first-class soft deletion.
//!
//! Documents live in an append-only slot vector addressed through an
//! id -> slot map. Deletion tombstones the id and clears the slot payload
//! instead of punching holes in the vector, so internal indices handed to
//! `get_by_indices` stay stable across deletes. Single-writer semantics:
//! callers serialize mutations.

use crate::types::{DocId, Document, Metadata};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    /// Live (non-tombstoned) documents.
    pub document_count: usize,
    pub storage_type: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DocumentStore {
    slots: Vec<Document>,
    id_to_slot: HashMap<DocId, usize>,
    tombstones: HashSet<DocId>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite documents. Re-adding a tombstoned id revives it
    /// in its existing slot.
    pub fn add(&mut self, documents: &[Document]) {
        for doc in documents {
            match self.id_to_slot.get(&doc.id) {
                Some(&slot) => {
                    self.slots[slot] = doc.clone();
                    self.tombstones.remove(&doc.id);
                }
                None => {
                    self.id_to_slot.insert(doc.id.clone(), self.slots.len());
                    self.slots.push(doc.clone());
                }
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        if self.tombstones.contains(id) {
            return None;
        }
        self.id_to_slot.get(id).map(|&slot| &self.slots[slot])
    }

    /// Internal slot index for an id, live or tombstoned.
    pub fn slot_of(&self, id: &str) -> Option<usize> {
        self.id_to_slot.get(id).copied()
    }

    /// Fetch live documents by internal slot index; out-of-range and
    /// tombstoned slots are skipped.
    pub fn get_by_indices(&self, indices: &[usize]) -> Vec<Document> {
        indices
            .iter()
            .filter_map(|&i| self.slots.get(i))
            .filter(|d| !self.tombstones.contains(&d.id))
            .cloned()
            .collect()
    }

    /// Replace an existing document in place. Absent ids are ignored with a
    /// warning: callers must `add` first.
    pub fn update(&mut self, id: &str, document: Document) {
        match self.id_to_slot.get(id) {
            Some(&slot) if !self.tombstones.contains(id) => {
                self.slots[slot] = document;
            }
            _ => {
                tracing::warn!(id, "update ignored: document not present, add it first");
            }
        }
    }

    /// Soft delete: the slot keeps the id as a tombstone but its content and
    /// metadata are cleared. Returns whether a live document existed, so a
    /// second delete of the same id returns false.
    pub fn delete(&mut self, id: &str) -> bool {
        match self.id_to_slot.get(id) {
            Some(&slot) if !self.tombstones.contains(id) => {
                self.slots[slot].content.clear();
                self.slots[slot].metadata = Metadata::new();
                self.tombstones.insert(id.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_slot.contains_key(id) && !self.tombstones.contains(id)
    }

    pub fn live_documents(&self) -> impl Iterator<Item = &Document> {
        self.slots
            .iter()
            .filter(move |d| !self.tombstones.contains(&d.id))
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            document_count: self.id_to_slot.len() - self.tombstones.len(),
            storage_type: "memory".to_string(),
        }
    }
}
