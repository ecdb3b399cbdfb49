//! One-directory snapshot of the whole hybrid store.
//!
//! Layout: `documents.json` (document store), `dense.json` (dense index),
//! `manifest.json` (blake3 content hashes of both). Load verifies the
//! hashes, rebuilds the dense graph from its stored vectors and rebuilds
//! the lexical index from the live documents, so a loaded store reproduces
//! the exact search results of the saved one.

use crate::store::HybridStore;
use corpusdb_core::config::EngineConfig;
use corpusdb_core::error::{Error, Result};
use corpusdb_core::store::DocumentStore;
use corpusdb_core::traits::EmbeddingBackend;
use corpusdb_dense::DenseIndex;
use corpusdb_lexical::LexicalIndex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

const DOCUMENTS_FILE: &str = "documents.json";
const DENSE_FILE: &str = "dense.json";
const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    embedding_dimension: usize,
    documents_hash: String,
    dense_hash: String,
}

fn hash_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(storage)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

impl HybridStore {
    /// Persist the store as one consistent snapshot directory.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(storage)?;

        let documents_path = dir.join(DOCUMENTS_FILE);
        let bytes = serde_json::to_vec(&self.documents).map_err(storage)?;
        std::fs::write(&documents_path, bytes).map_err(storage)?;

        let dense_path = dir.join(DENSE_FILE);
        self.dense.save(&dense_path)?;

        let manifest = Manifest {
            version: 1,
            embedding_dimension: self.config().embedding_dimension,
            documents_hash: hash_file(&documents_path)?,
            dense_hash: hash_file(&dense_path)?,
        };
        let bytes = serde_json::to_vec_pretty(&manifest).map_err(storage)?;
        std::fs::write(dir.join(MANIFEST_FILE), bytes).map_err(storage)?;
        tracing::info!(dir = %dir.display(), "snapshot written");
        Ok(())
    }

    /// Load a snapshot into a fresh instance. Fails on checksum mismatch
    /// or when the snapshot's dimension disagrees with the config.
    pub fn load(
        dir: &Path,
        config: Arc<EngineConfig>,
        embedder: Arc<dyn EmbeddingBackend>,
    ) -> Result<Self> {
        let manifest_bytes = std::fs::read(dir.join(MANIFEST_FILE)).map_err(storage)?;
        let manifest: Manifest = serde_json::from_slice(&manifest_bytes).map_err(storage)?;
        if manifest.embedding_dimension != config.embedding_dimension {
            return Err(Error::InvalidConfig(format!(
                "snapshot dimension {} does not match configured {}",
                manifest.embedding_dimension, config.embedding_dimension
            )));
        }

        let documents_path = dir.join(DOCUMENTS_FILE);
        let dense_path = dir.join(DENSE_FILE);
        if hash_file(&documents_path)? != manifest.documents_hash {
            return Err(Error::Storage("documents snapshot checksum mismatch".to_string()));
        }
        if hash_file(&dense_path)? != manifest.dense_hash {
            return Err(Error::Storage("dense snapshot checksum mismatch".to_string()));
        }

        let bytes = std::fs::read(&documents_path).map_err(storage)?;
        let documents: DocumentStore = serde_json::from_slice(&bytes).map_err(storage)?;
        let dense = DenseIndex::load(&dense_path)?;
        let lexical = LexicalIndex::from_documents(documents.live_documents())?;

        tracing::info!(
            dir = %dir.display(),
            documents = documents.stats().document_count,
            "snapshot loaded"
        );
        Ok(Self::from_parts(config, embedder, documents, dense, lexical))
    }
}

fn storage(e: impl std::fmt::Display) -> Error {
    Error::Storage(e.to_string())
}
