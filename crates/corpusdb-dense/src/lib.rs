//! corpusdb-dense
//!
//! Approximate nearest-neighbor index over fixed-dimension embedding
//! vectors, built on hnsw_rs with cosine distance.
//!
//! hnsw_rs cannot remove points from the graph, so deletion is a live-set
//! concern: ids are tombstoned, their slot mappings dropped, and search
//! over-fetches to compensate before filtering stale slots out.

pub mod index;

pub use index::DenseIndex;
