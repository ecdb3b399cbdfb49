//! corpusdb-hybrid
//!
//! Composes the document store, dense index and lexical index behind one
//! add/search/update/delete contract, with configurable score fusion and
//! optional remote reranking.

pub mod fusion;
pub mod snapshot;
pub mod store;

pub use store::HybridStore;
