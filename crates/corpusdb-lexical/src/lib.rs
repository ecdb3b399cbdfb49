//! corpusdb-lexical
//!
//! Tantivy-backed BM25 keyword index. Intentionally independent from the
//! dense index so the two fail differently: this one misses synonyms, the
//! dense one misses exact rare tokens.

pub mod index;

pub use index::LexicalIndex;
