//! corpusdb-embed
//!
//! Embedding backends. `RemoteEmbedder` wraps the remote embedding/rerank
//! HTTP API with batching, bounded concurrency, a single rate-limit retry
//! and optional PII redaction. `HashingEmbedder` is a deterministic local
//! fallback used by tests and the offline CLI mode.

pub mod client;
pub mod hashing;
pub mod pii;
pub mod transport;

pub use client::RemoteEmbedder;
pub use hashing::HashingEmbedder;
pub use transport::{EmbedTransport, ReqwestTransport, WireResponse};
