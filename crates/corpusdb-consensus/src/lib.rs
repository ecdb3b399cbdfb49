//! corpusdb-consensus
//!
//! Agreement-weighted quality validation across multiple independent
//! assessment providers. Consensus requires both a weighted mean above the
//! configured threshold and a small spread between responsive providers;
//! large disagreement is surfaced, never averaged away.

pub mod providers;
pub mod validator;

pub use providers::HttpQualityProvider;
pub use validator::ConsensusValidator;
