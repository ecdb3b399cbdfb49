//! corpusdb-pipeline
//!
//! Stage-sequenced orchestrators over the hybrid store. Each pipeline walks
//! validation, processing, storage, enhancement and completion, and folds
//! every component failure into a structured `PipelineResult` instead of
//! letting errors cross the pipeline boundary. Callers branch on `success`
//! and read `errors` for diagnostics.

pub mod document;
pub mod search;
pub mod sync;

pub use document::DocumentPipeline;
pub use search::{SearchOutcome, SearchPipeline};
pub use sync::SyncPipeline;

use corpusdb_core::error::Error;
use corpusdb_core::types::PipelineStage;

/// Maps a hybrid-store error to the stage it belongs to. Embedding and
/// provider calls fail in flight (processing); index and snapshot faults
/// are storage.
pub(crate) fn stage_of(error: &Error) -> PipelineStage {
    match error {
        Error::Storage(_) => PipelineStage::Storage,
        Error::Validation(_) | Error::InvalidConfig(_) => PipelineStage::Validation,
        _ => PipelineStage::Processing,
    }
}
