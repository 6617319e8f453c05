//! Row-level and batch-level failures of the label completer.
//!
//! A `RowError` only ever skips the row it happened on. A `CompletionError`
//! stops the run.

use thiserror::Error;

use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::labeling::{InferenceError, ValidationError};
use crate::pipeline::table::TableError;

#[derive(Error, Debug)]
pub enum RowError {
    #[error("Document extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Label rejected: {0}")]
    Validation(#[from] ValidationError),
}

impl RowError {
    /// Stable short name for logs and run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Extraction(ExtractionError::InvalidInput { .. }) => "invalid_input",
            Self::Extraction(ExtractionError::UnsupportedFormat { .. }) => "unsupported_format",
            Self::Extraction(
                ExtractionError::InsufficientText { .. } | ExtractionError::FallbackFailed { .. },
            ) => "insufficient_text",
            Self::Extraction(_) => "extraction",
            Self::Inference(_) => "inference",
            Self::Validation(ValidationError::MalformedJson(_)) => "malformed_json",
            Self::Validation(ValidationError::Schema { .. }) => "schema",
        }
    }
}

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Labeling model could not be loaded: {0}")]
    ModelLoad(#[source] InferenceError),
}
