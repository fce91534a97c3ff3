//! Error types for docstring conversion.

use thiserror::Error;

/// Errors raised by the fallible stages of the conversion pipeline.
///
/// Conversion itself degrades gracefully; only hard limits and malformed
/// repository data surface as errors. File loading reports through `anyhow`
/// with the path as context.
#[derive(Debug, Error)]
pub enum DocError {
    /// List, quote or section nesting went deeper than the configured cap.
    #[error("markdown nesting exceeds the maximum depth of {max}")]
    NestingTooDeep { max: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DocError>;
