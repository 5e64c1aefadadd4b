//! Error types for fallible core operations.

use thiserror::Error;

/// Errors raised while loading or addressing a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Page index {index} out of range (document has {len} pages)")]
    PageOutOfRange { index: usize, len: usize },
    #[error("Document has no pages")]
    Empty,
}

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;
