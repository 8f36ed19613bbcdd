//! Error types for the Minnow library.
//!
//! All fallible operations return [`Result`], whose error type is
//! [`MinnowError`]. The variants map onto the failure classes the core can
//! actually produce: I/O failures, corrupted on-disk data, missing documents,
//! schema violations, and internal invariant breaches.

use std::io;

use thiserror::Error;

/// The main error type for Minnow operations.
#[derive(Error, Debug)]
pub enum MinnowError {
    /// Underlying file operation failed (open, read, write, seek, truncate,
    /// fsync).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization failed while encoding a document payload.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// On-disk data is not what it claims to be: magic mismatch, truncated
    /// framing, or a document payload that fails to parse.
    #[error("corruption detected: {0}")]
    Corruption(String),

    /// Document ID absent from every segment.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Document does not conform to its schema.
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    /// An internal invariant was violated; indicates a bug or misuse.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Result type alias for operations that may fail with [`MinnowError`].
pub type Result<T> = std::result::Result<T, MinnowError>;

impl MinnowError {
    /// Create a new corruption error.
    pub fn corruption<S: Into<String>>(msg: S) -> Self {
        MinnowError::Corruption(msg.into())
    }

    /// Create a new not-found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        MinnowError::NotFound(msg.into())
    }

    /// Create a new schema validation error.
    pub fn schema_validation<S: Into<String>>(msg: S) -> Self {
        MinnowError::SchemaValidation(msg.into())
    }

    /// Create a new invariant violation error.
    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        MinnowError::InvariantViolation(msg.into())
    }

    /// Check whether this error is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MinnowError::NotFound(_))
    }
}
