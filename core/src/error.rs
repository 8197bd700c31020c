//! Error types for folio-core.

use thiserror::Error;

/// Errors raised by index construction, validation, search and persistence.
///
/// Degenerate inputs (empty corpus, empty query, out-of-vocabulary query)
/// are not errors; they produce empty results.
#[derive(Debug, Error)]
pub enum Error {
    /// A structural invariant of an index or snapshot does not hold.
    #[error("invalid index: {0}")]
    Validation(String),

    /// Per-document arrays disagree with the document count.
    #[error("{what} has length {got}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A boost signal is negative or not finite.
    #[error("invalid {what} for doc {doc_id}: {value}")]
    InvalidSignal {
        what: &'static str,
        doc_id: u32,
        value: f64,
    },

    #[error("field {0:?} is not indexed")]
    UnknownField(String),

    #[error("unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("snapshot encoding failed: {0}")]
    Codec(#[from] bincode::Error),

    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
