//! Error types for deck-core.

use thiserror::Error;

/// Errors raised while validating raw card records.
///
/// Validation runs over the whole batch before any packaging starts; the
/// first invalid card rejects the entire request.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("card {index}: unknown note type {value:?}")]
    InvalidNoteType { index: usize, value: String },

    #[error("card {index}: missing required field {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("card {index}: cloze text has {count} deletions; max is 2")]
    TooManyClozeDeletions { index: usize, count: usize },
}

/// Errors raised while serializing a deck into an archive.
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("collection database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
}
