//! Core deck packaging library behind the HTTP backend.
//!
//! Provides:
//! - Validation of raw card records against the three supported note types
//! - Tag normalization
//! - Deterministic deck id derivation
//! - The fixed Basic / Basic-and-reverse / Cloze note models
//! - `.apkg` archive assembly (zip + `collection.anki2` database)

pub mod error;
pub mod models;
pub mod package;
pub mod types;
pub mod validate;

pub use error::{PackagingError, ValidationError};
pub use package::build;
pub use types::{
    deck_id, effective_deck_name, Card, Deck, NoteType, RawCard, DEFAULT_DECK_NAME,
};
pub use validate::{cloze_deletions, normalize_tag, validate, MAX_CLOZE_DELETIONS};
