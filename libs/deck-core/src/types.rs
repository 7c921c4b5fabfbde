//! Core types for deck packaging.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deck name used when the caller supplies none.
pub const DEFAULT_DECK_NAME: &str = "Learning AI";

/// Note type of a card, selecting which model the note binds to. The
/// wire value is the Anki model name, handled by [`NoteType::from_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteType {
    Basic,
    BasicAndReverse,
    Cloze,
}

impl NoteType {
    /// Model name as it appears in Anki, also the accepted wire value.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::BasicAndReverse => "Basic (and reverse)",
            Self::Cloze => "Cloze",
        }
    }

    /// Parse from the wire value.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "Basic" => Some(Self::Basic),
            "Basic (and reverse)" => Some(Self::BasicAndReverse),
            "Cloze" => Some(Self::Cloze),
            _ => None,
        }
    }
}

/// Card record as submitted by the caller (not yet validated).
///
/// Which of the optional fields must be present depends on `note_type`;
/// the validator enforces that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCard {
    pub note_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Validated card: note type resolved, field values bound positionally
/// (`[front, back]` or `[text]`), tags normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub note_type: NoteType,
    pub fields: Vec<String>,
    pub tags: Vec<String>,
}

/// A named, validated collection of cards ready for packaging.
#[derive(Debug, Clone)]
pub struct Deck {
    pub id: i64,
    pub name: String,
    pub cards: Vec<Card>,
}

impl Deck {
    /// Resolve the effective deck name and derive its id.
    pub fn new(name: Option<&str>, cards: Vec<Card>) -> Self {
        let name = effective_deck_name(name).to_string();
        let id = deck_id(&name);
        Self { id, name, cards }
    }
}

/// Resolve the user-supplied deck name, falling back to the default when
/// absent or empty.
pub fn effective_deck_name(name: Option<&str>) -> &str {
    match name {
        Some(n) if !n.is_empty() => n,
        _ => DEFAULT_DECK_NAME,
    }
}

/// Derive a stable deck id from the deck name.
///
/// First 12 hex characters of the SHA-256 digest of the UTF-8 name, read
/// as base-16. The value is at most 48 bits wide and always fits the
/// signed 64-bit `INTEGER` deck id column of the collection database.
pub fn deck_id(name: &str) -> i64 {
    let digest = format!("{:x}", Sha256::digest(name.as_bytes()));
    i64::from_str_radix(&digest[..12], 16).expect("12 hex chars fit in i64")
}
