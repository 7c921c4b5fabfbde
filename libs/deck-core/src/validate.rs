//! Validation of raw card records and tag normalization.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;
use crate::types::{Card, NoteType, RawCard};

/// Maximum number of cloze deletions allowed in one note.
pub const MAX_CLOZE_DELETIONS: usize = 2;

static CLOZE_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{c\d+::").unwrap());
static NON_KEBAB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Validate a batch of raw card records.
///
/// Each card is checked independently; the first failure rejects the
/// whole batch, so no packaging work starts on partially valid input.
pub fn validate(raw: &[RawCard]) -> Result<Vec<Card>, ValidationError> {
    raw.iter()
        .enumerate()
        .map(|(index, card)| validate_card(index, card))
        .collect()
}

fn validate_card(index: usize, raw: &RawCard) -> Result<Card, ValidationError> {
    let note_type =
        NoteType::from_name(&raw.note_type).ok_or_else(|| ValidationError::InvalidNoteType {
            index,
            value: raw.note_type.clone(),
        })?;

    let fields = match note_type {
        NoteType::Basic | NoteType::BasicAndReverse => {
            let front = require(index, "front", raw.front.as_deref())?;
            let back = require(index, "back", raw.back.as_deref())?;
            vec![front.to_string(), back.to_string()]
        }
        NoteType::Cloze => {
            let text = require(index, "text", raw.text.as_deref())?;
            let count = cloze_deletions(text);
            if count > MAX_CLOZE_DELETIONS {
                return Err(ValidationError::TooManyClozeDeletions { index, count });
            }
            vec![text.to_string()]
        }
    };

    let tags = raw
        .tags
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|t| normalize_tag(t))
        .collect();

    Ok(Card {
        note_type,
        fields,
        tags,
    })
}

fn require<'a>(
    index: usize,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField { index, field }),
    }
}

/// Count cloze deletion markers (`{{cN::`) in a text.
pub fn cloze_deletions(text: &str) -> usize {
    CLOZE_MARKER_RE.find_iter(text).count()
}

/// Normalize one tag.
///
/// `key:value` tags keep the key verbatim and kebab-case the value; tags
/// without a colon are kebab-cased whole. Empty tags normalize to the
/// empty string and are kept.
pub fn normalize_tag(tag: &str) -> String {
    match tag.split_once(':') {
        Some((key, value)) => format!("{}:{}", key, kebab(value)),
        None => kebab(tag),
    }
}

/// Lowercase, collapse every run of non-alphanumerics into one hyphen,
/// and strip hyphens from both ends.
fn kebab(s: &str) -> String {
    let lowered = s.to_lowercase();
    NON_KEBAB_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}
