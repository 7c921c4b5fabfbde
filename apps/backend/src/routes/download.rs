//! Download endpoint
//!
//! Decodes the payload produced by the build endpoint, builds the package,
//! and streams it back as an attachment.

use axum::extract::Query;
use axum::http::header;
use axum::response::IntoResponse;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;

use deck_core::Deck;

use crate::error::{ApiError, Result};
use crate::models::{BuildRequest, DownloadQuery};

/// GET /api/download?payload=...
pub async fn download(Query(query): Query<DownloadQuery>) -> Result<impl IntoResponse> {
    let req = decode_payload(&query.payload)?;
    let cards = deck_core::validate(&req.cards)?;
    let deck = Deck::new(req.deck_name.as_deref(), cards);

    tracing::info!(deck = %deck.name, cards = deck.cards.len(), "building deck package");
    let bytes = deck_core::build(&deck)?;

    let headers = [
        (
            header::CONTENT_TYPE,
            "application/octet-stream".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", suggested_filename(&deck.name)),
        ),
    ];
    Ok((headers, bytes))
}

fn decode_payload(payload: &str) -> Result<BuildRequest> {
    let raw = URL_SAFE
        .decode(payload)
        .map_err(|err| ApiError::BadPayload(err.to_string()))?;
    serde_json::from_slice(&raw).map_err(|err| ApiError::BadPayload(err.to_string()))
}

/// Attachment filename: the deck name with every character outside
/// `[A-Za-z0-9._-]` replaced by `_`, plus the `.apkg` extension.
fn suggested_filename(deck_name: &str) -> String {
    let safe: String = deck_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if safe.is_empty() {
        "deck.apkg".to_string()
    } else {
        format!("{}.apkg", safe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn filename_replaces_unsafe_characters() {
        assert_eq!(suggested_filename("My Deck"), "My_Deck.apkg");
        assert_eq!(suggested_filename("rust/ownership"), "rust_ownership.apkg");
        assert_eq!(suggested_filename("v1.2-beta_x"), "v1.2-beta_x.apkg");
    }

    #[test]
    fn filename_falls_back_when_empty() {
        assert_eq!(suggested_filename(""), "deck.apkg");
    }

    #[test]
    fn filename_replaces_non_ascii() {
        assert_eq!(suggested_filename("日本語"), "___.apkg");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_payload("%%%not-base64%%%"),
            Err(ApiError::BadPayload(_))
        ));
    }

    #[test]
    fn decode_rejects_valid_base64_with_bad_json() {
        let encoded = URL_SAFE.encode(b"not json at all");
        assert!(matches!(
            decode_payload(&encoded),
            Err(ApiError::BadPayload(_))
        ));
    }
}
