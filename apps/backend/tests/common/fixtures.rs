//! Request payload builders shared across API tests.

use serde_json::{json, Value};

/// A valid Basic card.
pub fn basic_card(front: &str, back: &str) -> Value {
    json!({ "note_type": "Basic", "front": front, "back": back })
}

/// A valid Basic card carrying tags.
pub fn basic_card_with_tags(front: &str, back: &str, tags: &[&str]) -> Value {
    json!({ "note_type": "Basic", "front": front, "back": back, "tags": tags })
}

/// A valid Cloze card.
pub fn cloze_card(text: &str) -> Value {
    json!({ "note_type": "Cloze", "text": text })
}

/// A build request body.
pub fn build_request(deck_name: Option<&str>, cards: Vec<Value>) -> Value {
    match deck_name {
        Some(name) => json!({ "deck_name": name, "cards": cards }),
        None => json!({ "cards": cards }),
    }
}
