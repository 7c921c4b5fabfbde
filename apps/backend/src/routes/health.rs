//! Service health endpoint

use axum::Json;
use serde_json::{json, Value};

/// GET / and GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "service": "anki-packager" }))
}
