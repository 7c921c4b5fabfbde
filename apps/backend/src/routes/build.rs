//! Build endpoint
//!
//! Validates the submitted cards and answers with a same-origin download
//! link. The whole payload is folded into the link as URL-safe base64, so
//! nothing is kept server-side between the two requests.

use axum::extract::Host;
use axum::Json;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;

use deck_core::effective_deck_name;

use crate::error::{ApiError, Result};
use crate::models::{BuildRequest, BuildResponse};

/// POST / and POST /api/build_apkg
pub async fn build(
    Host(host): Host,
    Json(req): Json<BuildRequest>,
) -> Result<Json<BuildResponse>> {
    // Surface card errors here rather than when the link is followed.
    deck_core::validate(&req.cards)?;

    let payload = BuildRequest {
        deck_name: Some(effective_deck_name(req.deck_name.as_deref()).to_string()),
        cards: req.cards,
    };
    let encoded = URL_SAFE.encode(
        serde_json::to_vec(&payload).map_err(|err| ApiError::Internal(err.to_string()))?,
    );

    let download_url = format!("{}/api/download?payload={}", origin(&host), encoded);
    Ok(Json(BuildResponse { download_url }))
}

/// Origin used in the download link: `PUBLIC_BASE_URL` when configured
/// (reverse-proxy deployments), otherwise derived from the Host header.
fn origin(host: &str) -> String {
    match std::env::var("PUBLIC_BASE_URL") {
        Ok(base) => base.trim_end_matches('/').to_string(),
        Err(_) => format!("http://{}", host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_falls_back_to_host_header() {
        assert_eq!(origin("localhost:3000"), "http://localhost:3000");
    }
}
