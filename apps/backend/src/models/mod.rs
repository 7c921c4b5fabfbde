//! API request and response types

use serde::{Deserialize, Serialize};

// Re-export the shared card record from deck-core
pub use deck_core::RawCard;

/// Payload accepted by the build endpoints. The same shape round-trips
/// through the download link's base64 `payload` parameter, so the service
/// never stores a deck server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_name: Option<String>,
    pub cards: Vec<RawCard>,
}

/// Response of the build endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResponse {
    pub download_url: String,
}

/// Query parameters of the download endpoint.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub payload: String,
}
