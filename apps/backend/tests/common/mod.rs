//! Common test utilities and fixtures for integration tests.
//!
//! The service is stateless, so a test server needs no database or
//! storage setup: build the router and go.

pub mod fixtures;

use axum_test::TestServer;

use anki_packager_backend::app;

/// Spin up an in-process test server.
pub fn server() -> TestServer {
    TestServer::new(app()).expect("failed to start test server")
}

/// Pull the base64 payload out of a download URL.
pub fn payload_from_url(download_url: &str) -> String {
    download_url
        .split("payload=")
        .nth(1)
        .expect("download URL carries a payload parameter")
        .to_string()
}
