//! Health endpoint tests.

mod common;

/// Test the health route reports the service name.
#[tokio::test]
async fn test_health() {
    let server = common::server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["service"], "anki-packager");
}

/// Test the root path serves the same health payload.
#[tokio::test]
async fn test_health_on_root() {
    let server = common::server();

    let response = server.get("/").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], true);
}
