use crate::utils::{TestServer, init_tracing};
use anyhow::Result;
use serde_json::{Value, json};
use sightline_server::{InferenceMode, ServerConfig};

#[tokio::test]
async fn test_status_reports_mode() -> Result<()> {
    init_tracing();
    let server = TestServer::start_with(ServerConfig {
        mode: InferenceMode::Server,
        ..Default::default()
    })
    .await?;

    let body: Value = reqwest::get(server.http_url("/")).await?.json().await?;
    assert_eq!(body, json!({ "status": "ok", "mode": "server" }));
    Ok(())
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() -> Result<()> {
    init_tracing();
    let server = TestServer::start().await?;

    let response = reqwest::Client::new()
        .get(server.http_url("/"))
        .header("Origin", "http://localhost:5173")
        .send()
        .await?;
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    Ok(())
}
