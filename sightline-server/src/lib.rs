pub mod api;
pub mod config;
pub mod error;
pub mod room;
pub mod signaling;
mod state;

pub use config::{InferenceMode, ServerConfig};
pub use error::ServerError;
pub use room::*;
pub use signaling::*;
pub use state::AppState;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

/// All routes: the relay at `/ws`, detection at `/infer` and `/latest`, metrics under
/// `/metrics`, and a status probe at `/`.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(api::status))
        .route("/ws", get(ws_handler))
        .route("/infer", post(api::infer))
        .route("/latest", get(api::latest))
        .route("/metrics/ingest", post(api::ingest_metrics))
        .route("/metrics/summary", get(api::metrics_summary))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}

pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind).await?;
    serve_on(listener, AppState::new(config)).await
}

/// Serves on an already bound listener, which lets callers pick an ephemeral port.
pub async fn serve_on(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    info!(
        "Sightline server listening on http://{} (mode: {})",
        listener.local_addr()?,
        state.config.mode
    );
    axum::serve(listener, router(state)).await
}
