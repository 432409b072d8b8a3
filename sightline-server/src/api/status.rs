use axum::Json;
use axum::extract::State;
use serde::Serialize;
use sightline_core::InferenceResult;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub mode: &'static str,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        mode: state.config.mode.as_str(),
    })
}

/// The last `/infer` answer, or a placeholder with `frame_id = -1` before the first one.
pub async fn latest(State(state): State<AppState>) -> Json<InferenceResult> {
    let latest = state.latest.read().await.clone();
    Json(latest.unwrap_or_else(InferenceResult::placeholder))
}
