use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use sightline_core::metrics::MetricsSink;
use sightline_core::{MetricSample, MetricsSummary};
use std::time::Duration;

use crate::AppState;

pub const DEFAULT_SUMMARY_WINDOW_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_window")]
    pub duration: u64,
}

fn default_window() -> u64 {
    DEFAULT_SUMMARY_WINDOW_SECS
}

pub async fn ingest_metrics(
    State(state): State<AppState>,
    Json(sample): Json<MetricSample>,
) -> Json<Value> {
    state.metrics.record(sample);
    Json(json!({ "ok": true }))
}

pub async fn metrics_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Json<MetricsSummary> {
    Json(state.metrics.summary(Duration::from_secs(query.duration)))
}
