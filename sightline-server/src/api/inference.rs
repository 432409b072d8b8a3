use axum::Json;
use axum::body::Bytes;
use axum::extract::{Multipart, State};
use sightline_core::utils::now_ms;
use sightline_core::{FrameId, InferenceResult};
use tracing::debug;

use crate::{AppState, ServerError};

#[derive(Debug, Default)]
struct InferForm {
    image: Option<Bytes>,
    frame_id: Option<String>,
    capture_ts: Option<String>,
}

impl InferForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = InferForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                "image" => form.image = Some(field.bytes().await?),
                "frame_id" => form.frame_id = Some(field.text().await?),
                "capture_ts" => form.capture_ts = Some(field.text().await?),
                _ => {}
            }
        }
        Ok(form)
    }
}

/// Runs the server-side detector on one uploaded frame.
///
/// `recv_ts` is stamped once the image is decoded and `inference_ts` once detection returns.
pub async fn infer(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<InferenceResult>, ServerError> {
    let form = InferForm::read(multipart).await?;

    let image = form.image.ok_or(ServerError::MissingField("image"))?;
    let frame_id = form
        .frame_id
        .map(|raw| FrameId::parse(&raw))
        .ok_or(ServerError::MissingField("frame_id"))?;
    let capture_ts = form
        .capture_ts
        .ok_or(ServerError::MissingField("capture_ts"))?
        .trim()
        .parse::<i64>()
        .map_err(|e| ServerError::InvalidField {
            field: "capture_ts",
            reason: e.to_string(),
        })?;

    let detector = state.detector.clone();
    let (recv_ts, detections, inference_ts) =
        tokio::task::spawn_blocking(move || -> Result<_, image::ImageError> {
            let frame = image::load_from_memory(&image)?;
            let recv_ts = now_ms();
            let detections = detector.detect(&frame);
            Ok((recv_ts, detections, now_ms()))
        })
        .await??;

    debug!(
        frame = %frame_id,
        detections = detections.len(),
        took_ms = inference_ts - recv_ts,
        "Inference done"
    );

    let result = InferenceResult {
        frame_id,
        capture_ts,
        recv_ts,
        inference_ts,
        detections,
    };
    *state.latest.write().await = Some(result.clone());

    Ok(Json(result))
}
