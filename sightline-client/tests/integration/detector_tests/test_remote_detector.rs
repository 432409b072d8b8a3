use crate::utils::{FakeDetector, RecordingSink, TestServer, init_tracing, serve_router};
use anyhow::Result;
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::{Json, Router};
use axum::routing::post;
use image::{DynamicImage, Rgb, RgbImage};
use sightline_client::{Detector, DetectorError, FramePipeline, PipelineConfig, RemoteDetector};
use serde_json::{Value, json};
use sightline_core::{FrameId, FrameMeta};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn frame_with_block() -> Arc<DynamicImage> {
    let mut img = RgbImage::from_pixel(320, 240, Rgb([0, 0, 0]));
    for y in 60..180 {
        for x in 80..240 {
            img.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    Arc::new(DynamicImage::ImageRgb8(img))
}

#[tokio::test]
async fn test_remote_detection_round_trip() -> Result<()> {
    init_tracing();
    let server = TestServer::start().await?;
    let detector = RemoteDetector::new(&server.base_url(), 90)?;

    let inference = detector
        .infer(frame_with_block(), FrameMeta::new(3, 1_690_000_000_000))
        .await?;

    assert_eq!(inference.result.frame_id, FrameId::Seq(3));
    assert_eq!(inference.result.capture_ts, 1_690_000_000_000);
    assert!(inference.result.inference_ts >= inference.result.recv_ts);
    assert_eq!(inference.result.detections.len(), 1);
    assert!(inference.bytes_uplink > 0);
    assert!(inference.bytes_downlink > 0);

    // the server remembers it as the latest result
    let latest = server.state.latest.read().await.clone();
    assert_eq!(latest.map(|r| r.frame_id), Some(FrameId::Seq(3)));
    Ok(())
}

#[tokio::test]
async fn test_http_failure_is_an_error() -> Result<()> {
    init_tracing();
    let router = Router::new().route(
        "/infer",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model warming up") }),
    );
    let (base_url, _server) = serve_router(router).await?;
    let detector = RemoteDetector::new(&base_url, 80)?;

    let err = detector
        .infer(frame_with_block(), FrameMeta::new(1, 0))
        .await
        .unwrap_err();
    match err {
        DetectorError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "model warming up");
        }
        other => panic!("unexpected error: {}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_malformed_response_is_an_error() -> Result<()> {
    init_tracing();
    let router = Router::new().route("/infer", post(|| async { "{\"frame_id\": " }));
    let (base_url, _server) = serve_router(router).await?;
    let detector = RemoteDetector::new(&base_url, 80)?;

    let err = detector
        .infer(frame_with_block(), FrameMeta::new(1, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, DetectorError::Decode(_)));
    Ok(())
}

#[tokio::test]
async fn test_pipeline_recovers_from_failing_endpoint() -> Result<()> {
    init_tracing();
    let router = Router::new().route(
        "/infer",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let (base_url, _server) = serve_router(router).await?;
    let sink = RecordingSink::default();
    let (_, frames) = watch::channel(Some(frame_with_block()));
    let (_, meta) = watch::channel(None);

    let mut handle = FramePipeline::new(
        Arc::new(RemoteDetector::new(&base_url, 80)?),
        Arc::new(sink.clone()),
        frames,
        meta,
    )
    .with_config(PipelineConfig { tick: Duration::from_millis(20) })
    .spawn();

    tokio::time::sleep(Duration::from_millis(300)).await;
    let stats = handle.stop().await.expect("pipeline stats");

    // every failure clears the slot, so later ticks keep submitting
    assert!(stats.submitted >= 2, "stats: {:?}", stats);
    assert!(stats.failed >= 1);
    assert_eq!(stats.completed, 0);
    assert!(sink.samples().is_empty());
    assert!(handle.overlay().borrow().is_none());
    Ok(())
}

/// Answers like a backend that echoes the form field back as a JSON string.
async fn echo_frame_id_as_string(mut form: Multipart) -> Json<Value> {
    let mut frame_id = String::new();
    let mut capture_ts = 0i64;
    while let Some(field) = form.next_field().await.unwrap() {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("frame_id") => frame_id = field.text().await.unwrap(),
            Some("capture_ts") => capture_ts = field.text().await.unwrap().parse().unwrap(),
            _ => {
                field.bytes().await.unwrap();
            }
        }
    }
    Json(json!({
        "frame_id": frame_id,
        "capture_ts": capture_ts,
        "recv_ts": capture_ts,
        "inference_ts": capture_ts,
        "detections": [],
    }))
}

#[tokio::test]
async fn test_pipeline_accepts_ids_echoed_as_strings() -> Result<()> {
    init_tracing();
    let router = Router::new().route("/infer", post(echo_frame_id_as_string));
    let (base_url, _server) = serve_router(router).await?;
    let sink = RecordingSink::default();
    let (_, frames) = watch::channel(Some(frame_with_block()));
    let (_, meta) = watch::channel(None);

    let mut handle = FramePipeline::new(
        Arc::new(RemoteDetector::new(&base_url, 80)?),
        Arc::new(sink.clone()),
        frames,
        meta,
    )
    .with_config(PipelineConfig { tick: Duration::from_millis(20) })
    .spawn();

    tokio::time::sleep(Duration::from_millis(300)).await;
    let overlay = handle.overlay().borrow().clone();
    let stats = handle.stop().await.expect("pipeline stats");

    assert!(stats.completed >= 1, "stats: {:?}", stats);
    assert_eq!(stats.ignored, 0);
    assert!(!sink.samples().is_empty());
    assert!(matches!(overlay.map(|r| r.frame_id), Some(FrameId::Seq(_))));
    Ok(())
}

#[tokio::test]
async fn test_fake_and_remote_share_the_contract() -> Result<()> {
    init_tracing();
    let server = TestServer::start().await?;
    let detectors: Vec<Arc<dyn Detector>> = vec![
        Arc::new(FakeDetector::new(Duration::ZERO)),
        Arc::new(RemoteDetector::new(&server.base_url(), 80)?),
    ];

    for detector in detectors {
        let meta = FrameMeta::new(FrameId::Tag("cam-1:5".to_owned()), 10);
        let inference = detector.infer(frame_with_block(), meta).await?;
        assert_eq!(
            inference.result.frame_id,
            FrameId::Tag("cam-1:5".to_owned()),
            "{}",
            detector.name()
        );
    }
    Ok(())
}
