use crate::utils::{FakeDetector, RecordingSink, frame_of_width, init_tracing};
use sightline_client::pipeline::Clock;
use sightline_client::{FramePipeline, PipelineConfig};
use sightline_core::{FrameId, FrameMeta};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Milliseconds on the paused Tokio clock, starting at 1000.
fn paused_clock() -> Clock {
    let start = tokio::time::Instant::now();
    Arc::new(move || 1000 + start.elapsed().as_millis() as i64)
}

fn config(tick: Duration) -> PipelineConfig {
    PipelineConfig { tick }
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_skipped_while_a_request_is_outstanding() {
    init_tracing();
    let detector = FakeDetector::new(Duration::from_millis(80)).with_stamps(1005, 1020);
    let sink = RecordingSink::default();
    let (_frame_tx, frames) = watch::channel(Some(frame_of_width(1)));
    let (_meta_tx, meta) = watch::channel(None);

    let mut handle = FramePipeline::new(
        Arc::new(detector.clone()),
        Arc::new(sink.clone()),
        frames,
        meta,
    )
    .with_config(config(Duration::from_micros(16_667)))
    .with_clock(paused_clock())
    .spawn();

    let mut overlay = handle.overlay();
    overlay.changed().await.unwrap();
    let result = overlay.borrow().clone().unwrap();
    assert_eq!(result.frame_id, FrameId::Seq(1));
    assert_eq!(result.capture_ts, 1000);
    assert_eq!(result.recv_ts, 1005);
    assert_eq!(result.inference_ts, 1020);

    let samples = sink.samples();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].ts, 1080);
    assert_eq!(samples[0].e2e_latency_ms, 80.0);
    assert_eq!(samples[0].bytes_uplink, 1000);
    assert_eq!(samples[0].bytes_downlink, 200);

    // the tick after the result submits a fresh frame
    tokio::time::sleep(Duration::from_millis(10)).await;
    let stats = handle.stop().await.unwrap();

    assert_eq!(stats.skipped, 4, "ticks near 1016, 1033, 1050 and 1066 are skipped");
    assert_eq!(stats.submitted, 2);
    assert_eq!(stats.completed, 1);

    let calls = detector.calls();
    assert_eq!(calls[0].0, FrameMeta::new(1, 1000));
    assert_eq!(calls[1].0.frame_id, FrameId::Seq(2));
}

#[tokio::test(start_paused = true)]
async fn test_newest_frame_wins_after_busy_period() {
    init_tracing();
    let detector = FakeDetector::new(Duration::from_millis(50));
    let (frame_tx, frames) = watch::channel(Some(frame_of_width(1)));
    let (_meta_tx, meta) = watch::channel(None);

    let mut handle = FramePipeline::new(
        Arc::new(detector.clone()),
        Arc::new(RecordingSink::default()),
        frames,
        meta,
    )
    .with_config(config(Duration::from_millis(10)))
    .with_clock(paused_clock())
    .spawn();

    tokio::time::sleep(Duration::from_millis(15)).await;
    frame_tx.send_replace(Some(frame_of_width(2)));
    tokio::time::sleep(Duration::from_millis(10)).await;
    frame_tx.send_replace(Some(frame_of_width(3)));
    tokio::time::sleep(Duration::from_millis(40)).await;
    handle.stop().await;

    let widths: Vec<u32> = detector.calls().into_iter().map(|(_, w)| w).collect();
    assert_eq!(widths, vec![1, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_capture_time_comes_from_frame_metadata() {
    init_tracing();
    let detector = FakeDetector::new(Duration::from_millis(30));
    let sink = RecordingSink::default();
    let (_frame_tx, frames) = watch::channel(Some(frame_of_width(4)));
    let (_meta_tx, meta) = watch::channel(Some(FrameMeta::new(77, 940)));

    let handle = FramePipeline::new(
        Arc::new(detector.clone()),
        Arc::new(sink.clone()),
        frames,
        meta,
    )
    .with_config(config(Duration::from_millis(100)))
    .with_clock(paused_clock())
    .spawn();

    let mut overlay = handle.overlay();
    overlay.changed().await.unwrap();

    assert_eq!(detector.calls()[0].0.capture_ts, 940);
    // result at 1030 for a frame captured at 940
    assert_eq!(sink.samples()[0].e2e_latency_ms, 90.0);
}

#[tokio::test(start_paused = true)]
async fn test_nothing_is_submitted_before_the_first_frame() {
    init_tracing();
    let detector = FakeDetector::new(Duration::from_millis(5));
    let (frame_tx, frames) = watch::channel(None);
    let (_meta_tx, meta) = watch::channel(None);

    let mut handle = FramePipeline::new(
        Arc::new(detector.clone()),
        Arc::new(RecordingSink::default()),
        frames,
        meta,
    )
    .with_config(config(Duration::from_millis(10)))
    .spawn();

    tokio::time::sleep(Duration::from_millis(55)).await;
    assert!(detector.calls().is_empty());

    frame_tx.send_replace(Some(frame_of_width(8)));
    tokio::time::sleep(Duration::from_millis(20)).await;
    let stats = handle.stop().await.unwrap();
    assert!(stats.submitted >= 1);
    assert_eq!(detector.calls()[0].1, 8);
}

#[tokio::test(start_paused = true)]
async fn test_stop_discards_in_flight_request() {
    init_tracing();
    let detector = FakeDetector::new(Duration::from_secs(1));
    let sink = RecordingSink::default();
    let (_frame_tx, frames) = watch::channel(Some(frame_of_width(1)));
    let (_meta_tx, meta) = watch::channel(None);

    let mut handle = FramePipeline::new(
        Arc::new(detector.clone()),
        Arc::new(sink.clone()),
        frames,
        meta,
    )
    .with_config(config(Duration::from_millis(10)))
    .spawn();
    let overlay = handle.overlay();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let stats = handle.stop().await.unwrap();
    assert_eq!(stats.submitted, 1);
    assert_eq!(stats.completed, 0);
    assert!(handle.stop().await.is_none());

    // the aborted request never lands, even after its delay has passed
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(overlay.borrow().is_none());
    assert!(sink.samples().is_empty());
}
