//! End-to-end capture tests using the mock source.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tennis_core::export::{EnvelopeOptions, decode_plain};
use tennis_core::store::{self, DatasetStore};
use tennis_core::{
    CaptureHandle, CaptureOptions, Clock, FrameSource, MockSource, SensorFrame, StopReason,
};

fn frame(pos: i32) -> SensorFrame {
    SensorFrame::new([pos as f64 * 0.1, 0.0, 9.81, 0.0, 0.0, 0.0], pos)
}

fn stepping_clock() -> Arc<dyn Clock> {
    let now = Arc::new(AtomicU64::new(1_700_000_000_000));
    Arc::new(move || now.fetch_add(10, Ordering::SeqCst))
}

#[tokio::test]
async fn capture_segments_two_sessions_and_drops_last() {
    let source = Arc::new(MockSource::new("Tennis Sensor"));
    source.push_frames([5, 6, 7, 2, 3].map(frame));
    source.simulate_disconnect();

    let shared = store::shared(DatasetStore::with_clock(stepping_clock()));
    let handle = CaptureHandle::spawn(source.clone(), shared.clone(), CaptureOptions::new());
    let summary = handle.join().await.unwrap();

    assert_eq!(summary.frames, 5);
    assert_eq!(summary.stop_reason, StopReason::Disconnected);
    assert!(!summary.connected);
    assert!(!source.is_connected().await);

    let mut store = store::lock(&shared);
    let sizes: Vec<usize> = store.session_sizes().into_iter().map(|(_, n)| n).collect();
    assert_eq!(sizes, vec![3, 2]);

    store.clear_active_session();
    let remaining: Vec<i32> = store.history().iter().map(|f| f.pos).collect();
    assert_eq!(remaining, vec![5, 6, 7]);
}

#[tokio::test]
async fn capture_events_report_session_boundaries() {
    let source = Arc::new(MockSource::new("Tennis Sensor"));
    source.push_frames([1, 2, 0, 1, 0].map(frame));
    source.simulate_disconnect();

    let shared = store::shared(DatasetStore::with_clock(stepping_clock()));
    let mut handle = CaptureHandle::spawn(source, shared.clone(), CaptureOptions::new());

    let mut opened = Vec::new();
    while let Some(event) = handle.next_event().await {
        if let tennis_core::CaptureEvent::SessionOpened(key) = event {
            opened.push(key);
        }
    }
    let summary = handle.join().await.unwrap();

    assert_eq!(opened.len(), 3);
    assert_eq!(summary.sessions_opened, 3);
    assert!(opened.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(store::lock(&shared).session_count(), 3);
}

#[tokio::test]
async fn export_after_capture_round_trips() {
    let source = MockSource::new("Tennis Sensor");
    let sent: Vec<SensorFrame> = (10..20).map(frame).collect();
    source.push_frames(sent.clone());
    source.simulate_disconnect();

    let shared = store::shared(DatasetStore::new());
    tennis_core::run_capture(
        &source,
        &shared,
        CaptureOptions::new(),
        tokio_util::sync::CancellationToken::new(),
        None,
    )
    .await
    .unwrap();

    let mut store = store::lock(&shared);
    let signed = store
        .signed_export(&EnvelopeOptions::default(), "secret")
        .unwrap();
    assert_eq!(signed.envelope.len(), 10);
    assert!(signed.verify("secret").unwrap());

    let plain = store.export_and_clear().unwrap();
    assert_eq!(decode_plain(&plain).unwrap(), sent);
    assert!(store.is_empty());
}

#[tokio::test]
async fn clear_between_frames_starts_fresh_session() {
    let source = Arc::new(MockSource::new("Tennis Sensor"));
    let shared = store::shared(DatasetStore::with_clock(stepping_clock()));
    let handle = CaptureHandle::spawn(source.clone(), shared.clone(), CaptureOptions::new().max_frames(2));

    source.push_frame(frame(5));
    while store::lock(&shared).is_empty() {
        tokio::task::yield_now().await;
    }
    store::lock(&shared).clear_all();
    source.push_frame(frame(6));

    let summary = handle.join().await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::FrameLimit);

    let store = store::lock(&shared);
    assert_eq!(store.len(), 1);
    assert_eq!(store.session_count(), 1);
    assert_eq!(store.history()[0].pos, 6);
}
