//! Hardware integration tests for tennis-core
//!
//! These tests require a powered collector board in range and should be run with:
//! ```text
//! cargo test --package tennis-core --test hardware_tests -- --ignored --nocapture
//! ```
//!
//! Set `TENNIS_DEVICE` to a name, address or peripheral ID to pick a board;
//! otherwise the first sensor found is used.

use std::env;
use std::time::Duration;

use tennis_core::scan::{ScanOptions, scan_for_sensors};
use tennis_core::store::{self, DatasetStore};
use tennis_core::{CaptureOptions, Device, FrameSource, StopReason, run_capture};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Default timeout for BLE operations
const BLE_TIMEOUT: Duration = Duration::from_secs(30);

fn device_identifier() -> Option<String> {
    env::var("TENNIS_DEVICE").ok().filter(|s| !s.is_empty())
}

async fn connect() -> Device {
    let result = match device_identifier() {
        Some(id) => timeout(BLE_TIMEOUT, Device::connect(&id)).await,
        None => timeout(BLE_TIMEOUT, Device::connect_first()).await,
    };
    result
        .expect("connect timed out")
        .expect("failed to connect")
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_scan_finds_sensor() {
    let options = ScanOptions::default().duration_secs(10);
    let sensors = timeout(BLE_TIMEOUT, scan_for_sensors(options))
        .await
        .expect("scan timed out")
        .expect("scan failed");

    for sensor in &sensors {
        println!(
            "  {} ({}) nus={}",
            sensor.name.as_deref().unwrap_or("Unknown"),
            sensor.identifier,
            sensor.advertises_nus
        );
    }
    assert!(!sensors.is_empty(), "no sensors in range");
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_capture_frames() {
    let device = connect().await;
    assert!(device.is_connected().await);

    let shared = store::shared(DatasetStore::new());
    let summary = timeout(
        BLE_TIMEOUT,
        run_capture(
            &device,
            &shared,
            CaptureOptions::new().max_frames(50),
            CancellationToken::new(),
            None,
        ),
    )
    .await
    .expect("capture timed out")
    .expect("capture failed");

    println!("{summary:?}");
    assert_eq!(summary.stop_reason, StopReason::FrameLimit);
    assert_eq!(store::lock(&shared).len(), 50);

    device.disconnect().await.unwrap();
    assert!(device.disconnect_signal().is_cancelled());
}
