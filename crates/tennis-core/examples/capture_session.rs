//! Example: Capture a few hundred frames and write a plain export
//!
//! Connects to the first sensor in range (or the one named by the first
//! argument), captures until Ctrl-C or 500 frames, then writes
//! `dataset-example.json`.
//!
//! Run with: `cargo run --example capture_session -- "Tennis Sensor"`

use tennis_core::store::{self, DatasetStore};
use tennis_core::{CaptureOptions, Device, run_capture};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let device = match std::env::args().nth(1) {
        Some(identifier) => Device::connect(&identifier).await?,
        None => Device::connect_first().await?,
    };
    println!("Connected to {}", device.name().unwrap_or(device.address()));

    let shared = store::shared(DatasetStore::new());
    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctrl_c.cancel();
    });

    let summary = run_capture(
        &device,
        &shared,
        CaptureOptions::new().max_frames(500),
        shutdown,
        None,
    )
    .await?;

    println!(
        "Captured {} frames ({} rejected) in {} session(s), stopped: {:?}",
        summary.frames, summary.rejected, summary.sessions_opened, summary.stop_reason
    );

    let json = store::lock(&shared).export_and_clear()?;
    std::fs::write("dataset-example.json", json)?;
    println!("Wrote dataset-example.json");

    device.disconnect().await?;
    Ok(())
}
