//! Capture core for BLE motion sensors.
//!
//! This crate receives frames from a tennis-swing collector board over the
//! Nordic UART Service, groups them into capture sessions, keeps them in
//! memory and encodes them for export or upload to the Edge Impulse
//! ingestion service.
//!
//! # Features
//!
//! - **Device discovery**: Scan for nearby sensors via BLE
//! - **Streaming**: Subscribe to the TX characteristic as a stream of buffers
//! - **Session segmentation**: Split the stream wherever the sample counter drops
//! - **Dataset store**: Ordered in-memory history with per-session grouping
//! - **Export**: Plain JSON dump and HMAC-signed ingestion envelope
//! - **Upload**: POST signed envelopes to the ingestion API
//!
//! # Platform Differences
//!
//! - **macOS**: Devices are identified by a UUID assigned by CoreBluetooth. This UUID
//!   is stable for a given device on a given Mac, but differs between Macs.
//! - **Linux/Windows**: Devices are identified by their Bluetooth MAC address
//!   (e.g., `AA:BB:CC:DD:EE:FF`).
//!
//! # Quick Start
//!
//! ```no_run
//! use tennis_core::{CaptureOptions, Device, DatasetStore, run_capture, store};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let device = Device::connect_first().await?;
//!     let store = store::shared(DatasetStore::new());
//!
//!     let summary = run_capture(
//!         &device,
//!         &store,
//!         CaptureOptions::new().max_frames(500),
//!         CancellationToken::new(),
//!         None,
//!     )
//!     .await?;
//!     println!("{} frames in {} sessions", summary.frames, summary.sessions_opened);
//!
//!     let json = store::lock(&store).export_and_clear()?;
//!     std::fs::write("dataset.json", json)?;
//!     device.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod device;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod mock;
pub mod scan;
pub mod segment;
pub mod store;
pub mod traits;
pub mod util;

pub use tennis_types::uuid as uuids;
pub use tennis_types::{CHANNEL_COUNT, FRAME_LEN, SensorFrame};

pub use capture::{
    CaptureEvent, CaptureHandle, CaptureOptions, CaptureSummary, StopReason, run_capture,
};
pub use device::{ConnectionConfig, Device};
pub use error::{DeviceNotFoundReason, Error, Result};
pub use export::{Envelope, EnvelopeOptions, SignedEnvelope, encode_plain};
pub use ingestion::{DatasetCategory, IngestionClient, UploadReceipt};
pub use mock::MockSource;
pub use scan::{DiscoveredSensor, ScanOptions, scan_for_sensors};
pub use segment::{Clock, SessionKey, SessionSegmenter, SystemClock};
pub use store::{DatasetStore, Ingested, ListenerId, SharedStore, StoreStats};
pub use traits::{FrameSource, NotificationStream};
