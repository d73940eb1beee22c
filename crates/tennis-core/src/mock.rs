//! Mock frame source for testing.
//!
//! This module provides a channel-driven source that can be used for unit
//! testing and dry runs without requiring actual BLE hardware.
//!
//! The [`MockSource`] implements the [`FrameSource`] trait, allowing it to be
//! used interchangeably with a real [`Device`](crate::device::Device) in
//! generic code.
//!
//! # Features
//!
//! - **Scripted notifications**: push frames or raw buffers at any time
//! - **Disconnect simulation**: end the stream as a dropped link would
//! - **Failure injection**: make `subscribe` fail

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use futures::stream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tennis_types::SensorFrame;

use crate::error::{Error, Result};
use crate::traits::{FrameSource, NotificationStream};

/// A mock notification source.
///
/// Buffers pushed before [`MockSource::simulate_disconnect`] are still
/// delivered; the stream ends once they are drained.
///
/// # Example
///
/// ```
/// use futures::StreamExt;
/// use tennis_core::{FrameSource, MockSource, SensorFrame};
///
/// #[tokio::main]
/// async fn main() {
///     let source = MockSource::new("Tennis Sensor");
///     source.push_frame(SensorFrame::new([0.0; 6], 1));
///     source.simulate_disconnect();
///
///     let buffers: Vec<_> = source.subscribe().await.unwrap().collect().await;
///     assert_eq!(buffers.len(), 1);
///     assert!(!source.is_connected().await);
/// }
/// ```
pub struct MockSource {
    name: String,
    address: String,
    connected: AtomicBool,
    lost: CancellationToken,
    sender: Mutex<Option<UnboundedSender<Vec<u8>>>>,
    receiver: Mutex<Option<UnboundedReceiver<Vec<u8>>>>,
    should_fail: AtomicBool,
    subscribe_count: AtomicU32,
}

impl std::fmt::Debug for MockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSource")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockSource {
    /// Create a connected mock source.
    pub fn new(name: &str) -> Self {
        Self::with_address(name, "MOCK-000001")
    }

    /// Create a connected mock source with a specific address.
    pub fn with_address(name: &str, address: &str) -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            name: name.to_string(),
            address: address.to_string(),
            connected: AtomicBool::new(true),
            lost: CancellationToken::new(),
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
            should_fail: AtomicBool::new(false),
            subscribe_count: AtomicU32::new(0),
        }
    }

    /// Queue a raw notification buffer.
    ///
    /// Returns `false` if the source is already disconnected.
    pub fn push_bytes(&self, data: impl Into<Vec<u8>>) -> bool {
        let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(sender) => sender.send(data.into()).is_ok(),
            None => false,
        }
    }

    /// Queue an encoded frame.
    pub fn push_frame(&self, frame: SensorFrame) -> bool {
        self.push_bytes(frame.to_bytes().to_vec())
    }

    /// Queue several frames in order.
    pub fn push_frames<I>(&self, frames: I) -> usize
    where
        I: IntoIterator<Item = SensorFrame>,
    {
        frames
            .into_iter()
            .take_while(|frame| self.push_frame(*frame))
            .count()
    }

    /// Drop the link as the device would.
    ///
    /// Already queued buffers are still delivered.
    pub fn simulate_disconnect(&self) {
        debug!(address = %self.address, "Simulating disconnect");
        self.connected.store(false, Ordering::SeqCst);
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.lost.cancel();
    }

    /// Make subsequent `subscribe` calls fail.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `subscribe` calls.
    pub fn subscribe_count(&self) -> u32 {
        self.subscribe_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSource for MockSource {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn address(&self) -> &str {
        &self.address
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn disconnect_signal(&self) -> CancellationToken {
        self.lost.clone()
    }

    async fn disconnect(&self) -> Result<()> {
        self.simulate_disconnect();
        Ok(())
    }

    async fn subscribe(&self) -> Result<NotificationStream> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(Error::connection_failed(
                Some(self.address.clone()),
                "mock subscribe failure",
            ));
        }

        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| {
                Error::connection_failed(Some(self.address.clone()), "already subscribed")
            })?;

        self.subscribe_count.fetch_add(1, Ordering::SeqCst);

        let stream = stream::unfold(receiver, |mut rx| async move {
            rx.recv().await.map(|data| (data, rx))
        });
        Ok(Box::pin(stream))
    }
}
