//! Trait abstractions for frame sources.
//!
//! This module provides the [`FrameSource`] trait that abstracts over the
//! real Bluetooth link and the mock source used in tests.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Stream of raw notification buffers.
///
/// The stream ends when the link drops or the source is disconnected.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// Trait abstracting a link that delivers sensor notifications.
///
/// Buffers are handed over undecoded; decoding belongs to the store.
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
/// use tennis_core::{FrameSource, Result};
///
/// async fn count_notifications<S: FrameSource>(source: &S) -> Result<usize> {
///     let mut stream = source.subscribe().await?;
///     let mut n = 0;
///     while stream.next().await.is_some() {
///         n += 1;
///     }
///     Ok(n)
/// }
/// ```
#[async_trait]
pub trait FrameSource: Send + Sync {
    // --- Identity ---

    /// Get the advertised name, if available.
    fn name(&self) -> Option<&str>;

    /// Get the device address or identifier.
    ///
    /// On Linux/Windows this is typically the MAC address.
    /// On macOS this is a UUID since MAC addresses are not exposed.
    fn address(&self) -> &str;

    // --- Connection ---

    /// Check if the link is up.
    async fn is_connected(&self) -> bool;

    /// Token cancelled once the link is lost or closed.
    fn disconnect_signal(&self) -> CancellationToken;

    /// Close the link.
    async fn disconnect(&self) -> Result<()>;

    // --- Data ---

    /// Start notifications and return the buffer stream.
    async fn subscribe(&self) -> Result<NotificationStream>;
}
