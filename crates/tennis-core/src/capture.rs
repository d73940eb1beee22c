//! Capture loop: notifications in, frames stored.
//!
//! One buffer is handled at a time: decode, segment, store, notify
//! listeners. The store lock is held for exactly one frame, so a host can
//! clear or export between frames while capture is running.
//!
//! The loop ends when the notification stream ends (the link dropped or the
//! source was disconnected), when the shutdown token is cancelled, or when
//! the frame limit is reached. Malformed buffers are logged and counted but
//! never stop the loop.

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::segment::SessionKey;
use crate::store::{SharedStore, lock};
use crate::traits::FrameSource;

/// Options for a capture run.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Stop after this many frames have been stored.
    pub max_frames: Option<usize>,
}

impl CaptureOptions {
    /// Create options with no frame limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after `count` stored frames.
    #[must_use]
    pub fn max_frames(mut self, count: usize) -> Self {
        self.max_frames = Some(count);
        self
    }
}

/// Why a capture run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The notification stream ended.
    Disconnected,
    /// The shutdown token was cancelled.
    Cancelled,
    /// The configured frame limit was reached.
    FrameLimit,
}

/// Totals for one capture run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureSummary {
    /// Frames decoded and stored.
    pub frames: usize,
    /// Buffers rejected as malformed.
    pub rejected: usize,
    /// Sessions opened during the run.
    pub sessions_opened: usize,
    pub stop_reason: StopReason,
    /// Link state when the run ended.
    pub connected: bool,
}

/// Notable things that happen during capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// A frame opened a new session.
    SessionOpened(SessionKey),
    /// A buffer could not be decoded.
    Rejected { actual: usize },
}

/// Run the capture loop on the current task.
///
/// `events`, when given, receives [`CaptureEvent`]s; a closed receiver is
/// ignored.
///
/// # Errors
///
/// Returns an error only if the subscription cannot be started.
#[tracing::instrument(level = "info", skip_all, fields(address = %source.address()))]
pub async fn run_capture<S>(
    source: &S,
    store: &SharedStore,
    options: CaptureOptions,
    shutdown: CancellationToken,
    events: Option<mpsc::UnboundedSender<CaptureEvent>>,
) -> Result<CaptureSummary>
where
    S: FrameSource + ?Sized,
{
    let mut stream = source.subscribe().await?;
    info!(max_frames = ?options.max_frames, "Capture started");

    let mut frames = 0usize;
    let mut rejected = 0usize;
    let mut sessions_opened = 0usize;

    let emit = |event: CaptureEvent| {
        if let Some(tx) = &events {
            let _ = tx.send(event);
        }
    };

    let stop_reason = loop {
        if options.max_frames.is_some_and(|max| frames >= max) {
            break StopReason::FrameLimit;
        }

        let next = tokio::select! {
            biased;
            next = stream.next() => next,
            _ = shutdown.cancelled() => break StopReason::Cancelled,
        };

        let Some(buffer) = next else {
            break StopReason::Disconnected;
        };

        let result = lock(store).ingest_bytes(&buffer);
        match result {
            Ok(ingested) => {
                frames += 1;
                if ingested.opened_session {
                    sessions_opened += 1;
                    emit(CaptureEvent::SessionOpened(ingested.session));
                }
            }
            Err(Error::MalformedFrame { expected, actual }) => {
                rejected += 1;
                warn!(expected, actual, "Rejected malformed frame");
                emit(CaptureEvent::Rejected { actual });
            }
            Err(e) => {
                rejected += 1;
                warn!(error = %e, "Rejected frame");
            }
        }
    };

    let connected = source.is_connected().await;
    info!(
        frames,
        rejected,
        sessions_opened,
        ?stop_reason,
        connected,
        "Capture ended"
    );

    Ok(CaptureSummary {
        frames,
        rejected,
        sessions_opened,
        stop_reason,
        connected,
    })
}

/// A capture loop running on its own task.
pub struct CaptureHandle {
    handle: JoinHandle<Result<CaptureSummary>>,
    shutdown: CancellationToken,
    events: mpsc::UnboundedReceiver<CaptureEvent>,
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("finished", &self.handle.is_finished())
            .field("stopping", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl CaptureHandle {
    /// Spawn the capture loop.
    pub fn spawn(source: Arc<dyn FrameSource>, store: SharedStore, options: CaptureOptions) -> Self {
        let shutdown = CancellationToken::new();
        let (tx, events) = mpsc::unbounded_channel();
        let token = shutdown.clone();

        let handle = tokio::spawn(async move {
            run_capture(source.as_ref(), &store, options, token, Some(tx)).await
        });

        Self {
            handle,
            shutdown,
            events,
        }
    }

    /// Ask the loop to stop after the frame in progress.
    pub fn stop(&self) {
        debug!("Stopping capture");
        self.shutdown.cancel();
    }

    /// Whether the task has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Receive the next capture event.
    ///
    /// Returns `None` once the loop has ended and all events were taken.
    pub async fn next_event(&mut self) -> Option<CaptureEvent> {
        self.events.recv().await
    }

    /// Wait for the loop to finish.
    pub async fn join(self) -> Result<CaptureSummary> {
        self.handle
            .await
            .map_err(|e| Error::connection_failed(None, format!("capture task failed: {e}")))?
    }
}
