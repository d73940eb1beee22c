//! In-memory dataset store.
//!
//! [`DatasetStore`] keeps two views of the retained frames:
//!
//! - `history`: every frame in arrival order
//! - `sessions`: frames grouped by [`SessionKey`]
//!
//! The views always agree: `history` equals the concatenation of every
//! session's frames taken in ascending key order. Mutations rebuild or
//! clear both views together.
//!
//! The store is volatile. Nothing is persisted; dropping it discards the
//! data.
//!
//! # Example
//!
//! ```
//! use tennis_core::store::DatasetStore;
//! use tennis_core::SensorFrame;
//!
//! let mut store = DatasetStore::new();
//! for pos in [5, 6, 7, 2, 3] {
//!     store.ingest(SensorFrame::new([0.0; 6], pos));
//! }
//! assert_eq!(store.session_count(), 2);
//! assert_eq!(store.len(), 5);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info};

use tennis_types::SensorFrame;

use crate::error::Result;
use crate::export::{self, EnvelopeOptions, SignedEnvelope};
use crate::segment::{Boundary, Clock, SessionKey, SessionSegmenter};

/// Callback invoked for every ingested frame.
pub type Listener = Box<dyn FnMut(&SensorFrame) + Send>;

/// Handle returned by [`DatasetStore::register_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Store shared between the capture task and the host.
///
/// All mutating operations go through this one lock.
pub type SharedStore = Arc<Mutex<DatasetStore>>;

/// Wrap a store for sharing across tasks.
pub fn shared(store: DatasetStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Lock a shared store, recovering the data if a listener panicked.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, DatasetStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of ingesting one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    /// Session the frame was appended to.
    pub session: SessionKey,
    /// Whether this frame opened that session.
    pub opened_session: bool,
}

/// Summary counts for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Total retained frames.
    pub points: usize,
    /// Number of sessions.
    pub sessions: usize,
    /// Session currently receiving frames.
    pub active_session: Option<SessionKey>,
}

/// Owns the retained frames and their session grouping.
pub struct DatasetStore {
    history: Vec<SensorFrame>,
    sessions: BTreeMap<SessionKey, Vec<SensorFrame>>,
    segmenter: SessionSegmenter,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl std::fmt::Debug for DatasetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetStore")
            .field("points", &self.history.len())
            .field("sessions", &self.sessions.len())
            .field("segmenter", &self.segmenter)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for DatasetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetStore {
    /// Create an empty store using the system clock for session keys.
    pub fn new() -> Self {
        Self::with_segmenter(SessionSegmenter::new())
    }

    /// Create an empty store with a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_segmenter(SessionSegmenter::with_clock(clock))
    }

    fn with_segmenter(segmenter: SessionSegmenter) -> Self {
        Self {
            history: Vec::new(),
            sessions: BTreeMap::new(),
            segmenter,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    // --- Ingestion ---

    /// Append a frame, opening a session first if the counter dropped.
    ///
    /// Listeners are called synchronously, in registration order, after the
    /// frame has been stored.
    pub fn ingest(&mut self, frame: SensorFrame) -> Ingested {
        let boundary = self.segmenter.observe(frame.pos);
        let opened_session = boundary.is_opened();
        let session = match boundary {
            Boundary::Opened(key) => {
                self.sessions.insert(key.clone(), Vec::new());
                key
            }
            Boundary::Continue(key) => key,
        };

        self.sessions
            .entry(session.clone())
            .or_default()
            .push(frame);
        self.history.push(frame);

        for (_, listener) in &mut self.listeners {
            listener(&frame);
        }

        Ingested {
            session,
            opened_session,
        }
    }

    /// Decode a raw notification and ingest it.
    ///
    /// A buffer that does not decode leaves the store untouched.
    pub fn ingest_bytes(&mut self, data: &[u8]) -> Result<Ingested> {
        let frame = SensorFrame::from_bytes(data)?;
        Ok(self.ingest(frame))
    }

    // --- Mutations ---

    /// Drop every frame and session.
    ///
    /// The next frame opens a new session regardless of its counter.
    pub fn clear_all(&mut self) {
        info!(
            points = self.history.len(),
            sessions = self.sessions.len(),
            "Clearing dataset"
        );
        self.history.clear();
        self.sessions.clear();
        self.segmenter.reset();
    }

    /// Remove the active session and rebuild the history from the rest.
    ///
    /// The last observed counter is kept, so the next frame is still compared
    /// against it. Returns the removed key, or `None` when no session was
    /// active.
    pub fn clear_active_session(&mut self) -> Option<SessionKey> {
        let key = self.segmenter.deactivate()?;
        let removed = self.sessions.remove(&key).map_or(0, |frames| frames.len());
        self.history = self.sessions.values().flatten().copied().collect();
        info!(session = %key, removed, remaining = self.history.len(), "Removed active session");
        Some(key)
    }

    // --- Listeners ---

    /// Register a callback for every ingested frame.
    ///
    /// The same closure logic may be registered more than once; each
    /// registration is called.
    pub fn register_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&SensorFrame) + Send + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        debug!(listener = id.0, total = self.listeners.len(), "Registered listener");
        id
    }

    /// Remove a previously registered callback.
    ///
    /// Returns `false` if the id is unknown or already removed.
    pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // --- Accessors ---

    /// All retained frames in arrival order.
    pub fn history(&self) -> &[SensorFrame] {
        &self.history
    }

    /// Number of retained frames.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether no frames are retained.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Number of sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Session keys with their sizes, in ascending key order.
    pub fn session_sizes(&self) -> Vec<(SessionKey, usize)> {
        self.sessions
            .iter()
            .map(|(key, frames)| (key.clone(), frames.len()))
            .collect()
    }

    /// Frames of one session.
    pub fn session(&self, key: &SessionKey) -> Option<&[SensorFrame]> {
        self.sessions.get(key).map(Vec::as_slice)
    }

    /// Session currently receiving frames.
    pub fn active_session_key(&self) -> Option<&SessionKey> {
        self.segmenter.active()
    }

    /// Most recently observed counter.
    pub fn last_pos(&self) -> i32 {
        self.segmenter.last_pos()
    }

    /// Counts for display.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            points: self.history.len(),
            sessions: self.sessions.len(),
            active_session: self.segmenter.active().cloned(),
        }
    }

    // --- Export ---

    /// Encode the history as a plain JSON array, then clear the store.
    ///
    /// If encoding fails nothing is cleared.
    pub fn export_and_clear(&mut self) -> Result<Vec<u8>> {
        let bytes = export::encode_plain(&self.history)?;
        self.clear_all();
        Ok(bytes)
    }

    /// Build and sign an ingestion envelope for the whole history.
    ///
    /// The store is left as it is.
    pub fn signed_export(&self, options: &EnvelopeOptions, secret: &str) -> Result<SignedEnvelope> {
        export::sign_frames(&self.history, options, secret)
    }

    /// Check that `history` matches the concatenated sessions.
    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let concatenated: Vec<SensorFrame> = self.sessions.values().flatten().copied().collect();
        concatenated.len() == self.history.len()
            && concatenated
                .iter()
                .zip(&self.history)
                .all(|(a, b)| a.to_bytes() == b.to_bytes())
    }
}
