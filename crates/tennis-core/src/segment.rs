//! Session boundary detection.
//!
//! The device never sends an explicit "new capture" marker. Instead its
//! sample counter (`pos`) restarts from a low value whenever a capture
//! begins, so a strict drop in `pos` is treated as a session boundary.
//!
//! A plateau (equal counter) or an increase never opens a session while one
//! is active.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

/// Source of wall-clock time for session keys.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// [`Clock`] backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        u64::try_from(nanos / 1_000_000).unwrap_or(0)
    }
}

impl<F> Clock for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn now_millis(&self) -> u64 {
        self()
    }
}

/// Identifier of one capture session.
///
/// The string form is the decimal millisecond timestamp at which the session
/// opened. Keys order by numeric value, so `"10000"` sorts after `"9999"`,
/// and the segmenter guarantees strictly increasing values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl Ord for SessionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Decimal strings without leading zeros: shorter is smaller.
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for SessionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl SessionKey {
    /// Build a key from a millisecond timestamp.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis.to_string())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Outcome of observing one frame counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Boundary {
    /// The frame continues the active session.
    Continue(SessionKey),
    /// The frame opens a new session with this key.
    Opened(SessionKey),
}

impl Boundary {
    /// The session the frame belongs to.
    pub fn key(&self) -> &SessionKey {
        match self {
            Boundary::Continue(key) | Boundary::Opened(key) => key,
        }
    }

    /// Whether a new session was opened.
    pub fn is_opened(&self) -> bool {
        matches!(self, Boundary::Opened(_))
    }
}

/// Tracks the counter and the active session.
pub struct SessionSegmenter {
    last_pos: i32,
    active: Option<SessionKey>,
    last_issued: Option<u64>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SessionSegmenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSegmenter")
            .field("last_pos", &self.last_pos)
            .field("active", &self.active)
            .field("last_issued", &self.last_issued)
            .finish_non_exhaustive()
    }
}

impl Default for SessionSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSegmenter {
    /// Counter value before any frame has been seen.
    ///
    /// Any real counter compares below it, so the first frame opens a session.
    pub const INITIAL_POS: i32 = i32::MAX;

    /// Create a segmenter using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a segmenter with a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            last_pos: Self::INITIAL_POS,
            active: None,
            last_issued: None,
            clock,
        }
    }

    /// Decide which session a frame with counter `pos` belongs to.
    ///
    /// Opens a new session when `pos` drops below the previous counter or
    /// when no session is active, then records `pos`.
    pub fn observe(&mut self, pos: i32) -> Boundary {
        let boundary = match &self.active {
            Some(key) if pos >= self.last_pos => Boundary::Continue(key.clone()),
            _ => {
                let key = self.issue_key();
                debug!(
                    session = %key,
                    pos,
                    previous_pos = self.last_pos,
                    "Opening new session"
                );
                self.active = Some(key.clone());
                Boundary::Opened(key)
            }
        };
        self.last_pos = pos;
        boundary
    }

    /// The session currently receiving frames.
    pub fn active(&self) -> Option<&SessionKey> {
        self.active.as_ref()
    }

    /// The most recently observed counter.
    pub fn last_pos(&self) -> i32 {
        self.last_pos
    }

    /// Forget the counter and the active session.
    ///
    /// The next frame always opens a new session.
    pub fn reset(&mut self) {
        self.last_pos = Self::INITIAL_POS;
        self.active = None;
    }

    /// Unset the active session but keep comparing against the last counter.
    pub fn deactivate(&mut self) -> Option<SessionKey> {
        self.active.take()
    }

    fn issue_key(&mut self) -> SessionKey {
        let now = self.clock.now_millis();
        let millis = match self.last_issued {
            Some(last) if now <= last => last.saturating_add(1),
            _ => now,
        };
        self.last_issued = Some(millis);
        SessionKey::from_millis(millis)
    }
}
