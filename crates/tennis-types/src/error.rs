//! Error types for frame decoding in tennis-types.

use thiserror::Error;

/// Errors that can occur when decoding sensor notifications.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in tennis-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The buffer is too short to contain the fixed frame layout.
    #[error("Malformed frame: requires {expected} bytes, got {actual}")]
    MalformedFrame {
        /// Number of bytes the layout needs.
        expected: usize,
        /// Number of bytes actually received.
        actual: usize,
    },
}

/// Result type alias using tennis-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
