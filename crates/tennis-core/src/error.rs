//! Error types for tennis-core.
//!
//! This module defines every error the capture pipeline can surface, from
//! the Bluetooth link through frame decoding to signing and upload.
//!
//! # Failure Families
//!
//! | Family | Variants | Effect |
//! |--------|----------|--------|
//! | Transport | [`Error::Bluetooth`], [`Error::DeviceNotFound`], [`Error::NotConnected`], [`Error::CharacteristicNotFound`], [`Error::ConnectionFailed`], [`Error::Timeout`] | Surfaced to the caller of connect/subscribe |
//! | Decoding | [`Error::MalformedFrame`] | Frame rejected, store untouched |
//! | Signing | [`Error::Signing`] | Envelope not produced |
//! | Delivery | [`Error::Delivery`], [`Error::InvalidUrl`] | Upload not sent or not completed |
//!
//! Nothing in this crate retries. Every failure ends the single operation
//! that produced it; callers that want resilience must add it themselves.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while capturing, exporting or uploading frames.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Device not found during scan or connection.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceNotFoundReason),

    /// Operation attempted while not connected to device.
    #[error("Not connected to device")]
    NotConnected,

    /// Required BLE characteristic not found on device.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// Connection failed with a specific reason.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// The device identifier that failed to connect.
        device_id: Option<String>,
        /// Why it failed.
        reason: String,
    },

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// A notification buffer was too short for the frame layout.
    #[error("Malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame {
        /// Expected data size.
        expected: usize,
        /// Actual data size received.
        actual: usize,
    },

    /// The envelope could not be signed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The upload request could not be delivered.
    #[error("Delivery failed: {0}")]
    Delivery(#[from] reqwest::Error),

    /// The ingestion endpoint URL is unusable.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reason why a device was not found.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DeviceNotFoundReason {
    /// No sensors found during scan.
    NoDevicesInRange,
    /// Device with specified name/address not found.
    NotFound { identifier: String },
    /// No Bluetooth adapter available.
    NoAdapter,
}

impl std::fmt::Display for DeviceNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDevicesInRange => write!(f, "no sensors in range"),
            Self::NotFound { identifier } => write!(f, "device '{}' not found", identifier),
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
        }
    }
}

impl Error {
    /// Create a device not found error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound(DeviceNotFoundReason::NotFound {
            identifier: identifier.into(),
        })
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a connection failure.
    pub fn connection_failed(device_id: Option<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            device_id,
            reason: reason.into(),
        }
    }

    /// Create a signing error.
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing(message.into())
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error came from the Bluetooth link rather than the data.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Error::Bluetooth(_)
                | Error::DeviceNotFound(_)
                | Error::NotConnected
                | Error::CharacteristicNotFound { .. }
                | Error::ConnectionFailed { .. }
                | Error::Timeout { .. }
        )
    }
}

impl From<tennis_types::ParseError> for Error {
    fn from(err: tennis_types::ParseError) -> Self {
        match err {
            tennis_types::ParseError::MalformedFrame { expected, actual } => {
                Error::MalformedFrame { expected, actual }
            }
            // Handle future ParseError variants (non_exhaustive)
            #[allow(unreachable_patterns)]
            _ => Error::InvalidConfig(format!("Parse error: {}", err)),
        }
    }
}

/// Result type alias using tennis-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::device_not_found("TinyML Tennis");
        assert!(err.to_string().contains("TinyML Tennis"));

        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to device");

        let err = Error::characteristic_not_found("6e400003", 3);
        assert!(err.to_string().contains("6e400003"));
        assert!(err.to_string().contains("3 services"));

        let err = Error::signing("secret key is empty");
        assert_eq!(err.to_string(), "Signing failed: secret key is empty");

        let err = Error::timeout("connect to device", Duration::from_secs(15));
        assert!(err.to_string().contains("connect to device"));
        assert!(err.to_string().contains("15s"));
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = tennis_types::ParseError::MalformedFrame {
            expected: 52,
            actual: 20,
        }
        .into();
        assert!(matches!(
            err,
            Error::MalformedFrame {
                expected: 52,
                actual: 20
            }
        ));
        assert!(!err.is_transport_failure());
    }

    #[test]
    fn test_transport_classification() {
        assert!(Error::NotConnected.is_transport_failure());
        assert!(Error::device_not_found("x").is_transport_failure());
        assert!(Error::connection_failed(None, "rejected").is_transport_failure());
        assert!(!Error::signing("empty").is_transport_failure());
        assert!(!Error::InvalidUrl("ftp://x".into()).is_transport_failure());
    }

    #[test]
    fn test_device_not_found_reasons() {
        let err = Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter);
        assert!(err.to_string().contains("no Bluetooth adapter"));

        let err = Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange);
        assert!(err.to_string().contains("no sensors in range"));
    }

    #[test]
    fn test_btleplug_error_conversion() {
        fn _assert_from_impl<T: From<btleplug::Error>>() {}
        _assert_from_impl::<Error>();
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
