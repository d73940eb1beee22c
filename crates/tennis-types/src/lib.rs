//! Platform-agnostic types for BLE motion-sensor capture.
//!
//! This crate provides the frame layout shared by the capture pipeline
//! (tennis-core) and anything else that needs to read the collector's
//! notifications without pulling in a Bluetooth stack.
//!
//! # Features
//!
//! - [`SensorFrame`] and its fixed 52-byte little-endian codec
//! - UUID constants for the Nordic UART Service
//! - Error types for frame decoding
//!
//! # Example
//!
//! ```
//! use tennis_types::{SensorFrame, FRAME_LEN};
//!
//! let raw = [0u8; FRAME_LEN];
//! let frame = SensorFrame::from_bytes(&raw).unwrap();
//! assert_eq!(frame.pos, 0);
//! ```

pub mod error;
pub mod frame;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use frame::{CHANNEL_COUNT, FRAME_LEN, SensorFrame};
pub use uuid as uuids;
