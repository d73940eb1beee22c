//! Bluetooth UUIDs for the sensor forwarder.
//!
//! The collector board exposes the Nordic UART Service (NUS). Frames are
//! pushed as notifications on the TX characteristic; the RX characteristic
//! is writable but unused by the capture pipeline.

use uuid::{Uuid, uuid};

/// Nordic UART Service UUID.
pub const NUS_SERVICE: Uuid = uuid!("6e400001-b5a3-f393-e0a9-e50e24dcca9e");

/// NUS RX characteristic (central -> peripheral writes).
pub const NUS_RX: Uuid = uuid!("6e400002-b5a3-f393-e0a9-e50e24dcca9e");

/// NUS TX characteristic (peripheral -> central notifications).
pub const NUS_TX: Uuid = uuid!("6e400003-b5a3-f393-e0a9-e50e24dcca9e");
