//! Export encodings for captured frames.
//!
//! Two encodings are produced:
//!
//! - **Plain**: a compact JSON array of frame objects
//!   (`{"ax":..,"ay":..,"az":..,"gx":..,"gy":..,"gz":..,"pos":..}`).
//! - **Signed envelope**: the Edge Impulse data-acquisition format, signed
//!   with HMAC-SHA256.
//!
//! The envelope signature is computed over the serialization that still
//! carries the 64-zero placeholder in the `signature` field. The transmitted
//! body is the re-serialization with the real signature substituted, so the
//! signature does not cover the body byte-for-byte. Receivers that verify
//! the same way (placeholder first) accept it.
//!
//! Non-finite channel values serialize as `null` and decode back as NaN.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::OffsetDateTime;
use tracing::debug;

use tennis_types::SensorFrame;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signature value serialized before the real one is known.
pub const PLACEHOLDER_SIGNATURE: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Channel names, in frame order.
pub const SENSOR_NAMES: [&str; 6] = ["aX", "aY", "aZ", "gX", "gY", "gZ"];

/// Unit string attached to every channel.
pub const SENSOR_UNITS: &str = "m/s2";

/// Envelope format version.
pub const ENVELOPE_VERSION: &str = "v1";

/// Envelope signing algorithm identifier.
pub const ENVELOPE_ALGORITHM: &str = "HS256";

/// Encode frames as a compact JSON array.
///
/// An empty slice encodes as `[]`.
pub fn encode_plain(frames: &[SensorFrame]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(frames)?)
}

/// Decode a plain export back into frames.
pub fn decode_plain(data: &[u8]) -> Result<Vec<SensorFrame>> {
    Ok(serde_json::from_slice(data)?)
}

/// Fixed device metadata written into the envelope payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeOptions {
    /// `payload.device_name`.
    pub device_name: String,
    /// `payload.device_type`.
    pub device_type: String,
    /// `payload.interval_ms`, the nominal sampling interval.
    pub interval_ms: u32,
}

impl Default for EnvelopeOptions {
    fn default() -> Self {
        Self {
            device_name: "nrf52840-dongle-001".to_string(),
            device_type: "tinyml-forwarder".to_string(),
            interval_ms: 16,
        }
    }
}

/// `protected` header of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedHeader {
    pub ver: String,
    pub alg: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
}

/// One entry of `payload.sensors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorChannel {
    pub name: String,
    pub units: String,
}

/// `payload` section of the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub device_name: String,
    pub device_type: String,
    pub interval_ms: u32,
    pub sensors: Vec<SensorChannel>,
    /// One row per frame, channels in [`SENSOR_NAMES`] order. `pos` is dropped.
    pub values: Vec<[f64; 6]>,
}

/// Edge Impulse data-acquisition envelope.
///
/// Field order matches the wire format: `protected`, `signature`, `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub protected: ProtectedHeader,
    pub signature: String,
    pub payload: Payload,
}

impl Envelope {
    /// Build an unsigned envelope stamped with the current time.
    pub fn new(frames: &[SensorFrame], options: &EnvelopeOptions) -> Self {
        Self::with_issued_at(frames, options, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Build an unsigned envelope with an explicit `iat`.
    pub fn with_issued_at(frames: &[SensorFrame], options: &EnvelopeOptions, iat: i64) -> Self {
        let sensors = SENSOR_NAMES
            .iter()
            .map(|name| SensorChannel {
                name: (*name).to_string(),
                units: SENSOR_UNITS.to_string(),
            })
            .collect();

        Self {
            protected: ProtectedHeader {
                ver: ENVELOPE_VERSION.to_string(),
                alg: ENVELOPE_ALGORITHM.to_string(),
                iat,
            },
            signature: PLACEHOLDER_SIGNATURE.to_string(),
            payload: Payload {
                device_name: options.device_name.clone(),
                device_type: options.device_type.clone(),
                interval_ms: options.interval_ms,
                sensors,
                values: frames.iter().map(SensorFrame::channels).collect(),
            },
        }
    }

    /// Number of value rows.
    pub fn len(&self) -> usize {
        self.payload.values.len()
    }

    /// Whether the payload carries no rows.
    pub fn is_empty(&self) -> bool {
        self.payload.values.is_empty()
    }

    /// Sign the envelope and produce the transmittable body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if `secret` is empty, or
    /// [`Error::Serialization`] if encoding fails.
    pub fn sign(mut self, secret: &str) -> Result<SignedEnvelope> {
        self.signature = PLACEHOLDER_SIGNATURE.to_string();
        let signature = compute_signature(&self, secret)?;
        self.signature = signature;
        let body = serde_json::to_vec(&self)?;
        debug!(rows = self.len(), bytes = body.len(), "Signed envelope");
        Ok(SignedEnvelope {
            envelope: self,
            body,
        })
    }
}

/// A signed envelope together with its serialized body.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    pub envelope: Envelope,
    /// Bytes to send.
    pub body: Vec<u8>,
}

impl SignedEnvelope {
    /// Hex signature carried by the body.
    pub fn signature(&self) -> &str {
        &self.envelope.signature
    }

    /// Check the signature against `secret`.
    ///
    /// Recomputes the MAC over the placeholder form and compares in
    /// constant time.
    pub fn verify(&self, secret: &str) -> Result<bool> {
        let Ok(expected) = hex::decode(&self.envelope.signature) else {
            return Ok(false);
        };
        let mut unsigned = self.envelope.clone();
        unsigned.signature = PLACEHOLDER_SIGNATURE.to_string();
        let encoded = serde_json::to_vec(&unsigned)?;
        let mut mac = new_mac(secret)?;
        mac.update(&encoded);
        Ok(mac.verify_slice(&expected).is_ok())
    }
}

fn new_mac(secret: &str) -> Result<HmacSha256> {
    if secret.is_empty() {
        return Err(Error::signing("HMAC key is empty"));
    }
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| Error::signing(e.to_string()))
}

fn compute_signature(envelope: &Envelope, secret: &str) -> Result<String> {
    let encoded = serde_json::to_vec(envelope)?;
    let mut mac = new_mac(secret)?;
    mac.update(&encoded);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build and sign an envelope for `frames` in one step.
pub fn sign_frames(
    frames: &[SensorFrame],
    options: &EnvelopeOptions,
    secret: &str,
) -> Result<SignedEnvelope> {
    Envelope::new(frames, options).sign(secret)
}
