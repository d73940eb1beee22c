//! Decoded sensor frames.

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ParseError;

/// Number of bytes in one notification frame.
///
/// Six `f64` channels (48 bytes) followed by one `i32` position counter.
pub const FRAME_LEN: usize = 52;

/// Number of physical channels carried by a frame.
pub const CHANNEL_COUNT: usize = 6;

/// One decoded reading from the motion sensor.
///
/// Acceleration is in m/s², angular rate as reported by the IMU driver.
/// `pos` is the device-side sample counter; it increases within a capture
/// and drops back when the device starts a new one.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorFrame {
    /// Acceleration, X axis.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "channel_or_nan"))]
    pub ax: f64,
    /// Acceleration, Y axis.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "channel_or_nan"))]
    pub ay: f64,
    /// Acceleration, Z axis.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "channel_or_nan"))]
    pub az: f64,
    /// Angular rate, X axis.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "channel_or_nan"))]
    pub gx: f64,
    /// Angular rate, Y axis.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "channel_or_nan"))]
    pub gy: f64,
    /// Angular rate, Z axis.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "channel_or_nan"))]
    pub gz: f64,
    /// Intra-session sample counter.
    pub pos: i32,
}

/// JSON has no NaN or infinity; those serialize as `null` and read back as NaN.
#[cfg(feature = "serde")]
fn channel_or_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl SensorFrame {
    /// Decode a frame from a raw notification buffer.
    ///
    /// The byte format is:
    /// - bytes 0-7: ax (f64 LE)
    /// - bytes 8-15: ay (f64 LE)
    /// - bytes 16-23: az (f64 LE)
    /// - bytes 24-31: gx (f64 LE)
    /// - bytes 32-39: gy (f64 LE)
    /// - bytes 40-47: gz (f64 LE)
    /// - bytes 48-51: pos (i32 LE)
    ///
    /// Trailing bytes past [`FRAME_LEN`] are ignored. Values are not range
    /// checked; NaN and infinities decode as-is.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedFrame`] if `data` contains fewer than
    /// [`FRAME_LEN`] (52) bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use tennis_types::SensorFrame;
    ///
    /// let frame = SensorFrame::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 7);
    /// let decoded = SensorFrame::from_bytes(&frame.to_bytes()).unwrap();
    /// assert_eq!(decoded, frame);
    ///
    /// assert!(SensorFrame::from_bytes(&[0u8; 51]).is_err());
    /// ```
    #[must_use = "parsing returns a Result that should be handled"]
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        use bytes::Buf;

        if data.len() < FRAME_LEN {
            return Err(ParseError::MalformedFrame {
                expected: FRAME_LEN,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let ax = buf.get_f64_le();
        let ay = buf.get_f64_le();
        let az = buf.get_f64_le();
        let gx = buf.get_f64_le();
        let gy = buf.get_f64_le();
        let gz = buf.get_f64_le();
        let pos = buf.get_i32_le();

        Ok(SensorFrame {
            ax,
            ay,
            az,
            gx,
            gy,
            gz,
            pos,
        })
    }

    /// Encode the frame in the layout the device transmits.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        use bytes::BufMut;

        let mut out = [0u8; FRAME_LEN];
        let mut buf = &mut out[..];
        for value in self.channels() {
            buf.put_f64_le(value);
        }
        buf.put_i32_le(self.pos);
        out
    }

    /// Build a frame from its six channels and counter.
    #[must_use]
    pub fn new(channels: [f64; CHANNEL_COUNT], pos: i32) -> Self {
        let [ax, ay, az, gx, gy, gz] = channels;
        Self {
            ax,
            ay,
            az,
            gx,
            gy,
            gz,
            pos,
        }
    }

    /// The six physical channels in `[ax, ay, az, gx, gy, gz]` order.
    #[must_use]
    pub fn channels(&self) -> [f64; CHANNEL_COUNT] {
        [self.ax, self.ay, self.az, self.gx, self.gy, self.gz]
    }
}
