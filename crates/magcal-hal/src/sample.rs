//! Raw magnetometer samples
//!
//! The device reports one 8-byte record per measurement: a status byte whose
//! lowest bit flags a completed measurement, followed by X, Y and Z as signed
//! 16-bit little-endian ADC counts.

use crate::SensorError;
use serde::{Deserialize, Serialize};

/// Size of a device measurement record in bytes
pub const RECORD_SIZE: usize = 8;

/// Status bit set when the record holds a completed measurement
const STATUS_DATA_READY: u8 = 0x01;

/// Measurement axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Get all axes in x, y, z order
    pub fn all() -> &'static [Axis] {
        &[Axis::X, Axis::Y, Axis::Z]
    }

    /// Array index for per-axis tables
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Lowercase axis name
    pub fn as_str(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    /// Parse from lowercase axis name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }
}

/// One raw 3-axis reading in ADC counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl RawSample {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Decode a device measurement record.
    ///
    /// Returns [`SensorError::NotReady`] when the status byte does not flag a
    /// completed measurement.
    pub fn from_record(record: &[u8; RECORD_SIZE]) -> Result<Self, SensorError> {
        if record[0] & STATUS_DATA_READY == 0 {
            return Err(SensorError::NotReady);
        }

        Ok(Self {
            x: i16::from_le_bytes([record[1], record[2]]),
            y: i16::from_le_bytes([record[3], record[4]]),
            z: i16::from_le_bytes([record[5], record[6]]),
        })
    }

    /// Value on a single axis
    pub fn axis(&self, axis: Axis) -> i16 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn to_array(&self) -> [i16; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[i16; 3]> for RawSample {
    fn from(values: [i16; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }
}
