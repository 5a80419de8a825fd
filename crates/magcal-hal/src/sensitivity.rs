//! Factory sensitivity adjustment (ASA)
//!
//! Each axis carries a one-byte fuse ROM value compensating for manufacturing
//! variance. The adjusted count is `raw * (((asa - 128) * 0.5) / 128 + 1)`.

use crate::Axis;
use serde::{Deserialize, Serialize};

/// Per-axis sensitivity adjustment, fixed for the lifetime of a driver session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivityAdjustment {
    asa: [u8; 3],
}

impl SensitivityAdjustment {
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        Self { asa: [x, y, z] }
    }

    /// Build from the three fuse ROM bytes in x, y, z order
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self { asa: bytes }
    }

    /// Raw fuse ROM value for an axis
    pub fn raw(&self, axis: Axis) -> u8 {
        self.asa[axis.index()]
    }

    /// Multiplicative correction for an axis
    pub fn factor(&self, axis: Axis) -> f32 {
        ((self.raw(axis) as f32 - 128.0) * 0.5) / 128.0 + 1.0
    }

    /// Microtesla per raw count on an axis, after adjustment
    pub fn scale(&self, axis: Axis) -> f32 {
        crate::UT_PER_LSB * self.factor(axis)
    }
}

impl Default for SensitivityAdjustment {
    /// Neutral adjustment (factor 1.0 on every axis)
    fn default() -> Self {
        Self::new(128, 128, 128)
    }
}
