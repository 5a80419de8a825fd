//! Runtime hard-iron calibration
//!
//! The calibrator tracks the most negative and most positive raw count seen on
//! each axis and periodically derives a hard-iron offset (HO) that places those
//! extrema at -45 uT and +45 uT. The published value on an axis is
//! `0.15 * adj * raw - 0.06 * HO`, so the offset is stored as an integer in
//! units of 0.06 uT.

use crate::store::StoredOffset;
use crate::{Axis, RawSample, SensitivityAdjustment, TARGET_RANGE_UT, UT_PER_OFFSET_UNIT};
use serde::{Deserialize, Serialize};

/// The offset is recomputed every this many samples
pub const OFFSET_RECOMPUTE_INTERVAL: u64 = 10;

/// Per-axis hard-iron offset in units of 0.06 uT
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardIronOffset {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl HardIronOffset {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, value: i32) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    /// Static bias on an axis in microtesla
    pub fn bias_ut(&self, axis: Axis) -> f32 {
        UT_PER_OFFSET_UNIT * self.get(axis) as f32
    }
}

/// Per-axis minimum and maximum raw counts observed since the last reset.
///
/// Zero doubles as the "unset" marker: an extremum equal to zero is replaced by
/// the next sample unconditionally. A genuine zero reading therefore never
/// sticks as an extremum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extrema {
    min: [i16; 3],
    max: [i16; 3],
}

impl Extrema {
    pub fn min(&self, axis: Axis) -> i16 {
        self.min[axis.index()]
    }

    pub fn max(&self, axis: Axis) -> i16 {
        self.max[axis.index()]
    }

    /// True while no axis has a non-zero extremum
    pub fn is_empty(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| *v == 0)
    }

    pub fn update(&mut self, sample: &RawSample) {
        for axis in Axis::all() {
            let i = axis.index();
            let value = sample.axis(*axis);

            if value < self.min[i] || self.min[i] == 0 {
                self.min[i] = value;
            }
            if value > self.max[i] || self.max[i] == 0 {
                self.max[i] = value;
            }
        }
    }

    fn set(&mut self, axis: Axis, min: i16, max: i16) {
        self.min[axis.index()] = min;
        self.max[axis.index()] = max;
    }
}

/// Calibration engine: extrema tracking and offset derivation
#[derive(Debug, Clone)]
pub struct Calibrator {
    asa: SensitivityAdjustment,
    offset: HardIronOffset,
    extrema: Extrema,
}

impl Calibrator {
    pub fn new(asa: SensitivityAdjustment) -> Self {
        Self {
            asa,
            offset: HardIronOffset::default(),
            extrema: Extrema::default(),
        }
    }

    pub fn sensitivity(&self) -> &SensitivityAdjustment {
        &self.asa
    }

    pub fn offset(&self) -> &HardIronOffset {
        &self.offset
    }

    pub fn extrema(&self) -> &Extrema {
        &self.extrema
    }

    /// Whether this session observed anything worth persisting
    pub fn has_observations(&self) -> bool {
        !self.extrema.is_empty()
    }

    /// Fold a sample into the per-axis extrema
    pub fn update_extrema(&mut self, sample: &RawSample) {
        self.extrema.update(sample);
    }

    /// Recompute the offset when `sample_count` is a multiple of
    /// [`OFFSET_RECOMPUTE_INTERVAL`]. Returns whether it ran.
    pub fn maybe_recompute_offset(&mut self, sample_count: u64) -> bool {
        if sample_count == 0 || sample_count % OFFSET_RECOMPUTE_INTERVAL != 0 {
            return false;
        }

        for axis in Axis::all() {
            let scale = self.asa.scale(*axis);

            // Offset placing the minimum at -45 uT
            let low = (scale * self.extrema.min(*axis) as f32 + TARGET_RANGE_UT)
                / UT_PER_OFFSET_UNIT;
            // Offset placing the maximum at +45 uT
            let high = (scale * self.extrema.max(*axis) as f32 - TARGET_RANGE_UT)
                / UT_PER_OFFSET_UNIT;

            self.offset.set(*axis, ((low + high) / 2.0) as i32);
        }

        tracing::debug!(
            "Hard-iron offset recomputed at sample {}: ({}, {}, {})",
            sample_count,
            self.offset.x,
            self.offset.y,
            self.offset.z
        );

        true
    }

    /// Apply offsets loaded from storage.
    ///
    /// Each restored axis also gets its extrema seeded at the raw counts that
    /// map to -45 uT and +45 uT, so the next recomputation starts from the
    /// restored calibration rather than a single-sample range.
    pub fn restore(&mut self, stored: &StoredOffset) {
        for axis in Axis::all() {
            if let Some(value) = stored.get(*axis) {
                self.offset.set(*axis, value);
                self.seed_extrema(*axis);
            }
        }
    }

    fn seed_extrema(&mut self, axis: Axis) {
        let scale = self.asa.scale(axis);
        let bias = self.offset.bias_ut(axis);

        let min = ((-TARGET_RANGE_UT + bias) / scale) as i16;
        let max = ((TARGET_RANGE_UT + bias) / scale) as i16;
        self.extrema.set(axis, min, max);
    }
}
