//! Vector publishing
//!
//! Keeps the last four raw samples, averages them per axis to smooth jitter,
//! applies the sensitivity adjustment and the hard-iron offset, and hands the
//! resulting microtesla vector to the event sink.

use crate::{Axis, Calibrator, EventSink, RawSample, UT_PER_LSB};
use serde::{Deserialize, Serialize};

/// Number of recent samples averaged per published vector
pub const RING_CAPACITY: usize = 4;

/// Coarse accuracy classification attached to each vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorAccuracy {
    Unreliable,
    Low,
    Medium,
    High,
}

/// Calibrated magnetic field in microtesla
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagneticVector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub accuracy: SensorAccuracy,
}

impl MagneticVector {
    pub fn axis(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// A published vector with its monotonic timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagneticEvent {
    pub timestamp_ns: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub accuracy: SensorAccuracy,
}

impl MagneticEvent {
    pub fn new(vector: MagneticVector, timestamp_ns: u64) -> Self {
        Self {
            timestamp_ns,
            x: vector.x,
            y: vector.y,
            z: vector.z,
            accuracy: vector.accuracy,
        }
    }

    pub fn vector(&self) -> MagneticVector {
        MagneticVector {
            x: self.x,
            y: self.y,
            z: self.z,
            accuracy: self.accuracy,
        }
    }
}

/// Ring buffer of recent samples plus the session sample counter
#[derive(Debug, Clone, Default)]
pub struct VectorPublisher {
    ring: [RawSample; RING_CAPACITY],
    index: usize,
    count: u64,
}

impl VectorPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a sample and return the updated sample count
    pub fn record(&mut self, sample: RawSample) -> u64 {
        self.ring[self.index] = sample;
        self.index = (self.index + 1) % RING_CAPACITY;
        self.count += 1;
        self.count
    }

    /// Samples recorded this session
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Field on one axis in microtesla, or `None` before the first sample
    pub fn compute_axis(&self, axis: Axis, calibrator: &Calibrator) -> Option<f32> {
        let filled = (self.count as usize).min(RING_CAPACITY);
        if filled == 0 {
            return None;
        }

        let sum: f32 = self.ring[..filled]
            .iter()
            .map(|sample| sample.axis(axis) as f32)
            .sum();
        let adjusted = sum / filled as f32 * calibrator.sensitivity().factor(axis);

        Some(UT_PER_LSB * adjusted - calibrator.offset().bias_ut(axis))
    }

    /// Current vector. Accuracy is always reported as medium.
    pub fn vector(&self, calibrator: &Calibrator) -> Option<MagneticVector> {
        Some(MagneticVector {
            x: self.compute_axis(Axis::X, calibrator)?,
            y: self.compute_axis(Axis::Y, calibrator)?,
            z: self.compute_axis(Axis::Z, calibrator)?,
            accuracy: SensorAccuracy::Medium,
        })
    }

    /// Emit the current vector to `sink`. Returns the event, or `None` when
    /// nothing has been recorded yet.
    pub fn publish<K>(
        &self,
        calibrator: &Calibrator,
        timestamp_ns: u64,
        sink: &mut K,
    ) -> Option<MagneticEvent>
    where
        K: EventSink + ?Sized,
    {
        let event = MagneticEvent::new(self.vector(calibrator)?, timestamp_ns);
        sink.emit(event);
        Some(event)
    }
}
