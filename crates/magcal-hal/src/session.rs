//! Calibration and publishing state for one sampling session
//!
//! Owned exclusively by the sampling thread. Samples are folded in strictly in
//! arrival order, so nothing here needs a lock.

use crate::{
    CalibrationStore, Calibrator, EventSink, HardIronOffset, MagneticEvent, RawSample, Result,
    SensitivityAdjustment, VectorPublisher,
};

#[derive(Debug, Clone)]
pub struct SamplingSession {
    calibrator: Calibrator,
    publisher: VectorPublisher,
}

impl SamplingSession {
    pub fn new(asa: SensitivityAdjustment) -> Self {
        Self {
            calibrator: Calibrator::new(asa),
            publisher: VectorPublisher::new(),
        }
    }

    pub fn calibrator(&self) -> &Calibrator {
        &self.calibrator
    }

    pub fn offset(&self) -> &HardIronOffset {
        self.calibrator.offset()
    }

    pub fn sample_count(&self) -> u64 {
        self.publisher.count()
    }

    /// Load persisted offsets. Unreadable storage is logged and the session
    /// keeps its current calibration.
    pub fn restore<St>(&mut self, store: &St) -> bool
    where
        St: CalibrationStore + ?Sized,
    {
        match store.load() {
            Ok(stored) if stored.is_empty() => false,
            Ok(stored) => {
                self.calibrator.restore(&stored);
                let offset = self.calibrator.offset();
                tracing::info!(
                    "Restored hard-iron offset ({}, {}, {})",
                    offset.x,
                    offset.y,
                    offset.z
                );
                true
            }
            Err(e) => {
                tracing::warn!("Unable to read calibration, starting from zero: {}", e);
                false
            }
        }
    }

    /// Fold a new sample into the ring buffer and calibration state.
    /// Returns whether the offset was recomputed.
    pub fn ingest(&mut self, sample: RawSample) -> bool {
        let count = self.publisher.record(sample);
        self.calibrator.update_extrema(&sample);
        self.calibrator.maybe_recompute_offset(count)
    }

    /// Emit the current vector to `sink`
    pub fn publish<K>(&self, timestamp_ns: u64, sink: &mut K) -> Option<MagneticEvent>
    where
        K: EventSink + ?Sized,
    {
        self.publisher.publish(&self.calibrator, timestamp_ns, sink)
    }

    /// Persist the offset if this session observed any data. Returns whether
    /// a write happened.
    pub fn persist<St>(&self, store: &St) -> Result<bool>
    where
        St: CalibrationStore + ?Sized,
    {
        if !self.calibrator.has_observations() {
            tracing::debug!("No extrema observed, keeping stored calibration");
            return Ok(false);
        }

        store.save(self.calibrator.offset())?;
        Ok(true)
    }
}
