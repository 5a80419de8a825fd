//! Mock implementations for testing without real hardware
//!
//! Provides a scripted sample source, in-memory calibration stores and a
//! manually advanced clock, so the driver can run on any desktop machine.
//!
//! # Usage
//!
//! ```no_run
//! use magcal_hal::mock::{ManualClock, MemoryStore, ScriptedSource};
//! use magcal_hal::{MagnetometerDriver, RawSample};
//! use std::sync::mpsc::channel;
//!
//! let source = ScriptedSource::default();
//! source.push_sample(RawSample::new(1000, -2000, 500));
//!
//! let (tx, rx) = channel();
//! let driver = MagnetometerDriver::init(source, MemoryStore::new(), tx, ManualClock::new(0))?;
//! driver.activate()?;
//! let event = rx.recv().unwrap();
//! # Ok::<(), magcal_hal::SensorError>(())
//! ```

use crate::store::StoredOffset;
use crate::{
    CalibrationStore, Clock, HardIronOffset, RawSample, Result, SampleSource,
    SensitivityAdjustment, SensorError,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

/// Simulated device wait when the script has nothing queued
const IDLE_READ: Duration = Duration::from_millis(1);

/// One scripted outcome of [`SampleSource::acquire`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockRead {
    Sample(RawSample),
    NotReady,
    IoFailure,
}

#[derive(Debug, Default)]
struct ScriptState {
    queue: VecDeque<MockRead>,
    /// Returned once the queue is drained
    fallback: Option<MockRead>,
    reads: u64,
}

/// Sample source replaying a queue of reads.
///
/// Clones share the same queue, so a test can keep a handle and feed samples
/// while the driver owns the source.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    sensitivity: Option<SensitivityAdjustment>,
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedSource {
    /// Source reporting `sensitivity`; an empty queue reads as not ready
    pub fn new(sensitivity: SensitivityAdjustment) -> Self {
        Self {
            sensitivity: Some(sensitivity),
            state: Arc::new(Mutex::new(ScriptState::default())),
        }
    }

    /// Source whose sensitivity read fails, as if the device node is missing
    pub fn unavailable() -> Self {
        Self {
            sensitivity: None,
            state: Arc::new(Mutex::new(ScriptState::default())),
        }
    }

    /// Source whose every read fails with an I/O error
    pub fn failing() -> Self {
        let source = Self::default();
        if let Ok(mut state) = source.state.lock() {
            state.fallback = Some(MockRead::IoFailure);
        }
        source
    }

    pub fn push(&self, read: MockRead) {
        if let Ok(mut state) = self.state.lock() {
            state.queue.push_back(read);
        }
    }

    pub fn push_sample(&self, sample: RawSample) {
        self.push(MockRead::Sample(sample));
    }

    pub fn push_samples(&self, samples: impl IntoIterator<Item = RawSample>) {
        if let Ok(mut state) = self.state.lock() {
            state.queue.extend(samples.into_iter().map(MockRead::Sample));
        }
    }

    /// Number of acquire calls so far
    pub fn reads(&self) -> u64 {
        self.state.lock().map(|s| s.reads).unwrap_or(0)
    }

    /// Reads still queued
    pub fn pending(&self) -> usize {
        self.state.lock().map(|s| s.queue.len()).unwrap_or(0)
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new(SensitivityAdjustment::default())
    }
}

impl SampleSource for ScriptedSource {
    fn read_sensitivity(&mut self) -> Result<SensitivityAdjustment> {
        self.sensitivity
            .ok_or_else(|| SensorError::DeviceUnavailable("[MOCK] no device".into()))
    }

    fn acquire(&mut self) -> Result<RawSample> {
        let read = match self.state.lock() {
            Ok(mut state) => {
                state.reads += 1;
                state.queue.pop_front().or(state.fallback)
            }
            Err(_) => Some(MockRead::IoFailure),
        };

        match read {
            Some(MockRead::Sample(sample)) => Ok(sample),
            Some(MockRead::IoFailure) => {
                thread::sleep(IDLE_READ);
                Err(SensorError::Io(std::io::Error::other("[MOCK] read failed")))
            }
            Some(MockRead::NotReady) | None => {
                thread::sleep(IDLE_READ);
                Err(SensorError::NotReady)
            }
        }
    }
}

#[derive(Debug, Default)]
struct MemoryStoreState {
    stored: StoredOffset,
    loads: usize,
    saves: usize,
}

/// In-memory calibration store. Clones share contents and counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryStoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset: HardIronOffset) -> Self {
        Self::from_stored(offset.into())
    }

    pub fn from_stored(stored: StoredOffset) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryStoreState {
                stored,
                ..Default::default()
            })),
        }
    }

    /// Stored offset, if all three axes are present
    pub fn offset(&self) -> Option<HardIronOffset> {
        self.state.read().ok().and_then(|s| s.stored.complete())
    }

    pub fn load_count(&self) -> usize {
        self.state.read().map(|s| s.loads).unwrap_or(0)
    }

    pub fn save_count(&self) -> usize {
        self.state.read().map(|s| s.saves).unwrap_or(0)
    }
}

impl CalibrationStore for MemoryStore {
    fn load(&self) -> Result<StoredOffset> {
        let mut state = self
            .state
            .write()
            .map_err(|e| SensorError::ConfigurationUnreadable(e.to_string()))?;
        state.loads += 1;
        Ok(state.stored)
    }

    fn save(&self, offset: &HardIronOffset) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| SensorError::ConfigurationWriteFailed(e.to_string()))?;
        state.stored = (*offset).into();
        state.saves += 1;
        tracing::debug!("[MOCK] Calibration saved: {:?}", offset);
        Ok(())
    }
}

/// Store that can be neither read nor written
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

impl CalibrationStore for FailingStore {
    fn load(&self) -> Result<StoredOffset> {
        Err(SensorError::ConfigurationUnreadable("[MOCK] unreadable".into()))
    }

    fn save(&self, _offset: &HardIronOffset) -> Result<()> {
        Err(SensorError::ConfigurationWriteFailed("[MOCK] read-only".into()))
    }
}

/// Deterministic clock advanced by hand
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ns: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ns: u64) -> Self {
        Self {
            now_ns: Arc::new(AtomicU64::new(start_ns)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ns
            .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, now_ns: u64) {
        self.now_ns.store(now_ns, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}
