//! Magnetometer driver lifecycle
//!
//! A driver owns one background sampling thread. The thread owns the sample
//! source, the calibration store, the event sink and all calibration state;
//! the controlling side only flips the requested phase and the sampling period
//! in a small mutex-guarded control block and waits on a condition variable
//! for the thread to acknowledge.
//!
//! ```text
//! init ──> Ready ──activate──> Sampling ──deactivate──> Deactivated
//!                                 ^                          │
//!                                 └────────activate──────────┘
//! deinit (or drop) from any state: stop, flush calibration, join
//! ```
//!
//! While sampling, [`MagnetometerDriver::flush`] writes the calibration without
//! leaving the `Sampling` state.

use crate::{
    CalibrationStore, Clock, EventSink, Result, SampleSource, SamplingSession,
    SensitivityAdjustment, SensorError,
};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Sampling period used until the host requests one (200 ms)
pub const DEFAULT_DELAY_US: u64 = 200_000;

/// Upper bound on how long stop requests wait for the sampling thread
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Externally visible driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Initialized, never activated
    Ready,
    /// Sampling thread running
    Sampling,
    /// Sampling stopped, calibration flushed
    Deactivated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Sampling,
    Shutdown,
}

#[derive(Debug)]
struct Control {
    /// Phase requested by the controller
    requested: Phase,
    /// Phase the sampling thread last settled into
    acknowledged: Phase,
    delay: Duration,
    state: DriverState,
    /// Flush requests issued and served, as running counts
    flush_requested: u64,
    flushed: u64,
}

impl Control {
    fn flush_pending(&self) -> bool {
        self.flushed != self.flush_requested
    }
}

#[derive(Debug)]
struct Shared {
    control: Mutex<Control>,
    wake: Condvar,
}

impl Shared {
    fn new(delay: Duration) -> Self {
        Self {
            control: Mutex::new(Control {
                requested: Phase::Idle,
                acknowledged: Phase::Idle,
                delay,
                state: DriverState::Ready,
                flush_requested: 0,
                flushed: 0,
            }),
            wake: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_sampling(&self) -> bool {
        self.lock().requested == Phase::Sampling
    }

    /// Park the sampling thread until sampling is requested. Returns false
    /// on shutdown.
    fn wait_for_sampling(&self) -> bool {
        let mut control = self.lock();
        loop {
            match control.requested {
                Phase::Sampling => {
                    control.acknowledged = Phase::Sampling;
                    self.wake.notify_all();
                    return true;
                }
                Phase::Shutdown => {
                    control.acknowledged = Phase::Shutdown;
                    self.wake.notify_all();
                    return false;
                }
                Phase::Idle => {
                    if control.acknowledged != Phase::Idle {
                        control.acknowledged = Phase::Idle;
                        self.wake.notify_all();
                    }
                    control = self
                        .wake
                        .wait(control)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Sleep out the rest of the period, running `on_flush` (unlocked) for
    /// flush requests that arrive meanwhile. Returns false as soon as sampling
    /// is no longer requested.
    fn sleep_remaining(&self, elapsed: Duration, mut on_flush: impl FnMut()) -> bool {
        let mut control = self.lock();
        let deadline = Instant::now().checked_add(control.delay.saturating_sub(elapsed));

        loop {
            if control.requested != Phase::Sampling {
                return false;
            }

            if control.flush_pending() {
                let target = control.flush_requested;
                drop(control);
                on_flush();
                control = self.lock();
                control.flushed = target;
                self.wake.notify_all();
                continue;
            }

            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            if remaining.is_zero() {
                return true;
            }

            control = self
                .wake
                .wait_timeout_while(control, remaining, |c| {
                    c.requested == Phase::Sampling && !c.flush_pending()
                })
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Mark every outstanding flush as served by the final write of a session
    fn settle_flushes(&self) {
        let mut control = self.lock();
        control.flushed = control.flush_requested;
        self.wake.notify_all();
    }
}

/// Offset-calibrated magnetometer driver
#[derive(Debug)]
pub struct MagnetometerDriver {
    shared: Arc<Shared>,
    sensitivity: SensitivityAdjustment,
    thread: Option<JoinHandle<()>>,
}

impl MagnetometerDriver {
    /// Read the sensitivity adjustment and start the (idle) sampling thread.
    ///
    /// Fails with [`SensorError::DeviceUnavailable`] if the device cannot be
    /// read or the thread cannot be spawned; nothing is left running.
    pub fn init<S, St, K, C>(mut source: S, store: St, sink: K, clock: C) -> Result<Self>
    where
        S: SampleSource + 'static,
        St: CalibrationStore + 'static,
        K: EventSink + 'static,
        C: Clock + 'static,
    {
        let sensitivity = source.read_sensitivity().map_err(|e| match e {
            SensorError::DeviceUnavailable(_) => e,
            other => SensorError::DeviceUnavailable(other.to_string()),
        })?;

        tracing::debug!(
            "ASA (sensitivity adjustment) values are: ({}, {}, {})",
            sensitivity.raw(crate::Axis::X),
            sensitivity.raw(crate::Axis::Y),
            sensitivity.raw(crate::Axis::Z)
        );

        let shared = Arc::new(Shared::new(Duration::from_micros(DEFAULT_DELAY_US)));
        let session = SamplingSession::new(sensitivity);

        let thread = thread::Builder::new()
            .name("magcal-sampler".into())
            .spawn({
                let shared = Arc::clone(&shared);
                move || sampling_loop(&shared, source, store, sink, clock, session)
            })
            .map_err(|e| {
                SensorError::DeviceUnavailable(format!("Unable to spawn sampling thread: {}", e))
            })?;

        tracing::info!("Magnetometer driver initialized");

        Ok(Self {
            shared,
            sensitivity,
            thread: Some(thread),
        })
    }

    pub fn state(&self) -> DriverState {
        self.shared.lock().state
    }

    pub fn sensitivity(&self) -> &SensitivityAdjustment {
        &self.sensitivity
    }

    /// Current sampling period
    pub fn delay(&self) -> Duration {
        self.shared.lock().delay
    }

    /// Start sampling. Calibration is loaded by the sampling thread before
    /// the first read. Activating an active driver is a no-op.
    pub fn activate(&self) -> Result<()> {
        let mut control = self.shared.lock();
        if control.requested == Phase::Sampling {
            tracing::debug!("Magnetometer already active");
            return Ok(());
        }

        control.requested = Phase::Sampling;
        control.state = DriverState::Sampling;
        self.shared.wake.notify_all();
        tracing::info!("Magnetometer activated");
        Ok(())
    }

    /// Stop sampling and flush calibration if this session observed data.
    ///
    /// Interrupts the inter-sample sleep and waits (bounded) for the thread
    /// to settle. Calling it on an inactive driver does nothing.
    pub fn deactivate(&self) -> Result<()> {
        let mut control = self.shared.lock();
        if control.requested != Phase::Sampling {
            tracing::debug!("Magnetometer already inactive");
            return Ok(());
        }

        control.requested = Phase::Idle;
        control.state = DriverState::Deactivated;
        self.shared.wake.notify_all();

        let (_control, wait) = self
            .shared
            .wake
            .wait_timeout_while(control, STOP_TIMEOUT, |c| {
                c.requested == Phase::Idle && c.acknowledged == Phase::Sampling
            })
            .unwrap_or_else(PoisonError::into_inner);

        if wait.timed_out() {
            tracing::warn!(
                "Sampling thread blocked in a device read; calibration is flushed once it returns"
            );
        }

        tracing::info!("Magnetometer deactivated");
        Ok(())
    }

    /// Write the current calibration without stopping.
    ///
    /// Unlike a deactivate/activate cycle this keeps the extrema gathered so
    /// far, since nothing is reloaded from the store. Waits (bounded) for the
    /// sampling thread to perform the write. Does nothing when not sampling.
    pub fn flush(&self) -> Result<()> {
        let mut control = self.shared.lock();
        if control.requested != Phase::Sampling {
            tracing::debug!("Magnetometer inactive, nothing to flush");
            return Ok(());
        }

        control.flush_requested += 1;
        let target = control.flush_requested;
        self.shared.wake.notify_all();

        let (_control, wait) = self
            .shared
            .wake
            .wait_timeout_while(control, STOP_TIMEOUT, |c| {
                c.requested == Phase::Sampling && c.flushed < target
            })
            .unwrap_or_else(PoisonError::into_inner);

        if wait.timed_out() {
            tracing::warn!(
                "Sampling thread blocked in a device read; calibration is flushed once it returns"
            );
        }

        Ok(())
    }

    /// Set the sampling period in microseconds. Takes effect from the next
    /// cycle; a sleep already in progress keeps its length.
    pub fn set_delay(&self, delay_us: i64) -> Result<()> {
        let delay_us = u64::try_from(delay_us).map_err(|_| {
            SensorError::InvalidArgument(format!("negative sampling delay: {} us", delay_us))
        })?;

        self.shared.lock().delay = Duration::from_micros(delay_us);
        tracing::debug!("Sampling delay set to {} us", delay_us);
        Ok(())
    }

    /// Stop the sampling thread and release everything. A driver that is
    /// still sampling flushes its calibration first; a failed flush does not
    /// prevent teardown.
    pub fn deinit(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        let control = {
            let mut control = self.shared.lock();
            control.requested = Phase::Shutdown;
            self.shared.wake.notify_all();
            control
        };

        let (_control, wait) = self
            .shared
            .wake
            .wait_timeout_while(control, STOP_TIMEOUT, |c| c.acknowledged != Phase::Shutdown)
            .unwrap_or_else(PoisonError::into_inner);

        if wait.timed_out() {
            tracing::warn!("Sampling thread did not stop in time, detaching it");
            return;
        }

        if thread.join().is_err() {
            tracing::error!("Sampling thread panicked");
        }

        tracing::info!("Magnetometer driver released");
    }
}

impl Drop for MagnetometerDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sampling_loop<S, St, K, C>(
    shared: &Shared,
    mut source: S,
    store: St,
    mut sink: K,
    clock: C,
    mut session: SamplingSession,
) where
    S: SampleSource,
    St: CalibrationStore,
    K: EventSink,
    C: Clock,
{
    tracing::debug!("Sampling thread started");

    while shared.wait_for_sampling() {
        session.restore(&store);

        loop {
            let started = clock.now_ns();
            let sample = source.acquire();

            if !shared.is_sampling() {
                break;
            }

            match sample {
                Ok(sample) => {
                    session.ingest(sample);
                    session.publish(clock.now_ns(), &mut sink);
                }
                Err(SensorError::NotReady) => tracing::debug!("Magnetometer data is not ready"),
                Err(e) => tracing::warn!("Unable to get magnetometer data: {}", e),
            }

            let elapsed = Duration::from_nanos(clock.now_ns().saturating_sub(started));
            if !shared.sleep_remaining(elapsed, || write_calibration(&session, &store)) {
                break;
            }
        }

        write_calibration(&session, &store);
        shared.settle_flushes();

        tracing::info!(
            "Sampling stopped after {} samples",
            session.sample_count()
        );
    }

    tracing::debug!("Sampling thread exiting");
}

fn write_calibration<St: CalibrationStore>(session: &SamplingSession, store: &St) {
    if let Err(e) = session.persist(store) {
        tracing::warn!("Unable to write calibration: {}", e);
    }
}
