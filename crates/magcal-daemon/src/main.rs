//! magcal daemon
//!
//! Host adapter for the magnetometer driver: opens the device node, wires the
//! calibration file and an output sink to the driver, and runs until asked to
//! stop.
//!
//! Usage: `magcal-daemon [CONFIG]`
//!
//! Signals:
//! - SIGTERM / SIGINT: deactivate (flushing calibration) and exit
//! - SIGUSR1: write calibration now and keep sampling, keeping the extrema
//!   gathered so far

mod output;

use anyhow::{Context, Result};
use magcal_config::{DaemonConfig, OutputFormat};
use magcal_hal::{DeviceFile, EventSink, FileStore, MagnetometerDriver, MonotonicClock};
use output::{JsonLinesSink, LogSink};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// How often the main loop checks for signals
const POLL_INTERVAL: Duration = Duration::from_millis(100);

static SHUTDOWN: AtomicBool = AtomicBool::new(false);
static CHECKPOINT: AtomicBool = AtomicBool::new(false);

fn main() -> Result<()> {
    let config = load_config()?;

    // Setup logging
    setup_logging(&config.output.log_level);

    info!("magcal daemon starting...");

    // Install signal handlers
    setup_signal_handlers()?;

    run(&config)
}

/// Load configuration from the path given on the command line, or from the
/// default locations
fn load_config() -> Result<DaemonConfig> {
    match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => DaemonConfig::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => DaemonConfig::load_default().context("Failed to load default configuration"),
    }
}

/// Setup logging to the console
fn setup_logging(default_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Setup signal handlers for graceful shutdown
fn setup_signal_handlers() -> Result<()> {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );

    // SAFETY: the handler only stores to atomics
    unsafe {
        sigaction(Signal::SIGTERM, &action)?;
        sigaction(Signal::SIGINT, &action)?;
        sigaction(Signal::SIGUSR1, &action)?;
    }

    Ok(())
}

/// Signal handler
extern "C" fn handle_signal(sig: i32) {
    match sig {
        libc::SIGTERM | libc::SIGINT => SHUTDOWN.store(true, Ordering::SeqCst),
        libc::SIGUSR1 => CHECKPOINT.store(true, Ordering::SeqCst),
        _ => {}
    }
}

fn build_sink(format: OutputFormat) -> Box<dyn EventSink> {
    match format {
        OutputFormat::Json => Box::new(JsonLinesSink::new(std::io::stdout())),
        OutputFormat::Log => Box::new(LogSink),
    }
}

fn run(config: &DaemonConfig) -> Result<()> {
    let source = DeviceFile::open(&config.device.data_path, &config.device.sensitivity_path)
        .context("Failed to open magnetometer device")?;
    let store = FileStore::new(&config.calibration.store_path);
    let sink = build_sink(config.output.format);

    let driver = MagnetometerDriver::init(source, store, sink, MonotonicClock)
        .context("Failed to initialize magnetometer driver")?;

    let delay_us = i64::try_from(config.sampling.delay_us)
        .context("Sampling delay out of range")?;
    driver.set_delay(delay_us)?;
    driver.activate()?;

    info!(
        "Sampling {} every {} us, calibration at {}",
        config.device.data_path.display(),
        delay_us,
        config.calibration.store_path.display()
    );

    while !SHUTDOWN.load(Ordering::SeqCst) {
        if CHECKPOINT.swap(false, Ordering::SeqCst) {
            info!("Flushing calibration");
            driver.flush()?;
        }
        thread::sleep(POLL_INTERVAL);
    }

    info!("Received shutdown signal");

    if let Err(e) = driver.deactivate() {
        warn!("Deactivation failed: {}", e);
    }
    driver.deinit();

    info!("magcal daemon stopped");
    Ok(())
}
