//! Integration tests for the magnetometer driver

use magcal_hal::mock::{ManualClock, MemoryStore, ScriptedSource};
use magcal_hal::{
    CalibrationStore, DeviceFile, FileStore, HardIronOffset, MagneticEvent, MagnetometerDriver,
    RawSample, SensorAccuracy,
};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, channel};
use std::time::Duration;
use tempfile::TempDir;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Test environment with a fake device node and calibration file
struct DriverTestEnv {
    #[allow(dead_code)]
    temp_dir: TempDir,
    device: PathBuf,
    sensitivity: PathBuf,
    store: PathBuf,
}

impl DriverTestEnv {
    fn new(asa: [u8; 3]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let device = temp_dir.path().join("akm8963");
        let sensitivity = temp_dir.path().join("asa");
        let store = temp_dir.path().join("misc").join("akmd_set.txt");

        fs::write(&sensitivity, asa).unwrap();
        fs::write(&device, b"").unwrap();

        Self {
            temp_dir,
            device,
            sensitivity,
            store,
        }
    }

    fn write_records(&self, samples: &[RawSample]) {
        let mut bytes = Vec::with_capacity(samples.len() * 8);
        for sample in samples {
            bytes.push(0x01);
            for value in sample.to_array() {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
            bytes.push(0x00);
        }
        fs::write(&self.device, bytes).unwrap();
    }

    fn start(&self) -> (MagnetometerDriver, Receiver<MagneticEvent>) {
        let source = DeviceFile::open(&self.device, &self.sensitivity).unwrap();
        let (tx, rx) = channel();
        let driver =
            MagnetometerDriver::init(source, FileStore::new(&self.store), tx, ManualClock::new(0))
                .unwrap();
        driver.set_delay(1_000).unwrap();
        (driver, rx)
    }
}

fn sweep(count: usize) -> Vec<RawSample> {
    (0..count)
        .map(|i| {
            if i % 2 == 0 {
                RawSample::new(-201, -403, -300)
            } else {
                RawSample::new(403, 201, 300)
            }
        })
        .collect()
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-2,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
fn test_calibration_persists_across_drivers() {
    let env = DriverTestEnv::new([128, 128, 128]);
    env.write_records(&sweep(20));

    let (driver, rx) = env.start();
    driver.activate().unwrap();
    for _ in 0..20 {
        rx.recv_timeout(RECV_TIMEOUT).unwrap();
    }
    driver.deactivate().unwrap();
    driver.deinit();

    let contents = fs::read_to_string(&env.store).unwrap();
    assert!(contents.starts_with("HSUC_HO_FORM0.x = 252\nHSUC_HO_FORM0.y = -252\n"));

    // A fresh driver applies the stored offset to its first vector
    env.write_records(&[RawSample::new(1000, -2000, 500)]);
    let (driver, rx) = env.start();
    driver.activate().unwrap();
    let event = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    driver.deactivate().unwrap();

    assert_close(event.x, 150.0 - 0.06 * 252.0);
    assert_close(event.y, -300.0 + 0.06 * 252.0);
}

#[test]
fn test_missing_store_starts_uncalibrated() {
    let env = DriverTestEnv::new([128, 128, 128]);
    env.write_records(&[RawSample::new(1000, -2000, 500)]);

    let (driver, rx) = env.start();
    driver.activate().unwrap();
    let event = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    driver.deactivate().unwrap();

    assert_close(event.x, 150.0);
    assert_close(event.y, -300.0);
    assert_close(event.z, 75.0);
    assert_eq!(event.accuracy, SensorAccuracy::Medium);
}

#[test]
fn test_malformed_store_lines_are_skipped() {
    let env = DriverTestEnv::new([128, 128, 128]);
    fs::create_dir_all(env.store.parent().unwrap()).unwrap();
    fs::write(
        &env.store,
        "HSUC_HO_FORM0.x = oops\nHSUC_HO_FORM0.y = 100\ngarbage\n",
    )
    .unwrap();
    env.write_records(&[RawSample::new(0, 0, 0)]);

    let (driver, rx) = env.start();
    driver.activate().unwrap();
    let event = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    driver.deactivate().unwrap();

    assert_close(event.x, 0.0);
    assert_close(event.y, -6.0);
}

#[test]
fn test_sensitivity_applied_from_device() {
    let env = DriverTestEnv::new([192, 64, 128]);
    env.write_records(&[RawSample::new(400, 400, 400)]);

    let (driver, rx) = env.start();
    driver.activate().unwrap();
    let event = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    driver.deactivate().unwrap();

    assert_close(event.x, 75.0);
    assert_close(event.y, 45.0);
    assert_close(event.z, 60.0);
}

#[test]
fn test_scaling_with_full_average() {
    let source = ScriptedSource::default();
    source.push_samples([RawSample::new(1000, -2000, 500); 4]);
    let (tx, rx) = channel();
    let driver =
        MagnetometerDriver::init(source, MemoryStore::new(), tx, ManualClock::new(0)).unwrap();
    driver.set_delay(1_000).unwrap();
    driver.activate().unwrap();

    let events: Vec<MagneticEvent> = (0..4)
        .map(|_| rx.recv_timeout(RECV_TIMEOUT).unwrap())
        .collect();
    driver.deactivate().unwrap();

    let last = events[3];
    assert_close(last.x, 150.0);
    assert_close(last.y, -300.0);
    assert_close(last.z, 75.0);
}

#[test]
fn test_timestamps_come_from_clock() {
    let source = ScriptedSource::default();
    source.push_sample(RawSample::new(1, 1, 1));
    let clock = ManualClock::new(5_000_000);
    let (tx, rx) = channel();
    let driver = MagnetometerDriver::init(source, MemoryStore::new(), tx, clock).unwrap();
    driver.set_delay(1_000).unwrap();
    driver.activate().unwrap();

    let event = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    driver.deactivate().unwrap();
    assert_eq!(event.timestamp_ns, 5_000_000);
}

#[test]
fn test_failed_reads_publish_nothing_and_keep_running() {
    let source = ScriptedSource::failing();
    let (tx, rx) = channel();
    let driver =
        MagnetometerDriver::init(source.clone(), MemoryStore::new(), tx, ManualClock::new(0))
            .unwrap();
    driver.set_delay(1_000).unwrap();
    driver.activate().unwrap();

    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    // The loop survives failures and keeps polling
    assert!(source.reads() > 1);

    source.push_sample(RawSample::new(10, 10, 10));
    let event = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_close(event.x, 1.5);
    driver.deactivate().unwrap();
}

#[test]
fn test_round_trip_persistence() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path().join("akmd_set.txt"));

    store.save(&HardIronOffset::new(12, -7, 0)).unwrap();
    assert_eq!(
        store.load().unwrap().complete(),
        Some(HardIronOffset::new(12, -7, 0))
    );
}
