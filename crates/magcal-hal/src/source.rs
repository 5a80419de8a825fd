//! Raw sample acquisition

use crate::sample::RECORD_SIZE;
use crate::{RawSample, Result, SensitivityAdjustment, SensorError};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Blocking source of raw magnetometer readings
pub trait SampleSource: Send {
    /// One-time read of the factory sensitivity adjustment
    fn read_sensitivity(&mut self) -> Result<SensitivityAdjustment>;

    /// Block until the next sample is available.
    ///
    /// Fails with [`SensorError::NotReady`] when the device reports an
    /// incomplete measurement, or an I/O error. Never synthesizes data.
    fn acquire(&mut self) -> Result<RawSample>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read_sensitivity(&mut self) -> Result<SensitivityAdjustment> {
        (**self).read_sensitivity()
    }

    fn acquire(&mut self) -> Result<RawSample> {
        (**self).acquire()
    }
}

/// Device node streaming 8-byte measurement records, with the fuse ROM
/// sensitivity bytes exposed as a separate file
#[derive(Debug)]
pub struct DeviceFile {
    device: File,
    device_path: PathBuf,
    sensitivity_path: PathBuf,
}

impl DeviceFile {
    pub fn open(device_path: impl AsRef<Path>, sensitivity_path: impl AsRef<Path>) -> Result<Self> {
        let device_path = device_path.as_ref().to_path_buf();
        let device = File::open(&device_path).map_err(|e| {
            SensorError::DeviceUnavailable(format!("{}: {}", device_path.display(), e))
        })?;

        tracing::debug!("Opened magnetometer device {}", device_path.display());

        Ok(Self {
            device,
            device_path,
            sensitivity_path: sensitivity_path.as_ref().to_path_buf(),
        })
    }

    pub fn device_path(&self) -> &Path {
        &self.device_path
    }
}

impl SampleSource for DeviceFile {
    fn read_sensitivity(&mut self) -> Result<SensitivityAdjustment> {
        let bytes = fs::read(&self.sensitivity_path).map_err(|e| {
            SensorError::DeviceUnavailable(format!("{}: {}", self.sensitivity_path.display(), e))
        })?;

        match bytes.get(..3) {
            Some(&[x, y, z]) => Ok(SensitivityAdjustment::new(x, y, z)),
            _ => Err(SensorError::DeviceUnavailable(format!(
                "{}: expected 3 sensitivity bytes, got {}",
                self.sensitivity_path.display(),
                bytes.len()
            ))),
        }
    }

    fn acquire(&mut self) -> Result<RawSample> {
        let mut record = [0u8; RECORD_SIZE];
        self.device.read_exact(&mut record)?;
        RawSample::from_record(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(status: u8, x: i16, y: i16, z: i16) -> Vec<u8> {
        let mut bytes = vec![status];
        bytes.extend_from_slice(&x.to_le_bytes());
        bytes.extend_from_slice(&y.to_le_bytes());
        bytes.extend_from_slice(&z.to_le_bytes());
        bytes.push(0);
        bytes
    }

    #[test]
    fn test_device_file_reads_records() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("akm8963");
        let asa = dir.path().join("asa");

        let mut stream = record(0x01, 10, -20, 30);
        stream.extend(record(0x00, 1, 1, 1));
        stream.extend(record(0x01, -4, 5, -6));
        fs::write(&data, stream).unwrap();
        fs::write(&asa, [170u8, 128, 90]).unwrap();

        let mut source = DeviceFile::open(&data, &asa).unwrap();
        assert_eq!(
            source.read_sensitivity().unwrap(),
            SensitivityAdjustment::new(170, 128, 90)
        );
        assert_eq!(source.acquire().unwrap(), RawSample::new(10, -20, 30));
        assert!(matches!(source.acquire(), Err(SensorError::NotReady)));
        assert_eq!(source.acquire().unwrap(), RawSample::new(-4, 5, -6));
        // End of stream surfaces as an I/O failure
        assert!(matches!(source.acquire(), Err(SensorError::Io(_))));
    }

    #[test]
    fn test_device_file_missing() {
        let dir = TempDir::new().unwrap();
        let result = DeviceFile::open(dir.path().join("nope"), dir.path().join("asa"));
        assert!(matches!(result, Err(SensorError::DeviceUnavailable(_))));
    }

    #[test]
    fn test_short_sensitivity_file() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("akm8963");
        let asa = dir.path().join("asa");
        fs::write(&data, b"").unwrap();
        fs::write(&asa, [128u8, 128]).unwrap();

        let mut source = DeviceFile::open(&data, &asa).unwrap();
        assert!(matches!(
            source.read_sensitivity(),
            Err(SensorError::DeviceUnavailable(_))
        ));
    }
}
