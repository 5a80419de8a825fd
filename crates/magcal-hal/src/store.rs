//! Persisted calibration store
//!
//! The hard-iron offset survives restarts in a small line-oriented text file:
//!
//! ```text
//! HSUC_HO_FORM0.x = 12
//! HSUC_HO_FORM0.y = -7
//! HSUC_HO_FORM0.z = 0
//! ```
//!
//! Unknown or malformed lines are skipped one field at a time. A missing file
//! means no calibration has been saved yet.

use crate::{Axis, HardIronOffset, Result, SensorError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Historical location of the offset file on the target platform
pub const DEFAULT_STORE_PATH: &str = "/data/misc/akmd_set.txt";

const KEY_PREFIX: &str = "HSUC_HO_FORM0.";

/// Offsets read back from storage; axes absent from the file are `None`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoredOffset {
    values: [Option<i32>; 3],
}

impl StoredOffset {
    pub const fn new(x: Option<i32>, y: Option<i32>, z: Option<i32>) -> Self {
        Self { values: [x, y, z] }
    }

    pub fn get(&self, axis: Axis) -> Option<i32> {
        self.values[axis.index()]
    }

    pub fn set(&mut self, axis: Axis, value: i32) {
        self.values[axis.index()] = Some(value);
    }

    /// True when no axis was found
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// The full offset, if every axis was present
    pub fn complete(&self) -> Option<HardIronOffset> {
        match self.values {
            [Some(x), Some(y), Some(z)] => Some(HardIronOffset::new(x, y, z)),
            _ => None,
        }
    }

    /// Parse the text format. Later lines for the same axis win.
    pub fn parse(contents: &str) -> Self {
        let mut stored = Self::default();
        for line in contents.lines() {
            match parse_line(line) {
                Some((axis, value)) => stored.set(axis, value),
                None if !line.trim().is_empty() => {
                    tracing::debug!("Skipping calibration line: {:?}", line);
                }
                None => {}
            }
        }
        stored
    }
}

impl From<HardIronOffset> for StoredOffset {
    fn from(offset: HardIronOffset) -> Self {
        Self::new(Some(offset.x), Some(offset.y), Some(offset.z))
    }
}

fn parse_line(line: &str) -> Option<(Axis, i32)> {
    let rest = line.trim().strip_prefix(KEY_PREFIX)?;
    let (axis, value) = rest.split_once('=')?;
    let axis = Axis::parse(axis)?;
    let value = value.trim().parse().ok()?;
    Some((axis, value))
}

/// Render an offset in x, y, z order
pub fn render(offset: &HardIronOffset) -> String {
    Axis::all()
        .iter()
        .map(|axis| format!("{}{} = {}\n", KEY_PREFIX, axis.as_str(), offset.get(*axis)))
        .collect()
}

/// Storage for the hard-iron offset between driver sessions
pub trait CalibrationStore: Send {
    /// Read whatever offsets are stored. A store with nothing saved yet
    /// returns an empty [`StoredOffset`], not an error.
    fn load(&self) -> Result<StoredOffset>;

    /// Replace the stored offsets
    fn save(&self, offset: &HardIronOffset) -> Result<()>;
}

/// Text file store, opened and closed on every operation
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_PATH)
    }
}

impl CalibrationStore for FileStore {
    fn load(&self) -> Result<StoredOffset> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    "No calibration at {}, starting uncalibrated",
                    self.path.display()
                );
                return Ok(StoredOffset::default());
            }
            Err(e) => {
                return Err(SensorError::ConfigurationUnreadable(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let stored = StoredOffset::parse(&String::from_utf8_lossy(&bytes));
        tracing::debug!("Loaded calibration from {}: {:?}", self.path.display(), stored);
        Ok(stored)
    }

    fn save(&self, offset: &HardIronOffset) -> Result<()> {
        let write_failed = |e: std::io::Error| {
            SensorError::ConfigurationWriteFailed(format!("{}: {}", self.path.display(), e))
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_failed)?;
            }
        }

        fs::write(&self.path, render(offset)).map_err(write_failed)?;
        tracing::info!("Calibration saved to {}", self.path.display());
        Ok(())
    }
}
