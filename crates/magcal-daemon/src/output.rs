//! Event sinks used by the daemon

use magcal_hal::{EventSink, MagneticEvent};
use std::io::Write;

/// Writes one JSON object per vector
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    failed: bool,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failed: false,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer
    }

    fn write_event(&mut self, event: &MagneticEvent) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: MagneticEvent) {
        match self.write_event(&event) {
            Ok(()) => self.failed = false,
            // Only report the first failure of a run
            Err(e) if !self.failed => {
                tracing::warn!("Unable to write vector: {}", e);
                self.failed = true;
            }
            Err(_) => {}
        }
    }
}

/// Logs vectors at debug level
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: MagneticEvent) {
        tracing::debug!(
            "Magnetic field [{}]: x={:.3} y={:.3} z={:.3} uT ({:?})",
            event.timestamp_ns,
            event.x,
            event.y,
            event.z,
            event.accuracy
        );
    }
}
