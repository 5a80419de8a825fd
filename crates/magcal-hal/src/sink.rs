//! Event sinks for published vectors

use crate::MagneticEvent;
use std::sync::mpsc::{Sender, SyncSender, TrySendError};

/// Receiver of calibrated vectors. The sampling thread is the only writer.
pub trait EventSink: Send {
    fn emit(&mut self, event: MagneticEvent);
}

impl EventSink for Sender<MagneticEvent> {
    fn emit(&mut self, event: MagneticEvent) {
        if self.send(event).is_err() {
            tracing::debug!("Event receiver dropped, discarding vector");
        }
    }
}

/// Bounded channel: a full queue drops the newest vector instead of stalling
/// the sampling thread.
impl EventSink for SyncSender<MagneticEvent> {
    fn emit(&mut self, event: MagneticEvent) {
        match self.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => tracing::debug!("Event queue full, dropping vector"),
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("Event receiver dropped, discarding vector")
            }
        }
    }
}

impl EventSink for Vec<MagneticEvent> {
    fn emit(&mut self, event: MagneticEvent) {
        self.push(event);
    }
}

impl<K: EventSink + ?Sized> EventSink for Box<K> {
    fn emit(&mut self, event: MagneticEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MagneticVector, SensorAccuracy};
    use std::sync::mpsc::{channel, sync_channel};

    fn event(timestamp_ns: u64) -> MagneticEvent {
        MagneticEvent::new(
            MagneticVector {
                x: 1.0,
                y: 2.0,
                z: 3.0,
                accuracy: SensorAccuracy::Medium,
            },
            timestamp_ns,
        )
    }

    #[test]
    fn test_channel_sink() {
        let (mut tx, rx) = channel();
        tx.emit(event(7));
        assert_eq!(rx.try_recv().unwrap().timestamp_ns, 7);
    }

    #[test]
    fn test_channel_sink_disconnected() {
        let (mut tx, rx) = channel();
        drop(rx);
        // Must not panic
        tx.emit(event(1));
    }

    #[test]
    fn test_bounded_sink_drops_when_full() {
        let (mut tx, rx) = sync_channel(1);
        tx.emit(event(1));
        tx.emit(event(2));
        assert_eq!(rx.try_recv().unwrap().timestamp_ns, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_boxed_sink() {
        let (tx, rx) = channel();
        let mut sink: Box<dyn EventSink> = Box::new(tx);
        sink.emit(event(3));
        assert_eq!(rx.try_recv().unwrap().timestamp_ns, 3);
    }
}
