//! Delivery of process-start notifications to the fix worker.
//!
//! A source (ETW on Windows) owns clones of a [`ProcessStartSink`] and
//! calls [`ProcessStartSink::indicate`] from its own callback thread. The
//! worker drains the paired receiver. Every clone holds a reference on the
//! channel; once the last one is dropped the receiver disconnects and the
//! worker loop ends.

use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use tracing::trace;

use crate::error::StartupError;
use crate::ps::matches_process_name;
use crate::window::ProcessId;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessStartEvent {
    pub pid: ProcessId,
    pub parent_pid: Option<ProcessId>,
    /// Image path as reported by the OS, usually an NT device path.
    pub image_name: String,
    pub observed_at: DateTime<Local>,
}

impl ProcessStartEvent {
    pub fn new(pid: ProcessId, parent_pid: Option<ProcessId>, image_name: &str) -> Self {
        Self {
            pid,
            parent_pid,
            image_name: image_name.to_string(),
            observed_at: Local::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessStartSink {
    process_name: Arc<str>,
    tx: Sender<ProcessStartEvent>,
}

impl ProcessStartSink {
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Forward `event` if its image matches the watched executable.
    ///
    /// Returns false when the event was filtered out or nobody is listening
    /// anymore.
    pub fn indicate(&self, event: ProcessStartEvent) -> bool {
        if !matches_process_name(&event.image_name, &self.process_name) {
            trace!(pid = event.pid, image = %event.image_name, "ignoring process start");
            return false;
        }
        self.tx.send(event).is_ok()
    }
}

/// Create a sink for starts of `process_name` and the worker's receiver.
pub fn sink_channel(process_name: &str) -> (ProcessStartSink, Receiver<ProcessStartEvent>) {
    let (tx, rx) = unbounded();
    (
        ProcessStartSink {
            process_name: Arc::from(process_name),
            tx,
        },
        rx,
    )
}

/// Something that can report process starts asynchronously after a
/// one-time subscription.
pub trait ProcessStartSource {
    /// Start delivering events to `sink`. Failure is fatal at startup.
    fn subscribe(&mut self, sink: ProcessStartSink) -> Result<(), StartupError>;
}
