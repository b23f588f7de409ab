//! Progress reporting.
//!
//! The orchestrator pushes coarse events to a foreground consumer (CLI
//! progress bar, GUI, test harness) over an unbounded channel. Volume is a
//! handful of events per record, and the producer must never block between
//! page interactions, so unbounded is the right trade here.

use crate::core::models::{ProcessingStats, Status};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    BatchStarted {
        batch_number: usize,
        total_batches: usize,
        size: usize,
    },
    RecordProcessed {
        email: String,
        status: Status,
    },
    Log(String),
    RunCompleted(ProcessingStats),
    RunFailed(String),
}

pub type EventSender = mpsc::UnboundedSender<ProgressEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Fire-and-forget send; a dropped consumer must never stall the run.
pub(crate) fn emit(sender: &Option<EventSender>, event: ProgressEvent) {
    if let Some(sender) = sender {
        let _ = sender.send(event);
    }
}
