//! Channels between the scan loop, the quantity readers and the caller.
//!
//! The scan loop sends matched slots to the readers over a work queue; every
//! progress message, read quantity and the final result reach the caller as
//! [`ScanEvent`]s on a second channel.

use chrono::{DateTime, Local};
use image::RgbImage;
use std::sync::mpsc::{Receiver, Sender, channel};

use crate::catalog::EntryId;
use crate::scan::snapshot::Amount;

/// A matched slot waiting for its quantity to be read.
#[derive(Debug, Clone)]
pub struct ReadJob {
    /// Position in the depot order
    pub position: usize,
    pub entry: EntryId,
    /// The whole slot image
    pub slot: RgbImage,
    pub queued_at: DateTime<Local>,
}

impl ReadJob {
    pub fn new(position: usize, entry: EntryId, slot: RgbImage) -> Self {
        Self {
            position,
            entry,
            slot,
            queued_at: Local::now(),
        }
    }
}

/// Progress reported to the caller, in the order things happen.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Status(String),
    Material { entry: EntryId, amount: Amount },
    Finished { success: bool },
}

/// Creates the reader work queue. Unbounded: matching is faster than
/// reading, so jobs queue up until a reader is free.
pub fn create_job_queue() -> (Sender<ReadJob>, Receiver<ReadJob>) {
    channel()
}

pub fn create_event_channel() -> (Sender<ScanEvent>, Receiver<ScanEvent>) {
    channel()
}
