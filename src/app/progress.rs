//! Progress events emitted while fetching
//!
//! Progress is observability only. Events are pushed with `try_send` into a
//! bounded channel and silently dropped when the consumer falls behind, so a
//! slow display can never stall a transfer.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;

/// A single progress notification
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Destination the event refers to
    pub destination: PathBuf,
    /// What happened
    pub kind: ProgressKind,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}

/// Kinds of progress notifications
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressKind {
    /// Headers accepted, body transfer starting
    Started { total_bytes: Option<u64> },
    /// Bytes written so far for the current attempt
    Advanced { bytes: u64 },
    /// Attempt failed, next one starts after `delay`
    Retrying {
        attempt: u32,
        delay: Duration,
        reason: String,
    },
    /// File written and moved into place
    Finished { bytes: u64 },
    /// File already present, nothing fetched
    Skipped,
    /// Fetch gave up
    Failed { reason: String },
}

/// Cheap, cloneable handle for emitting progress
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressReporter {
    /// Reporter that discards every event
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Reporter feeding the given channel
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Create a reporter together with the receiving end
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    /// Emit an event without waiting
    pub fn report(&self, destination: &std::path::Path, kind: ProgressKind) {
        let Some(tx) = &self.tx else {
            return;
        };

        let event = ProgressEvent {
            destination: destination.to_path_buf(),
            kind,
            timestamp: Utc::now(),
        };

        if let Err(e) = tx.try_send(event) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    debug!("Progress channel full, skipping update");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    debug!("Progress channel closed");
                }
            }
        }
    }
}
