//! Run statistics
//!
//! Counters for one orchestrator run, returned to the caller on success.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::models::TransferOutcome;

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Groups processed
    pub groups: usize,
    /// Files considered across all groups
    pub total_files: usize,
    /// Files fetched during this run
    pub files_downloaded: usize,
    /// Files already present
    pub files_skipped: usize,
    /// Bytes written during this run
    pub bytes_downloaded: u64,
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self {
            groups: 0,
            total_files: 0,
            files_downloaded: 0,
            files_skipped: 0,
            bytes_downloaded: 0,
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }
}

impl RunSummary {
    /// Count a successful outcome
    pub fn record(&mut self, outcome: &TransferOutcome) {
        match outcome {
            TransferOutcome::Skipped => self.files_skipped += 1,
            TransferOutcome::Downloaded { bytes } => {
                self.files_downloaded += 1;
                self.bytes_downloaded += bytes;
            }
            TransferOutcome::Failed(_) => {}
        }
    }

    /// Whether nothing had to be fetched
    pub fn is_noop(&self) -> bool {
        self.files_downloaded == 0
    }

    /// Close the run and record its duration
    pub fn finish(&mut self) {
        self.duration = Utc::now()
            .signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
    }

    /// One-line human readable summary
    pub fn summary_line(&self) -> String {
        format!(
            "{} downloaded ({:.1} MB), {} already present, {} groups in {:.1}s",
            self.files_downloaded,
            self.bytes_downloaded as f64 / 1024.0 / 1024.0,
            self.files_skipped,
            self.groups,
            self.duration.as_secs_f64()
        )
    }
}
