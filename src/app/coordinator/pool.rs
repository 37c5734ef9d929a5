//! Worker pool for one group of download tasks
//!
//! Workers pull tasks from a shared queue, apply the skip rule, fetch what is
//! missing and report each result over a channel. The first failure stops
//! the pool: remaining queued tasks are never started and in-flight transfers
//! are aborted, which drops their partial files.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error};
use url::Url;

use super::signals::wait_for_shutdown_signal;
use super::stats::RunSummary;
use crate::app::client::Fetch;
use crate::app::models::{destination_satisfied, DownloadTask, TransferOutcome, TransferResult};
use crate::app::progress::{ProgressKind, ProgressReporter};
use crate::errors::{AppError, FetchError, Result};

/// Runs the tasks of one group with bounded concurrency
pub struct WorkerPool {
    worker_count: usize,
    fetcher: Arc<dyn Fetch>,
    reporter: ProgressReporter,
}

impl WorkerPool {
    /// Create a pool of `worker_count` workers sharing one fetcher
    pub fn new(worker_count: usize, fetcher: Arc<dyn Fetch>, reporter: ProgressReporter) -> Self {
        Self {
            worker_count: worker_count.max(1),
            fetcher,
            reporter,
        }
    }

    /// Process `tasks` in queue order, recording outcomes into `summary`
    ///
    /// # Errors
    ///
    /// Returns the first task failure, `FetchError::Cancelled` when shutdown
    /// is signalled, or a generic error if a worker panics.
    pub async fn run(
        &self,
        tasks: Vec<DownloadTask>,
        summary: &mut RunSummary,
        mut shutdown: Option<&mut broadcast::Receiver<()>>,
    ) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let worker_count = self.worker_count.min(tasks.len());
        let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let (result_tx, mut result_rx) = mpsc::channel::<TransferResult>(worker_count);

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let queue = queue.clone();
            let fetcher = self.fetcher.clone();
            let reporter = self.reporter.clone();
            let result_tx = result_tx.clone();

            workers.spawn(async move {
                loop {
                    let Some(task) = queue.lock().await.pop_front() else {
                        break;
                    };
                    debug!("Worker {} picked up {}", worker_id, task.source_url);

                    let result = process_task(fetcher.as_ref(), &reporter, task).await;
                    let failed = !result.outcome.is_success();
                    if result_tx.send(result).await.is_err() || failed {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        loop {
            let next = tokio::select! {
                result = result_rx.recv() => result,
                _ = wait_for_shutdown_signal(shutdown.as_deref_mut()) => {
                    debug!("Shutdown requested, stopping workers");
                    workers.shutdown().await;
                    return Err(FetchError::Cancelled.into());
                }
            };

            let Some(result) = next else {
                break;
            };

            if let TransferOutcome::Failed(e) = result.outcome {
                error!(
                    "Failed to fetch {} into {}: {}",
                    result.task.source_url,
                    result.task.destination.display(),
                    e
                );
                workers.shutdown().await;
                return Err(e.into());
            }

            summary.record(&result.outcome);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    return Err(AppError::generic(format!("Download worker panicked: {}", e)));
                }
            }
        }

        Ok(())
    }
}

/// Apply the skip rule, then fetch
pub async fn process_task(
    fetcher: &dyn Fetch,
    reporter: &ProgressReporter,
    task: DownloadTask,
) -> TransferResult {
    if destination_satisfied(&task.destination).await {
        debug!("Skipping {}, already present", task.destination.display());
        reporter.report(&task.destination, ProgressKind::Skipped);
        return TransferResult {
            task,
            outcome: TransferOutcome::Skipped,
        };
    }

    let url = match Url::parse(&task.source_url) {
        Ok(url) => url,
        Err(e) => {
            let error = FetchError::InvalidUrl {
                url: task.source_url.clone(),
                reason: e.to_string(),
            };
            return TransferResult {
                task,
                outcome: TransferOutcome::Failed(error),
            };
        }
    };

    let outcome = match fetcher.fetch(&url, &task.destination).await {
        Ok(bytes) => TransferOutcome::Downloaded { bytes },
        Err(e) => TransferOutcome::Failed(e),
    };

    TransferResult { task, outcome }
}
