//! Batch orchestration of manifest downloads
//!
//! The orchestrator validates a [`Manifest`], then walks its groups in order.
//! Each group is handed to a [`WorkerPool`]; files already present are skipped
//! without touching the network and the first failure aborts the whole run.
//!
//! - [`config`] - Worker count and validation
//! - [`pool`] - Per-group worker pool
//! - [`signals`] - Signal handling for graceful shutdown
//! - [`stats`] - Run summary counters
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use model_fetcher::app::{
//!     ClientConfig, HostingBackend, HttpFetcher, Manifest, ModelPaths, Orchestrator,
//!     OrchestratorConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(HttpFetcher::new(ClientConfig::default())?);
//! let orchestrator = Orchestrator::new(
//!     OrchestratorConfig::default(),
//!     ModelPaths::new("models"),
//!     fetcher,
//! );
//!
//! let manifest = Manifest::builtin(&HostingBackend::default());
//! let summary = orchestrator.run(&manifest).await?;
//! println!("{}", summary.summary_line());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod pool;
pub mod signals;
pub mod stats;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::app::client::Fetch;
use crate::app::manifest::Manifest;
use crate::app::models::{destination_satisfied, PlannedTask};
use crate::app::paths::ModelPaths;
use crate::app::progress::ProgressReporter;
use crate::errors::Result;

pub use config::OrchestratorConfig;
pub use pool::{process_task, WorkerPool};
pub use signals::{create_shutdown_channel, wait_for_shutdown_signal, SignalHandler};
pub use stats::RunSummary;

/// Drives a manifest through the fetcher, group by group
pub struct Orchestrator {
    config: OrchestratorConfig,
    paths: ModelPaths,
    fetcher: Arc<dyn Fetch>,
    reporter: ProgressReporter,
}

impl Orchestrator {
    /// Create an orchestrator writing below `paths`
    pub fn new(config: OrchestratorConfig, paths: ModelPaths, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            config,
            paths,
            fetcher,
            reporter: ProgressReporter::disabled(),
        }
    }

    /// Send skip events to `reporter`
    ///
    /// Transfer events come from the fetcher itself, so the same reporter
    /// should usually be handed to both.
    pub fn with_progress(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Directory layout in use
    pub fn paths(&self) -> &ModelPaths {
        &self.paths
    }

    /// Run every group of `manifest` to completion
    ///
    /// # Errors
    ///
    /// - `AppError::Config` if the worker count is out of range
    /// - `AppError::Manifest` if the manifest fails validation; nothing is fetched
    /// - `AppError::Fetch` with the first transfer failure
    pub async fn run(&self, manifest: &Manifest) -> Result<RunSummary> {
        self.run_inner(manifest, None).await
    }

    /// Like [`run`](Self::run), but stops with `FetchError::Cancelled` once
    /// `shutdown` fires
    pub async fn run_with_shutdown(
        &self,
        manifest: &Manifest,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RunSummary> {
        self.run_inner(manifest, Some(&mut shutdown)).await
    }

    /// Resolve every task and its skip decision without any network call
    pub async fn plan(&self, manifest: &Manifest) -> Result<Vec<PlannedTask>> {
        plan_tasks(manifest, &self.paths).await
    }

    async fn run_inner(
        &self,
        manifest: &Manifest,
        mut shutdown: Option<&mut broadcast::Receiver<()>>,
    ) -> Result<RunSummary> {
        self.config.validate()?;
        let groups = manifest.plan(&self.paths)?;

        let mut summary = RunSummary {
            total_files: manifest.total_files(),
            ..Default::default()
        };

        info!(
            "Fetching {} files in {} groups into {} with {} worker(s)",
            summary.total_files,
            groups.len(),
            self.paths.models_dir().display(),
            self.config.worker_count
        );

        let pool = WorkerPool::new(
            self.config.worker_count,
            self.fetcher.clone(),
            self.reporter.clone(),
        );

        for (group, tasks) in groups {
            info!("Processing group '{}' ({} files)", group, tasks.len());
            let downloaded_before = summary.files_downloaded;

            pool.run(tasks, &mut summary, shutdown.as_deref_mut()).await?;

            summary.groups += 1;
            debug!(
                "Group '{}' done, {} files fetched",
                group,
                summary.files_downloaded - downloaded_before
            );
        }

        summary.finish();
        info!("Run complete: {}", summary.summary_line());
        Ok(summary)
    }
}

/// Validate `manifest` and pair each task with its skip decision
pub async fn plan_tasks(manifest: &Manifest, paths: &ModelPaths) -> Result<Vec<PlannedTask>> {
    let groups = manifest.plan(paths)?;

    let mut planned = Vec::with_capacity(manifest.total_files());
    for (_, tasks) in groups {
        for task in tasks {
            let satisfied = destination_satisfied(&task.destination).await;
            planned.push(PlannedTask { task, satisfied });
        }
    }

    Ok(planned)
}
