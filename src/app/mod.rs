//! Core application logic for Model Fetcher
//!
//! This module contains the main application components: the HTTP fetcher,
//! data models, manifest definitions, directory layout and the orchestrator
//! that ties them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use model_fetcher::app::{ClientConfig, Fetch, HttpFetcher};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpFetcher::new(ClientConfig::default())?;
//! let url = Url::parse("https://example.com/config.json")?;
//!
//! let bytes = fetcher.fetch(&url, Path::new("models/config.json")).await?;
//! println!("Wrote {} bytes", bytes);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod coordinator;
pub mod manifest;
pub mod models;
pub mod paths;
pub mod progress;

// Re-export main public API
pub use client::{fetch, ClientConfig, Fetch, HttpFetcher, RetryState};
pub use coordinator::{
    create_shutdown_channel, plan_tasks, Orchestrator, OrchestratorConfig, RunSummary,
    SignalHandler,
};
pub use manifest::{HostingBackend, Manifest, ModelGroup, BUILTIN_GROUPS};
pub use models::{DownloadTask, ManifestEntry, PlannedTask, TransferOutcome, TransferResult};
pub use paths::{ModelPaths, PathSummary};
pub use progress::{ProgressEvent, ProgressKind, ProgressReporter};
