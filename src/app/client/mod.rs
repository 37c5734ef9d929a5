//! HTTP fetcher for model artifacts
//!
//! This module provides the download primitive the orchestrator is built on:
//! one URL to one file, with redirect following, exponential backoff and
//! streaming writes.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: GET requests with manual redirect handling
//! - `retry`: per-transfer attempt counting and backoff
//! - `download`: retry loop and streaming, atomic file writes

use std::path::Path;

use async_trait::async_trait;
use url::Url;

use crate::app::progress::ProgressReporter;
use crate::errors::{FetchError, FetchResult, Result};

pub mod config;
pub mod download;
pub mod http;
pub mod retry;

pub use config::ClientConfig;
pub use retry::RetryState;

use download::DownloadHandler;
use http::HttpHandler;

/// Something that can place the body of a URL at a local path
///
/// The orchestrator only talks to this trait, which keeps it testable
/// without a network.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Download `url` to `destination`, returning the bytes written
    async fn fetch(&self, url: &Url, destination: &Path) -> FetchResult<u64>;
}

/// Fetcher backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http_handler: HttpHandler,
    config: ClientConfig,
    reporter: ProgressReporter,
}

impl HttpFetcher {
    /// Creates a fetcher with the given configuration
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the configuration is invalid or the
    /// HTTP client cannot be built
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.max_redirects, config.request_timeout);

        Ok(Self {
            http_handler,
            config,
            reporter: ProgressReporter::disabled(),
        })
    }

    /// Send progress events to `reporter`
    pub fn with_progress(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Download with an explicit attempt budget instead of the configured one
    pub async fn fetch_with_retries(
        &self,
        url: &Url,
        destination: &Path,
        max_retries: u32,
    ) -> FetchResult<u64> {
        DownloadHandler::new(&self.http_handler, &self.reporter, self.config.read_timeout)
            .download_file(url, destination, max_retries, self.config.retry_base_delay)
            .await
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url, destination: &Path) -> FetchResult<u64> {
        self.fetch_with_retries(url, destination, self.config.max_retries)
            .await
    }
}

/// One-shot download with default client settings
///
/// # Errors
///
/// Returns `AppError::Fetch` with `FetchError::InvalidUrl` for an unparseable
/// URL, or whatever the fetch itself fails with.
pub async fn fetch(url: &str, destination: &Path, max_retries: u32) -> Result<u64> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let fetcher = HttpFetcher::new(ClientConfig::default().with_max_retries(max_retries))?;
    Ok(fetcher
        .fetch_with_retries(&parsed, destination, max_retries)
        .await?)
}
