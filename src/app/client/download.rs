//! File download operations with retries and streaming writes
//!
//! A download streams the response body chunk by chunk into a sibling
//! temporary file and renames it over the destination once the body is
//! complete. The temporary file is owned by a guard that deletes it whenever
//! an attempt fails or the transfer future is dropped, so the destination path
//! only ever holds complete content. A failed download also clears an empty
//! file left at the destination by an earlier run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use url::Url;

use super::http::HttpHandler;
use super::retry::RetryState;
use crate::app::models::temp_path_for;
use crate::app::progress::{ProgressKind, ProgressReporter};
use crate::errors::{FetchError, FetchResult};

/// File download operations handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
    reporter: &'a ProgressReporter,
    read_timeout: Duration,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP handler
    ///
    /// `read_timeout` bounds the pause between two body chunks, not the
    /// length of the whole transfer.
    pub fn new(
        http_handler: &'a HttpHandler,
        reporter: &'a ProgressReporter,
        read_timeout: Duration,
    ) -> Self {
        Self {
            http_handler,
            reporter,
            read_timeout,
        }
    }

    /// Downloads `url` to `destination`, retrying transient failures
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// - `FetchError::Filesystem` if the parent directory or temp file cannot be created
    /// - `FetchError::TooManyRedirects` / `FetchError::InvalidUrl` immediately, without retry
    /// - `FetchError::Exhausted` once `max_attempts` attempts have failed
    pub async fn download_file(
        &self,
        url: &Url,
        destination: &Path,
        max_attempts: u32,
        retry_base_delay: Duration,
    ) -> FetchResult<u64> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| FetchError::Filesystem {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut retry = RetryState::new(max_attempts, retry_base_delay);
        loop {
            match self.download_file_attempt(url, destination).await {
                Ok(bytes) => {
                    info!("Downloaded {} ({} bytes)", destination.display(), bytes);
                    self.reporter
                        .report(destination, ProgressKind::Finished { bytes });
                    return Ok(bytes);
                }
                Err(e) if !e.is_retryable() => {
                    error!("Download of {} failed: {}", url, e);
                    remove_empty_destination(destination).await;
                    self.reporter.report(
                        destination,
                        ProgressKind::Failed {
                            reason: e.to_string(),
                        },
                    );
                    return Err(e);
                }
                Err(e) => {
                    let failed_attempt = retry.attempt() + 1;
                    match retry.next_delay() {
                        Some(delay) => {
                            warn!(
                                "Download failed (attempt {}/{}): {}. Retrying in {}ms",
                                failed_attempt,
                                retry.max_attempts(),
                                e,
                                delay.as_millis()
                            );
                            self.reporter.report(
                                destination,
                                ProgressKind::Retrying {
                                    attempt: failed_attempt,
                                    delay,
                                    reason: e.to_string(),
                                },
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            error!(
                                "Download failed after {} attempts: {}",
                                retry.max_attempts(),
                                e
                            );
                            remove_empty_destination(destination).await;
                            let exhausted = FetchError::Exhausted {
                                url: url.to_string(),
                                attempts: retry.max_attempts(),
                                last: Box::new(e),
                            };
                            self.reporter.report(
                                destination,
                                ProgressKind::Failed {
                                    reason: exhausted.to_string(),
                                },
                            );
                            return Err(exhausted);
                        }
                    }
                }
            }
        }
    }

    /// One request/stream cycle; leaves no temp file behind on error
    async fn download_file_attempt(&self, url: &Url, destination: &Path) -> FetchResult<u64> {
        let (response, final_url) = self.http_handler.get_following_redirects(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: final_url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length();
        let mut partial = PartialFile::create(temp_path_for(destination)).await?;
        self.reporter
            .report(destination, ProgressKind::Started { total_bytes });

        let stream_error = |reason: String| FetchError::Stream {
            url: final_url.to_string(),
            path: destination.to_path_buf(),
            reason,
        };

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::time::timeout(self.read_timeout, stream.next())
                .await
                .map_err(|_| FetchError::Timeout {
                    url: final_url.to_string(),
                    phase: "reading response body",
                    after: self.read_timeout,
                })?;
            let Some(chunk) = next else {
                break;
            };

            let chunk = chunk.map_err(|e| stream_error(e.to_string()))?;
            partial
                .write_all(&chunk)
                .await
                .map_err(|e| stream_error(e.to_string()))?;

            written += chunk.len() as u64;
            self.reporter
                .report(destination, ProgressKind::Advanced { bytes: written });
        }

        partial
            .persist(destination)
            .await
            .map_err(|e| stream_error(e.to_string()))?;

        debug!("Stream from {} complete: {} bytes", final_url, written);
        Ok(written)
    }
}

/// Remove a zero-length file at `destination`
///
/// Such a file never satisfies the skip rule, so after a failed fetch it would
/// only look like a download that half happened.
async fn remove_empty_destination(destination: &Path) {
    let is_empty_file = match tokio::fs::metadata(destination).await {
        Ok(metadata) => metadata.is_file() && metadata.len() == 0,
        Err(_) => false,
    };
    if !is_empty_file {
        return;
    }

    match tokio::fs::remove_file(destination).await {
        Ok(()) => debug!("Removed empty file {}", destination.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "Failed to remove empty file {}: {}",
            destination.display(),
            e
        ),
    }
}

/// Temporary download file, deleted on drop unless persisted
struct PartialFile {
    path: PathBuf,
    file: Option<File>,
    persisted: bool,
}

impl PartialFile {
    /// Create (or truncate) the temporary file
    async fn create(path: PathBuf) -> FetchResult<Self> {
        let file = File::create(&path)
            .await
            .map_err(|source| FetchError::Filesystem {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file: Some(file),
            persisted: false,
        })
    }

    async fn write_all(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(chunk).await,
            None => Err(std::io::Error::other("temporary file already closed")),
        }
    }

    /// Flush, close and rename over the destination
    async fn persist(mut self, destination: &Path) -> std::io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        tokio::fs::rename(&self.path, destination).await?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }

        drop(self.file.take());
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed partial file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove partial file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
