//! Error types for Model Fetcher
//!
//! This module defines the error types for all components of the application.
//! Errors are designed to be actionable: every message names the URL or path
//! involved together with the underlying cause, so a single line on stderr is
//! enough to diagnose a failed run.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors produced while fetching a single file
#[derive(Error, Debug)]
pub enum FetchError {
    /// Server answered with a non-success, non-redirect status
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Connection-level failure (DNS, TCP reset, TLS, timeout)
    #[error("Network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// No response headers, or no body data, within the configured window
    #[error("Timed out {phase} for {url} after {after:?}")]
    Timeout {
        url: String,
        phase: &'static str,
        after: Duration,
    },

    /// Failure while streaming an accepted response body to disk
    #[error("Transfer of {url} to {path} failed: {reason}")]
    Stream {
        url: String,
        path: PathBuf,
        reason: String,
    },

    /// Redirect chain longer than the configured hop limit
    #[error("Too many redirects (limit {limit}) starting from {url}")]
    TooManyRedirects { url: String, limit: usize },

    /// Every attempt for one file failed
    #[error("Download of {url} failed after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },

    /// Directory or file creation failed
    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// URL or redirect target could not be parsed
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Run was interrupted before the transfer finished
    #[error("Download cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether another attempt at the same file may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::HttpStatus { .. }
                | FetchError::Network { .. }
                | FetchError::Timeout { .. }
                | FetchError::Stream { .. }
        )
    }

    /// The failure that ended the final attempt, unwrapping `Exhausted`
    pub fn root_cause(&self) -> &FetchError {
        match self {
            FetchError::Exhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}

/// Manifest loading and validation errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("Manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// I/O error reading manifest
    #[error("I/O error reading manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest file is not valid TOML or misses required fields
    #[error("Invalid manifest format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Manifest contains no groups
    #[error("Manifest contains no groups")]
    Empty,

    /// Two groups share a name
    #[error("Duplicate group in manifest: {name}")]
    DuplicateGroup { name: String },

    /// Requested group is not part of the manifest
    #[error("Unknown group '{name}'. Available groups: {available}")]
    UnknownGroup { name: String, available: String },

    /// Group base URL cannot be parsed
    #[error("Invalid base URL for group '{group}': {url} - {reason}")]
    InvalidBaseUrl {
        group: String,
        url: String,
        reason: String,
    },

    /// Relative path is empty, absolute, escapes the group directory or names no file
    #[error("Invalid file path in group '{group}': {path}")]
    InvalidPath { group: String, path: String },

    /// Two entries resolve to the same local file
    #[error("Duplicate destination in manifest: {path}")]
    DuplicateDestination { path: PathBuf },

    /// A destination is the temporary file another transfer streams into
    #[error("Destination {path} clashes with the temporary file of {destination}")]
    TempPathCollision { path: PathBuf, destination: PathBuf },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be written
    #[error("Failed to write configuration file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Refused to overwrite an existing configuration file
    #[error("Configuration file already exists: {path} (use --force to overwrite)")]
    AlreadyExists { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// HTTP client could not be constructed from the settings
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Whether the run ended because it was interrupted
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Fetch(FetchError::Cancelled))
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Fetch(_) => "download",
            AppError::Manifest(_) => "manifest",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Manifest result type alias
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Config result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
