//! Configuration management for Model Fetcher
//!
//! This module provides unified configuration loading from defaults, an
//! optional TOML file and environment variables. CLI flags are applied on top
//! by the command layer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, HostingBackend, ModelPaths, OrchestratorConfig};
use crate::constants::{env, files, http, limits, workers};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Where model groups are written
    pub paths: PathsConfigToml,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Retry and concurrency settings
    pub download: DownloadConfigToml,
    /// Hosting backend for the built-in model set
    pub source: HostingBackend,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Local directory layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfigToml {
    /// Root directory every group directory lives under
    pub models_root: PathBuf,
}

impl Default for PathsConfigToml {
    fn default() -> Self {
        Self {
            models_root: PathBuf::from(files::DEFAULT_MODELS_DIR),
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Time allowed for response headers, e.g. "60s"
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Longest pause between body chunks, e.g. "60s"
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Connect timeout, e.g. "30s"
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Connection pool idle timeout (absent = no timeout)
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Option<Duration>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            read_timeout: http::READ_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            tcp_nodelay: true,
        }
    }
}

/// TOML-friendly download configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfigToml {
    /// Attempts per file before the run is aborted
    pub max_retries: u32,
    /// First backoff delay, doubled per attempt
    #[serde(with = "humantime_serde")]
    pub retry_base_delay: Duration,
    /// Redirect hops followed per request
    pub max_redirects: usize,
    /// Concurrent transfers within a group
    pub worker_count: usize,
}

impl Default for DownloadConfigToml {
    fn default() -> Self {
        Self {
            max_retries: limits::MAX_RETRIES,
            retry_base_delay: limits::RETRY_BASE_DELAY,
            max_redirects: http::MAX_REDIRECTS,
            worker_count: workers::DEFAULT_WORKER_COUNT,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Runtime configuration derived from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub client: ClientConfig,
    pub orchestrator: OrchestratorConfig,
    pub paths: ModelPaths,
    pub backend: HostingBackend,
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            client: self.client.to_runtime_config(&self.download),
            orchestrator: OrchestratorConfig::default()
                .with_worker_count(self.download.worker_count),
            paths: ModelPaths::new(&self.paths.models_root),
            backend: self.source.clone(),
        }
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    ///
    /// CLI arguments are applied afterwards by the caller.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `MODEL_FETCHER_*` overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(env::MODELS_DIR).filter(|dir| !dir.is_empty()) {
            debug!("{} overrides models root: {}", env::MODELS_DIR, dir);
            self.paths.models_root = PathBuf::from(dir);
        }

        if let Some(value) = lookup(env::WORKERS) {
            self.download.worker_count =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: env::WORKERS.to_string(),
                        value: value.clone(),
                        reason: "Expected a positive integer".to_string(),
                    })?;
        }

        Ok(())
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(files::LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        match &found {
            Some(path) => debug!("Found config file: {}", path.display()),
            None => debug!("No config file found in standard locations"),
        }
        found
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Write the commented default configuration to `path`
    ///
    /// Parent directories are created as needed. An existing file is only
    /// replaced when `force` is set.
    pub async fn write_default_config(path: &Path, force: bool) -> ConfigResult<()> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }

        tokio::fs::write(path, Self::generate_default_config_content())
            .await
            .map_err(write_error)?;

        info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        format!(
            r#"# Model Fetcher Configuration
# Every setting is optional; omitted values use the defaults shown here.

[paths]
# Root directory the model groups are written under
models_root = "{}"

[client]
# Time allowed for response headers on each request
request_timeout = "60s"
# Longest stall between body chunks; a slow but steady transfer is never cut off
read_timeout = "60s"
connect_timeout = "30s"
pool_idle_timeout = "90s"
tcp_nodelay = true

[download]
# Attempts per file; the run aborts once they are used up
max_retries = {}
# First backoff delay, doubled for every further attempt
retry_base_delay = "1s"
max_redirects = {}
# Concurrent transfers within a group (1 = sequential)
worker_count = {}

[source]
# github, huggingface or mirror
backend = "github"
repo = "AnEntrypoint/sttttsmodels"
branch = "main"
# backend = "mirror"
# base_url = "https://models.example.internal/sttttsmodels"

[logging]
level = "warn"  # error, warn, info, debug, trace
"#,
            files::DEFAULT_MODELS_DIR,
            limits::MAX_RETRIES,
            http::MAX_REDIRECTS,
            workers::DEFAULT_WORKER_COUNT,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self, download: &DownloadConfigToml) -> ClientConfig {
        ClientConfig {
            request_timeout: self.request_timeout,
            read_timeout: self.read_timeout,
            connect_timeout: self.connect_timeout,
            pool_idle_timeout: self.pool_idle_timeout,
            tcp_nodelay: self.tcp_nodelay,
            max_retries: download.max_retries,
            retry_base_delay: download.retry_base_delay,
            max_redirects: download.max_redirects,
        }
    }
}
