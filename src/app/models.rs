//! Data models for Model Fetcher
//!
//! This module defines the core data structures used throughout the application:
//! manifest groups, the per-file download tasks derived from them, and the
//! per-task results the orchestrator aggregates.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::paths::ModelPaths;
use crate::constants::files;
use crate::errors::FetchError;

/// A named group of files sharing a base URL and a destination directory
///
/// Groups are static for the whole run. The base URL is the remote prefix
/// every relative path is appended to; the local directory is relative to
/// the models root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Group name (e.g., "stt")
    pub group_name: String,
    /// Remote prefix the relative paths are appended to
    pub base_url: String,
    /// Destination directory relative to the models root
    pub local_dir: PathBuf,
    /// Files of the group, in download order
    pub relative_paths: Vec<String>,
}

impl ManifestEntry {
    /// Create a group whose local directory is named after the group
    pub fn new<S: Into<String>>(
        group_name: impl Into<String>,
        base_url: impl Into<String>,
        relative_paths: impl IntoIterator<Item = S>,
    ) -> Self {
        let group_name = group_name.into();
        Self {
            local_dir: PathBuf::from(&group_name),
            group_name,
            base_url: base_url.into(),
            relative_paths: relative_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Override the destination directory of the group
    pub fn with_local_dir(mut self, local_dir: impl Into<PathBuf>) -> Self {
        self.local_dir = local_dir.into();
        self
    }

    /// Build the source URL of one file by appending it to the base URL
    pub fn source_url(&self, relative_path: &str) -> String {
        let relative_path = relative_path.trim_start_matches('/');
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, relative_path)
        } else {
            format!("{}/{}", self.base_url, relative_path)
        }
    }

    /// Derive the download tasks of this group, in listed order
    pub fn tasks(&self, paths: &ModelPaths) -> Vec<DownloadTask> {
        let group_dir = paths.group_dir(&self.local_dir);
        self.relative_paths
            .iter()
            .map(|relative_path| DownloadTask {
                group: self.group_name.clone(),
                relative_path: relative_path.clone(),
                source_url: self.source_url(relative_path),
                destination: destination_for(&group_dir, relative_path),
            })
            .collect()
    }
}

/// A single file to fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTask {
    /// Group the file belongs to
    pub group: String,
    /// Path of the file relative to the group
    pub relative_path: String,
    /// Full URL the file is fetched from
    pub source_url: String,
    /// Local path the file is written to
    pub destination: PathBuf,
}

impl DownloadTask {
    /// Short name used in progress output
    pub fn display_name(&self) -> String {
        self.destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.relative_path.clone())
    }
}

/// Map a `/`-separated relative path onto a group directory
///
/// Each segment becomes a path component, so `onnx/encoder_model.onnx` lands
/// in an `onnx` subdirectory on every platform.
pub fn destination_for(group_dir: &Path, relative_path: &str) -> PathBuf {
    relative_path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .fold(group_dir.to_path_buf(), |path, segment| path.join(segment))
}

/// Whether a relative path stays inside its group directory
pub fn is_safe_relative_path(relative_path: &str) -> bool {
    if relative_path.trim().is_empty() || relative_path.starts_with('/') {
        return false;
    }

    let path = Path::new(relative_path);
    !relative_path.split('/').any(|segment| segment == "..")
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Whether a manifest file path names a file inside its group directory
///
/// On top of [`is_safe_relative_path`] this needs at least one real path
/// segment and no trailing `/`, so `.` or `sub/` cannot resolve to a directory.
pub fn is_valid_file_path(relative_path: &str) -> bool {
    is_safe_relative_path(relative_path)
        && !relative_path.ends_with('/')
        && Path::new(relative_path)
            .components()
            .any(|component| matches!(component, Component::Normal(_)))
}

/// Sibling path a transfer streams into before it is renamed into place
pub fn temp_path_for(destination: &Path) -> PathBuf {
    let mut file_name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("download"));
    file_name.push(files::TEMP_FILE_SUFFIX);
    destination.with_file_name(file_name)
}

/// Skip rule: a destination counts as satisfied when it is a non-empty file
pub async fn destination_satisfied(destination: &Path) -> bool {
    match tokio::fs::metadata(destination).await {
        Ok(metadata) => metadata.is_file() && metadata.len() > 0,
        Err(_) => false,
    }
}

/// How a single task ended
#[derive(Debug)]
pub enum TransferOutcome {
    /// Destination already present and non-empty, no request issued
    Skipped,
    /// File fetched and written
    Downloaded { bytes: u64 },
    /// Fetch failed; aborts the run
    Failed(FetchError),
}

impl TransferOutcome {
    /// Whether the task left its destination in place
    pub fn is_success(&self) -> bool {
        !matches!(self, TransferOutcome::Failed(_))
    }
}

/// Result of one task, reported back to the orchestrator
#[derive(Debug)]
pub struct TransferResult {
    /// The task this result belongs to
    pub task: DownloadTask,
    /// What happened to it
    pub outcome: TransferOutcome,
}

/// A task together with its skip decision, used for dry runs
#[derive(Debug, Clone, Serialize)]
pub struct PlannedTask {
    /// The task
    pub task: DownloadTask,
    /// Whether the destination is already satisfied
    pub satisfied: bool,
}
