//! Manifest definition, loading and validation
//!
//! A manifest is an ordered list of [`ManifestEntry`] groups. It comes either
//! from the built-in model set resolved against a [`HostingBackend`], or from a
//! TOML file with one `[[group]]` table per group:
//!
//! ```toml
//! [[group]]
//! name = "stt"
//! base_url = "https://host/stt/"
//! local_dir = "stt/onnx-community/whisper-base"  # optional, defaults to name
//! files = ["config.json", "onnx/encoder_model.onnx"]
//! ```

pub mod backend;
pub mod builtin;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::app::models::{
    is_safe_relative_path, is_valid_file_path, temp_path_for, DownloadTask, ManifestEntry,
};
use crate::app::paths::ModelPaths;
use crate::errors::{ManifestError, ManifestResult};

pub use backend::HostingBackend;
pub use builtin::{ModelGroup, BUILTIN_GROUPS};

/// Ordered collection of download groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(rename = "group", default)]
    groups: Vec<GroupToml>,
}

#[derive(Debug, Deserialize)]
struct GroupToml {
    name: String,
    base_url: String,
    local_dir: Option<PathBuf>,
    files: Vec<String>,
}

impl Manifest {
    /// Create a manifest from explicit entries
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// The built-in model set served by `backend`
    pub fn builtin(backend: &HostingBackend) -> Self {
        Self::new(
            BUILTIN_GROUPS
                .iter()
                .map(|group| group.to_entry(backend))
                .collect(),
        )
    }

    /// Parse a manifest from TOML text
    pub fn from_toml_str(content: &str) -> ManifestResult<Self> {
        let file: ManifestFile = toml::from_str(content)?;
        let entries = file
            .groups
            .into_iter()
            .map(|group| {
                let local_dir = group
                    .local_dir
                    .unwrap_or_else(|| PathBuf::from(&group.name));
                ManifestEntry::new(group.name, group.base_url, group.files)
                    .with_local_dir(local_dir)
            })
            .collect();

        Ok(Self::new(entries))
    }

    /// Load a manifest from a TOML file
    pub async fn from_toml_file(path: &Path) -> ManifestResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ManifestError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ManifestError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let manifest = Self::from_toml_str(&content)?;
        debug!(
            "Loaded manifest {} with {} groups",
            path.display(),
            manifest.entries.len()
        );
        Ok(manifest)
    }

    /// Groups in download order
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Group names in download order
    pub fn group_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.group_name.as_str())
            .collect()
    }

    /// Total number of files across all groups
    pub fn total_files(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.relative_paths.len())
            .sum()
    }

    /// Keep only the named groups, preserving manifest order
    ///
    /// An empty selection keeps everything.
    pub fn only(self, names: &[String]) -> ManifestResult<Self> {
        if names.is_empty() {
            return Ok(self);
        }

        for name in names {
            if !self.entries.iter().any(|entry| &entry.group_name == name) {
                return Err(ManifestError::UnknownGroup {
                    name: name.clone(),
                    available: self.group_names().join(", "),
                });
            }
        }

        let entries = self
            .entries
            .into_iter()
            .filter(|entry| names.contains(&entry.group_name))
            .collect();
        Ok(Self::new(entries))
    }

    /// Check the manifest and derive its tasks, grouped like the manifest
    ///
    /// # Errors
    ///
    /// - `ManifestError::Empty` for a manifest without groups
    /// - `ManifestError::DuplicateGroup` when two groups share a name
    /// - `ManifestError::InvalidBaseUrl` for a base URL that is not http(s)
    /// - `ManifestError::InvalidPath` for empty, absolute or escaping paths
    /// - `ManifestError::DuplicateDestination` when two files share a local path
    /// - `ManifestError::TempPathCollision` when a file is another file's temp path
    pub fn plan(&self, paths: &ModelPaths) -> ManifestResult<Vec<(String, Vec<DownloadTask>)>> {
        if self.entries.is_empty() {
            return Err(ManifestError::Empty);
        }

        let mut group_names = HashSet::new();
        let mut destinations = HashSet::new();
        let mut plan = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            if !group_names.insert(entry.group_name.as_str()) {
                return Err(ManifestError::DuplicateGroup {
                    name: entry.group_name.clone(),
                });
            }

            validate_base_url(entry)?;

            if !is_safe_relative_path(&entry.local_dir.to_string_lossy()) {
                return Err(ManifestError::InvalidPath {
                    group: entry.group_name.clone(),
                    path: entry.local_dir.display().to_string(),
                });
            }

            for relative_path in &entry.relative_paths {
                if !is_valid_file_path(relative_path) {
                    return Err(ManifestError::InvalidPath {
                        group: entry.group_name.clone(),
                        path: relative_path.clone(),
                    });
                }
            }

            let tasks = entry.tasks(paths);
            for task in &tasks {
                if !destinations.insert(task.destination.clone()) {
                    return Err(ManifestError::DuplicateDestination {
                        path: task.destination.clone(),
                    });
                }
            }

            plan.push((entry.group_name.clone(), tasks));
        }

        // A transfer truncates and renames its temp file, so no destination may
        // be another task's temp path
        for task in plan.iter().flat_map(|(_, tasks)| tasks) {
            let temp_path = temp_path_for(&task.destination);
            if destinations.contains(&temp_path) {
                return Err(ManifestError::TempPathCollision {
                    path: temp_path,
                    destination: task.destination.clone(),
                });
            }
        }

        Ok(plan)
    }
}

fn validate_base_url(entry: &ManifestEntry) -> ManifestResult<()> {
    let invalid = |reason: String| ManifestError::InvalidBaseUrl {
        group: entry.group_name.clone(),
        url: entry.base_url.clone(),
        reason,
    };

    let url = Url::parse(&entry.base_url).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}
