//! Local directory layout of the downloaded model set
//!
//! `ModelPaths` is the accessor downstream consumers use to locate model
//! files. It is plain path arithmetic over an explicitly supplied root and
//! never touches the filesystem.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::constants::{files, source};

/// Resolved directories of the model set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelPaths {
    models_root: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self::new(files::DEFAULT_MODELS_DIR)
    }
}

impl ModelPaths {
    /// Create a layout rooted at `models_root`
    pub fn new(models_root: impl Into<PathBuf>) -> Self {
        Self {
            models_root: models_root.into(),
        }
    }

    /// Root directory all groups live under
    pub fn models_dir(&self) -> &Path {
        &self.models_root
    }

    /// Directory of a group, given its subpath below the root
    pub fn group_dir(&self, local_dir: impl AsRef<Path>) -> PathBuf {
        self.models_root.join(local_dir)
    }

    /// Speech-to-text model directory
    pub fn stt_dir(&self) -> PathBuf {
        self.group_dir(Path::new("stt").join(source::STT_MODEL_ID))
    }

    /// Text-to-speech model directory
    pub fn tts_dir(&self) -> PathBuf {
        self.group_dir("tts")
    }

    /// Speaker embedding model directory
    pub fn speaker_dir(&self) -> PathBuf {
        self.group_dir("speaker")
    }

    /// Identifier of the speech-to-text model
    pub fn stt_model_id(&self) -> &'static str {
        source::STT_MODEL_ID
    }

    /// Snapshot of every directory, for printing
    pub fn summary(&self) -> PathSummary {
        PathSummary {
            models_dir: self.models_root.clone(),
            stt_dir: self.stt_dir(),
            tts_dir: self.tts_dir(),
            speaker_dir: self.speaker_dir(),
            stt_model_id: self.stt_model_id().to_string(),
        }
    }
}

/// Serializable view of [`ModelPaths`]
#[derive(Debug, Clone, Serialize)]
pub struct PathSummary {
    pub models_dir: PathBuf,
    pub stt_dir: PathBuf,
    pub tts_dir: PathBuf,
    pub speaker_dir: PathBuf,
    pub stt_model_id: String,
}
