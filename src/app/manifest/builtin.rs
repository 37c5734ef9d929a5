//! The built-in model set
//!
//! Three groups, fetched in this order: the Whisper speech-to-text model, the
//! text-to-speech model, and the speaker embedding model.

use super::backend::HostingBackend;
use crate::app::models::ManifestEntry;

/// Static description of one group of the built-in model set
#[derive(Debug, Clone, Copy)]
pub struct ModelGroup {
    /// Group name
    pub name: &'static str,
    /// Path of the group inside the hosting repository
    pub remote_prefix: &'static str,
    /// Destination below the models root
    pub local_dir: &'static str,
    /// Files, in download order
    pub files: &'static [&'static str],
}

impl ModelGroup {
    /// Resolve this group against a hosting backend
    pub fn to_entry(&self, backend: &HostingBackend) -> ManifestEntry {
        ManifestEntry::new(
            self.name,
            backend.group_base_url(self.remote_prefix),
            self.files.iter().copied(),
        )
        .with_local_dir(self.local_dir)
    }
}

/// Whisper base, ONNX export
pub const STT_GROUP: ModelGroup = ModelGroup {
    name: "stt",
    remote_prefix: "models/stt/onnx-community/whisper-base/",
    local_dir: "stt/onnx-community/whisper-base",
    files: &[
        "config.json",
        "preprocessor_config.json",
        "tokenizer.json",
        "tokenizer_config.json",
        "vocab.json",
        "merges.txt",
        "onnx/encoder_model.onnx",
        "onnx/decoder_model_merged_q4.onnx",
        "onnx/decoder_model_merged.onnx",
    ],
};

/// Text-to-speech model
pub const TTS_GROUP: ModelGroup = ModelGroup {
    name: "tts",
    remote_prefix: "models/tts/",
    local_dir: "tts",
    files: &[
        "mimi_encoder.onnx",
        "text_conditioner.onnx",
        "flow_lm_main_int8.onnx",
        "flow_lm_flow_int8.onnx",
        "mimi_decoder_int8.onnx",
        "tokenizer.model",
    ],
};

/// Speaker embedding model
pub const SPEAKER_GROUP: ModelGroup = ModelGroup {
    name: "speaker",
    remote_prefix: "models/speaker/",
    local_dir: "speaker",
    files: &[
        "embedding_model.ckpt",
        "classifier.ckpt",
        "mean_var_norm_emb.ckpt",
        "hyperparams.yaml",
    ],
};

/// All built-in groups in download order
pub const BUILTIN_GROUPS: [ModelGroup; 3] = [STT_GROUP, TTS_GROUP, SPEAKER_GROUP];
