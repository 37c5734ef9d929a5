//! Application constants for Model Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for configuration overrides
pub mod env {
    /// Overrides the root directory that model groups are written under
    pub const MODELS_DIR: &str = "MODEL_FETCHER_MODELS_DIR";

    /// Overrides the number of concurrent download workers
    pub const WORKERS: &str = "MODEL_FETCHER_WORKERS";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("model-fetcher/", env!("CARGO_PKG_VERSION"));

    /// Time allowed for response headers to arrive
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Longest pause between two body chunks before the transfer is abandoned
    pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;

    /// Status codes that are followed as redirects when a Location header is present
    pub const REDIRECT_STATUSES: [u16; 4] = [301, 302, 307, 308];
}

/// Retry configuration
pub mod limits {
    use super::Duration;

    /// Attempts per file before giving up
    pub const MAX_RETRIES: u32 = 3;

    /// Delay before the first retry; doubled for every further attempt
    pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Default models root, relative to the working directory
    pub const DEFAULT_MODELS_DIR: &str = "models";

    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "model-fetcher.toml";

    /// Directory name under the user config directory
    pub const CONFIG_DIR_NAME: &str = "model-fetcher";
}

/// Worker and concurrency configuration
pub mod workers {
    /// Default number of download workers (sequential)
    pub const DEFAULT_WORKER_COUNT: usize = 1;

    /// Maximum recommended concurrent workers
    pub const MAX_WORKER_COUNT: usize = 16;

    /// Channel buffer size for progress reporting
    pub const PROGRESS_BUFFER_SIZE: usize = 256;
}

/// Default hosting locations for the built-in model set
pub mod source {
    /// GitHub repository holding the model artifacts
    pub const GITHUB_REPO: &str = "AnEntrypoint/sttttsmodels";

    /// Branch the artifacts are fetched from
    pub const GITHUB_BRANCH: &str = "main";

    /// Hugging Face repository mirroring the same layout
    pub const HUGGINGFACE_REPO: &str = "AnEntrypoint/sttttsmodels";

    /// Hugging Face revision
    pub const HUGGINGFACE_REVISION: &str = "main";

    /// Speech-to-text model identifier, also used as its directory below `stt/`
    pub const STT_MODEL_ID: &str = "onnx-community/whisper-base";
}

/// Process exit codes
pub mod exit {
    /// Any unrecoverable failure
    pub const FAILURE: i32 = 1;

    /// Run interrupted by Ctrl-C or SIGTERM
    pub const INTERRUPTED: i32 = 130;
}

// Re-export commonly used constants for convenience
pub use files::TEMP_FILE_SUFFIX;
pub use http::{MAX_REDIRECTS, USER_AGENT};
pub use limits::{MAX_RETRIES, RETRY_BASE_DELAY};
pub use workers::DEFAULT_WORKER_COUNT;
