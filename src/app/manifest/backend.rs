//! Hosting backends for the model set
//!
//! The same repository layout is published on more than one host. A backend
//! turns a group's remote prefix into the base URL its files are fetched from,
//! so switching hosts is a configuration change rather than a second code path.

use serde::{Deserialize, Serialize};

use crate::constants::source;

/// Where the model artifacts are downloaded from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum HostingBackend {
    /// `https://github.com/{repo}/raw/{branch}/`
    GitHub { repo: String, branch: String },
    /// `https://huggingface.co/{repo}/resolve/{revision}/`
    HuggingFace { repo: String, revision: String },
    /// Any server exposing the repository layout below `base_url`
    Mirror { base_url: String },
}

impl Default for HostingBackend {
    fn default() -> Self {
        Self::github_default()
    }
}

impl HostingBackend {
    /// The default GitHub repository
    pub fn github_default() -> Self {
        Self::GitHub {
            repo: source::GITHUB_REPO.to_string(),
            branch: source::GITHUB_BRANCH.to_string(),
        }
    }

    /// The default Hugging Face repository
    pub fn huggingface_default() -> Self {
        Self::HuggingFace {
            repo: source::HUGGINGFACE_REPO.to_string(),
            revision: source::HUGGINGFACE_REVISION.to_string(),
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::GitHub { .. } => "GitHub",
            Self::HuggingFace { .. } => "Hugging Face",
            Self::Mirror { .. } => "mirror",
        }
    }

    /// Repository root URL, always ending in `/`
    pub fn root_url(&self) -> String {
        match self {
            Self::GitHub { repo, branch } => {
                format!("https://github.com/{}/raw/{}/", repo, branch)
            }
            Self::HuggingFace { repo, revision } => {
                format!("https://huggingface.co/{}/resolve/{}/", repo, revision)
            }
            Self::Mirror { base_url } => format!("{}/", base_url.trim_end_matches('/')),
        }
    }

    /// Base URL of a group stored below `remote_prefix`
    pub fn group_base_url(&self, remote_prefix: &str) -> String {
        let prefix = remote_prefix.trim_matches('/');
        if prefix.is_empty() {
            self.root_url()
        } else {
            format!("{}{}/", self.root_url(), prefix)
        }
    }
}
