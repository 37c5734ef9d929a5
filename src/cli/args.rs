//! Command-line argument parsing for Model Fetcher
//!
//! This module defines the CLI structure using clap derive macros: the
//! download command, two inspection commands for the directory layout and
//! the manifest, and `init` for writing a starter configuration file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::app::HostingBackend;

/// Model Fetcher - Download speech model artifacts
#[derive(Parser, Debug)]
#[command(
    name = "model_fetcher",
    version,
    about = "Download the speech-to-text, text-to-speech and speaker model files",
    long_about = "Fetches every file of the model manifest into a local models directory.
Existing non-empty files are skipped, failed transfers are retried with exponential
backoff, and the first file that cannot be fetched aborts the run."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Models root directory
    #[arg(long, global = true, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download every missing model file
    Download(DownloadArgs),

    /// Show where each model group is stored
    Paths(PathsArgs),

    /// List manifest groups and their files
    Manifest(ManifestArgs),

    /// Write a commented default configuration file
    Init(InitArgs),
}

/// Hosts the built-in model set can be fetched from
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Github,
    Huggingface,
    Mirror,
}

/// Where the manifest and its files come from
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Hosting backend for the built-in manifest
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Base URL of the mirror (required with --source mirror)
    #[arg(long, value_name = "URL")]
    pub mirror_url: Option<String>,

    /// Use a TOML manifest file instead of the built-in model set
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Only process the named group (repeatable)
    #[arg(short, long = "group", value_name = "NAME")]
    pub groups: Vec<String>,
}

/// Arguments for the download command
#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of concurrent transfers within a group
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Attempts per file before the run is aborted
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// Dry run - show what would be downloaded without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Disable the progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the paths command
#[derive(Args, Debug, Clone, Default)]
pub struct PathsArgs {
    /// Print the paths as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the init command
#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    /// Where to write the file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    pub path: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the manifest command
#[derive(Args, Debug, Clone, Default)]
pub struct ManifestArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print the manifest as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested on the command line, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl SourceArgs {
    /// Check flag combinations that clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        match (self.source, &self.mirror_url) {
            (Some(SourceKind::Mirror), None) => {
                Err("--source mirror requires --mirror-url".to_string())
            }
            (Some(SourceKind::Github | SourceKind::Huggingface), Some(_)) => {
                Err("--mirror-url can only be used with --source mirror".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Backend selected on the command line, falling back to `configured`
    ///
    /// A bare `--mirror-url` selects the mirror backend.
    pub fn backend(&self, configured: &HostingBackend) -> HostingBackend {
        match (self.source, &self.mirror_url) {
            (Some(SourceKind::Github), _) => HostingBackend::github_default(),
            (Some(SourceKind::Huggingface), _) => HostingBackend::huggingface_default(),
            (_, Some(base_url)) => HostingBackend::Mirror {
                base_url: base_url.clone(),
            },
            _ => configured.clone(),
        }
    }
}

impl DownloadArgs {
    /// Validate download arguments
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;

        if self.workers == Some(0) {
            return Err("Number of workers must be greater than 0".to_string());
        }

        if self.retries == Some(0) {
            return Err("Number of retries must be greater than 0".to_string());
        }

        Ok(())
    }
}
