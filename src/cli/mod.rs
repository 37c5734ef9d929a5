//! Command-line interface components
//!
//! This module contains CLI-specific code for the Model Fetcher application,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    Cli, Commands, DownloadArgs, GlobalArgs, InitArgs, ManifestArgs, PathsArgs, SourceArgs,
    SourceKind,
};
pub use commands::{
    handle_download, handle_init, handle_manifest, handle_paths, load_config, resolve_manifest,
};
pub use progress::{ProgressConfig, ProgressDisplay};
