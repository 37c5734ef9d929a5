//! Model Fetcher Library
//!
//! A Rust library for downloading the speech-to-text, text-to-speech and
//! speaker model artifacts into a local models directory. Provides idempotent,
//! fail-fast batch downloading with redirect following, exponential backoff
//! and atomic file writes.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
