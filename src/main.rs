//! Model Fetcher CLI application
//!
//! Command-line interface for downloading the speech model artifacts.
//! Exits 0 when every file is in place, 1 on the first unrecoverable failure
//! and 130 when interrupted.

use std::process;

use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use model_fetcher::cli::{
    handle_download, handle_init, handle_manifest, handle_paths, load_config, Cli, Commands,
};
use model_fetcher::constants::exit;
use model_fetcher::errors::{AppError, ConfigError, Result};

#[tokio::main]
async fn main() {
    // Initialize program
    let result = run().await;

    // Handle any errors that occurred
    if let Err(e) = result {
        debug!("Run failed with a {} error", e.category());
        eprintln!("Error: {}", e);
        process::exit(exit_code(&e));
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok(); // Ignore errors if file doesn't exist

    // Parse command line arguments
    let cli = Cli::parse_args();

    let config = load_config(&cli.global).await?;

    // Initialize logging based on verbosity, falling back to the configured level
    init_logging(&cli, &config.logging.level)?;

    info!("Model Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    // Execute the appropriate command
    match cli.command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(&cli.global, config, args).await
        }
        Commands::Paths(args) => {
            info!("Executing paths command");
            handle_paths(config, args).await
        }
        Commands::Manifest(args) => {
            info!("Executing manifest command");
            handle_manifest(config, args).await
        }
        Commands::Init(args) => {
            info!("Executing init command");
            handle_init(&cli.global, args).await
        }
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli, configured_level: &str) -> Result<()> {
    let log_level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| configured_level.to_string());

    let directive = format!("model_fetcher={}", log_level)
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            field: "logging.level".to_string(),
            value: log_level.clone(),
            reason: "Expected one of error, warn, info, debug, trace".to_string(),
        })?;

    // Create environment filter
    let filter = EnvFilter::from_default_env().add_directive(directive);

    // Initialize subscriber
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }

    Ok(())
}

/// Map an error to the process exit status
fn exit_code(error: &AppError) -> i32 {
    if error.is_cancelled() {
        exit::INTERRUPTED
    } else {
        exit::FAILURE
    }
}
