//! Command handlers for Model Fetcher CLI
//!
//! This module implements the command handlers that turn CLI arguments and
//! the loaded configuration into calls on the core application.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::app::{
    create_shutdown_channel, plan_tasks, HttpFetcher, Manifest, ModelPaths, Orchestrator,
    ProgressReporter, SignalHandler,
};
use crate::cli::{
    DownloadArgs, GlobalArgs, InitArgs, ManifestArgs, PathsArgs, ProgressConfig,
    ProgressDisplay, SourceArgs,
};
use crate::config::AppConfig;
use crate::constants::workers;
use crate::errors::{AppError, ConfigError, Result};

/// Load configuration and apply the global CLI overrides
///
/// Environment overrides are applied by [`AppConfig::load`], so the
/// precedence is defaults, file, environment, then these flags.
pub async fn load_config(global: &GlobalArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load(global.config.clone()).await?;

    if let Some(dir) = &global.models_dir {
        config.paths.models_root = dir.clone();
    }

    Ok(config)
}

/// Build the manifest selected by `source`
///
/// A manifest file replaces the built-in model set; otherwise the built-in
/// set is resolved against the selected hosting backend.
pub async fn resolve_manifest(source: &SourceArgs, config: &AppConfig) -> Result<Manifest> {
    let manifest = match &source.manifest {
        Some(path) => {
            info!("Using manifest file: {}", path.display());
            Manifest::from_toml_file(path).await?
        }
        None => {
            let backend = source.backend(&config.source);
            info!("Using built-in manifest from {}", backend.name());
            Manifest::builtin(&backend)
        }
    };

    Ok(manifest.only(&source.groups)?)
}

/// Handle the download command
///
/// Runs the whole manifest, or just prints the plan with `--dry-run`.
pub async fn handle_download(
    global: &GlobalArgs,
    mut config: AppConfig,
    args: DownloadArgs,
) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    if let Some(workers) = args.workers {
        config.download.worker_count = workers;
    }
    if let Some(retries) = args.retries {
        config.download.max_retries = retries;
    }

    let manifest = resolve_manifest(&args.source, &config).await?;
    let runtime = config.to_runtime_config();
    info!(
        "Starting download of {} files with {} workers",
        manifest.total_files(),
        runtime.orchestrator.worker_count
    );

    if args.dry_run {
        return print_plan(&manifest, runtime.paths).await;
    }

    let show_progress = !args.no_progress && !global.quiet;
    let (reporter, mut display) = if show_progress {
        let (reporter, events) = ProgressReporter::channel(workers::PROGRESS_BUFFER_SIZE);
        let mut display = ProgressDisplay::new(ProgressConfig::default());
        display.start(manifest.total_files(), events);
        (reporter, Some(display))
    } else {
        (ProgressReporter::disabled(), None)
    };

    let fetcher = HttpFetcher::new(runtime.client)?.with_progress(reporter.clone());
    let orchestrator = Orchestrator::new(runtime.orchestrator, runtime.paths, Arc::new(fetcher))
        .with_progress(reporter);

    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let signal_task = SignalHandler::new(shutdown_tx).setup();

    let result = orchestrator.run_with_shutdown(&manifest, shutdown_rx).await;

    signal_task.abort();
    drop(orchestrator);
    if let Some(display) = display.as_mut() {
        display.finish().await;
    }

    let summary = result?;
    if !global.quiet {
        println!("{}", summary.summary_line());
    }
    Ok(())
}

/// Print every task and whether it would be fetched
async fn print_plan(manifest: &Manifest, paths: ModelPaths) -> Result<()> {
    let planned = plan_tasks(manifest, &paths).await?;
    let pending = planned.iter().filter(|p| !p.satisfied).count();

    println!(
        "Dry run - would download {} of {} files:",
        pending,
        planned.len()
    );
    for entry in &planned {
        let marker = if entry.satisfied { "present" } else { "fetch" };
        println!(
            "  [{:7}] {} -> {}",
            marker,
            entry.task.source_url,
            entry.task.destination.display()
        );
    }

    Ok(())
}

/// Handle the paths command
pub async fn handle_paths(config: AppConfig, args: PathsArgs) -> Result<()> {
    let root = absolute(config.paths.models_root)?;
    let summary = ModelPaths::new(root).summary();
    debug!("Resolved paths: {:?}", summary);

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| AppError::generic(format!("Failed to serialize paths: {}", e)))?;
        println!("{}", json);
    } else {
        println!("Models directory:  {}", summary.models_dir.display());
        println!("Speech-to-text:    {}", summary.stt_dir.display());
        println!("Text-to-speech:    {}", summary.tts_dir.display());
        println!("Speaker embedding: {}", summary.speaker_dir.display());
        println!("STT model id:      {}", summary.stt_model_id);
    }

    Ok(())
}

/// Handle the manifest command
pub async fn handle_manifest(config: AppConfig, args: ManifestArgs) -> Result<()> {
    args.source.validate().map_err(AppError::generic)?;

    let manifest = resolve_manifest(&args.source, &config).await?;

    if args.json {
        let json = serde_json::to_string_pretty(manifest.entries())
            .map_err(|e| AppError::generic(format!("Failed to serialize manifest: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    println!(
        "{} groups, {} files",
        manifest.entries().len(),
        manifest.total_files()
    );
    for entry in manifest.entries() {
        println!();
        println!("{} -> {}", entry.group_name, entry.local_dir.display());
        println!("  from {}", entry.base_url);
        for path in &entry.relative_paths {
            println!("  - {}", path);
        }
    }

    Ok(())
}

/// Handle the init command
pub async fn handle_init(global: &GlobalArgs, args: InitArgs) -> Result<()> {
    let path = match args.path {
        Some(path) => path,
        None => AppConfig::default_config_path().ok_or_else(|| ConfigError::InvalidValue {
            field: "path".to_string(),
            value: String::new(),
            reason: "Could not determine the user config directory; pass --path".to_string(),
        })?,
    };

    AppConfig::write_default_config(&path, args.force).await?;

    if !global.quiet {
        println!("Created default configuration file:");
        println!("  {}", path.display());
    }
    Ok(())
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
