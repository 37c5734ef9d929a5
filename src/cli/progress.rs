//! Progress display for download runs
//!
//! This module renders the fetcher's progress events with indicatif: one
//! overall bar counting files, plus one bar per transfer in flight. When
//! stderr is not a terminal the display falls back to plain log lines.
//!
//! # Examples
//!
//! ```rust,no_run
//! use model_fetcher::app::ProgressReporter;
//! use model_fetcher::cli::{ProgressConfig, ProgressDisplay};
//!
//! # async fn example() {
//! let (reporter, events) = ProgressReporter::channel(256);
//! let mut display = ProgressDisplay::new(ProgressConfig::default());
//! display.start(19, events);
//!
//! // hand `reporter` to the fetcher and orchestrator, run them, then:
//! display.finish().await;
//! # drop(reporter);
//! # }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::{ProgressEvent, ProgressKind};

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Enable visual progress bars
    pub enable_progress_bars: bool,
    /// Maximum width for file names in display
    pub max_filename_width: usize,
    /// Spinner tick interval
    pub tick_interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bars: true,
            max_filename_width: 40,
            tick_interval: Duration::from_millis(120),
        }
    }
}

/// Main progress display manager
pub struct ProgressDisplay {
    config: ProgressConfig,
    is_terminal: bool,
    update_task: Option<JoinHandle<()>>,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl ProgressDisplay {
    /// Create a new progress display with the given configuration
    pub fn new(config: ProgressConfig) -> Self {
        let is_terminal = atty::is(atty::Stream::Stderr);

        Self {
            config,
            is_terminal,
            update_task: None,
            shutdown_tx: None,
        }
    }

    /// Whether bars are drawn rather than text lines
    pub fn uses_bars(&self) -> bool {
        self.config.enable_progress_bars && self.is_terminal
    }

    /// Start consuming `events` for a run of `total_files` files
    pub fn start(&mut self, total_files: usize, events: mpsc::Receiver<ProgressEvent>) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = if self.uses_bars() {
            let bars = BarState::new(total_files, &self.config);
            tokio::spawn(run_bars(bars, events, shutdown_rx))
        } else {
            tokio::spawn(run_text(total_files, events, shutdown_rx))
        };

        self.update_task = Some(task);
        self.shutdown_tx = Some(shutdown_tx);
        debug!("Progress display started for {} files", total_files);
    }

    /// Stop the display and clear any bars still on screen
    pub async fn finish(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.update_task.take() {
            let _ = task.await;
        }
    }
}

struct BarState {
    multi: MultiProgress,
    overall: ProgressBar,
    transfers: HashMap<PathBuf, ProgressBar>,
    max_filename_width: usize,
    tick_interval: Duration,
}

impl BarState {
    fn new(total_files: usize, config: &ProgressConfig) -> Self {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total_files as u64));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
        {
            overall.set_style(style.progress_chars("##-"));
        }
        overall.enable_steady_tick(config.tick_interval);

        Self {
            multi,
            overall,
            transfers: HashMap::new(),
            max_filename_width: config.max_filename_width,
            tick_interval: config.tick_interval,
        }
    }

    fn handle(&mut self, event: ProgressEvent) {
        match event.kind {
            ProgressKind::Started { total_bytes } => {
                let name = truncate_filename(&display_name(&event.destination), self.max_filename_width);
                let bar = match total_bytes {
                    Some(total) => {
                        let bar = ProgressBar::new(total);
                        if let Ok(style) = ProgressStyle::default_bar().template(
                            "  {msg:40} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec}",
                        ) {
                            bar.set_style(style.progress_chars("##-"));
                        }
                        bar
                    }
                    None => {
                        let bar = ProgressBar::new_spinner();
                        if let Ok(style) =
                            ProgressStyle::default_spinner().template("  {msg:40} {spinner:.blue} {bytes}")
                        {
                            bar.set_style(style);
                        }
                        bar.enable_steady_tick(self.tick_interval);
                        bar
                    }
                };
                bar.set_message(name);

                let bar = self.multi.add(bar);
                if let Some(previous) = self.transfers.insert(event.destination, bar) {
                    previous.finish_and_clear();
                }
            }
            ProgressKind::Advanced { bytes } => {
                if let Some(bar) = self.transfers.get(&event.destination) {
                    bar.set_position(bytes);
                }
            }
            ProgressKind::Retrying { attempt, delay, .. } => {
                if let Some(bar) = self.transfers.remove(&event.destination) {
                    bar.finish_and_clear();
                }
                self.overall.set_message(format!(
                    "retrying {} (attempt {}) in {:?}",
                    display_name(&event.destination),
                    attempt + 1,
                    delay
                ));
            }
            ProgressKind::Finished { .. } => {
                if let Some(bar) = self.transfers.remove(&event.destination) {
                    bar.finish_and_clear();
                }
                self.overall.set_message("");
                self.overall.inc(1);
            }
            ProgressKind::Skipped => self.overall.inc(1),
            ProgressKind::Failed { .. } => {
                if let Some(bar) = self.transfers.remove(&event.destination) {
                    bar.abandon();
                }
            }
        }
    }

    fn clear(&mut self) {
        for (_, bar) in self.transfers.drain() {
            bar.finish_and_clear();
        }
        self.overall.finish_and_clear();
    }
}

async fn run_bars(
    mut bars: BarState,
    mut events: mpsc::Receiver<ProgressEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => bars.handle(event),
                None => break,
            },
            _ = shutdown_rx.recv() => break,
        }
    }

    bars.clear();
}

async fn run_text(
    total_files: usize,
    mut events: mpsc::Receiver<ProgressEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut done = 0usize;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if let Some(line) = text_line(&event, &mut done, total_files) {
                        eprintln!("{}", line);
                    }
                }
                None => break,
            },
            _ = shutdown_rx.recv() => break,
        }
    }
}

/// Log line for an event in text mode
fn text_line(event: &ProgressEvent, done: &mut usize, total_files: usize) -> Option<String> {
    let name = event.destination.display();
    match &event.kind {
        ProgressKind::Finished { bytes } => {
            *done += 1;
            Some(format!(
                "[{}/{}] Downloaded {} ({} bytes)",
                done, total_files, name, bytes
            ))
        }
        ProgressKind::Skipped => {
            *done += 1;
            Some(format!("[{}/{}] Already present: {}", done, total_files, name))
        }
        ProgressKind::Retrying {
            attempt,
            delay,
            reason,
        } => Some(format!(
            "Retrying {} (attempt {}) in {:?}: {}",
            name,
            attempt + 1,
            delay,
            reason
        )),
        _ => None,
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Shorten a file name to `max_width` characters, keeping its end
fn truncate_filename(name: &str, max_width: usize) -> String {
    let count = name.chars().count();
    if count <= max_width || max_width < 4 {
        return name.to_string();
    }

    let tail: String = name.chars().skip(count - (max_width - 3)).collect();
    format!("...{}", tail)
}
