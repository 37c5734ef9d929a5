//! Unit tests for the orchestrator
//!
//! These run against an in-memory fetcher that records every call. Tests
//! against a real HTTP server live in the top-level tests directory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use url::Url;

use crate::app::client::Fetch;
use crate::app::manifest::Manifest;
use crate::app::models::ManifestEntry;
use crate::app::paths::ModelPaths;
use crate::errors::{AppError, FetchError, FetchResult, ManifestError};

use super::*;

/// Fetcher that writes the URL as file content and records what it was asked for
#[derive(Default)]
struct RecordingFetcher {
    calls: Mutex<Vec<String>>,
    fail_on: Option<String>,
    delay: Option<Duration>,
}

impl RecordingFetcher {
    fn failing_on(suffix: &str) -> Self {
        Self {
            fail_on: Some(suffix.to_string()),
            ..Default::default()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for RecordingFetcher {
    async fn fetch(&self, url: &Url, destination: &Path) -> FetchResult<u64> {
        self.calls.lock().unwrap().push(url.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(suffix) = &self.fail_on {
            if url.path().ends_with(suffix.as_str()) {
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: 3,
                    last: Box::new(FetchError::HttpStatus {
                        url: url.to_string(),
                        status: 503,
                    }),
                });
            }
        }

        let body = url.as_str().as_bytes();
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(destination, body).await.unwrap();
        Ok(body.len() as u64)
    }
}

fn two_group_manifest() -> Manifest {
    Manifest::new(vec![
        ManifestEntry::new("stt", "https://host/stt/", ["a.json", "sub/b.onnx"]),
        ManifestEntry::new("tts", "https://host/tts/", ["model.onnx"]),
    ])
}

fn orchestrator(root: &Path, fetcher: Arc<RecordingFetcher>, workers: usize) -> Orchestrator {
    Orchestrator::new(
        OrchestratorConfig::default().with_worker_count(workers),
        ModelPaths::new(root),
        fetcher,
    )
}

fn stt_file(root: &Path, relative: &str) -> PathBuf {
    root.join("stt").join(relative)
}

#[tokio::test]
async fn test_run_fetches_in_manifest_order() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = Arc::new(RecordingFetcher::default());

    let summary = orchestrator(temp_dir.path(), fetcher.clone(), 1)
        .run(&two_group_manifest())
        .await
        .unwrap();

    assert_eq!(
        fetcher.calls(),
        [
            "https://host/stt/a.json",
            "https://host/stt/sub/b.onnx",
            "https://host/tts/model.onnx"
        ]
    );
    assert_eq!(summary.groups, 2);
    assert_eq!(summary.files_downloaded, 3);
    assert_eq!(summary.files_skipped, 0);
    assert!(stt_file(temp_dir.path(), "sub/b.onnx").is_file());
    assert!(temp_dir.path().join("tts/model.onnx").is_file());
}

#[tokio::test]
async fn test_second_run_makes_no_calls() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = two_group_manifest();

    let first = Arc::new(RecordingFetcher::default());
    orchestrator(temp_dir.path(), first.clone(), 1)
        .run(&manifest)
        .await
        .unwrap();
    assert_eq!(first.calls().len(), 3);

    let second = Arc::new(RecordingFetcher::default());
    let summary = orchestrator(temp_dir.path(), second.clone(), 1)
        .run(&manifest)
        .await
        .unwrap();

    assert!(second.calls().is_empty());
    assert_eq!(summary.files_skipped, 3);
    assert!(summary.is_noop());
}

#[tokio::test]
async fn test_empty_destination_is_fetched_again() {
    let temp_dir = TempDir::new().unwrap();
    let existing = stt_file(temp_dir.path(), "a.json");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, b"").unwrap();
    std::fs::create_dir_all(stt_file(temp_dir.path(), "sub")).unwrap();
    std::fs::write(stt_file(temp_dir.path(), "sub/b.onnx"), b"weights").unwrap();

    let fetcher = Arc::new(RecordingFetcher::default());
    let manifest = Manifest::new(vec![ManifestEntry::new(
        "stt",
        "https://host/stt/",
        ["a.json", "sub/b.onnx"],
    )]);

    let summary = orchestrator(temp_dir.path(), fetcher.clone(), 1)
        .run(&manifest)
        .await
        .unwrap();

    assert_eq!(fetcher.calls(), ["https://host/stt/a.json"]);
    assert_eq!(summary.files_downloaded, 1);
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(
        std::fs::read(&existing).unwrap(),
        b"https://host/stt/a.json".to_vec()
    );
}

#[tokio::test]
async fn test_first_failure_aborts_run() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = Arc::new(RecordingFetcher::failing_on("a.json"));

    let result = orchestrator(temp_dir.path(), fetcher.clone(), 1)
        .run(&two_group_manifest())
        .await;

    match result {
        Err(AppError::Fetch(FetchError::Exhausted { url, last, .. })) => {
            assert_eq!(url, "https://host/stt/a.json");
            assert!(matches!(*last, FetchError::HttpStatus { status: 503, .. }));
        }
        other => panic!("Expected exhausted fetch error, got {:?}", other),
    }

    assert_eq!(fetcher.calls(), ["https://host/stt/a.json"]);
    assert!(!stt_file(temp_dir.path(), "sub/b.onnx").exists());
    assert!(!temp_dir.path().join("tts").exists());
}

#[tokio::test]
async fn test_failure_in_later_group_keeps_earlier_files() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = Arc::new(RecordingFetcher::failing_on("model.onnx"));

    let result = orchestrator(temp_dir.path(), fetcher.clone(), 2)
        .run(&two_group_manifest())
        .await;

    assert!(matches!(result, Err(AppError::Fetch(_))));
    assert!(stt_file(temp_dir.path(), "a.json").is_file());
    assert!(stt_file(temp_dir.path(), "sub/b.onnx").is_file());
}

#[tokio::test]
async fn test_invalid_manifest_makes_no_calls() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = Arc::new(RecordingFetcher::default());
    let manifest = Manifest::new(vec![ManifestEntry::new(
        "stt",
        "https://host/stt/",
        ["a.json", "../escape.bin"],
    )]);

    let result = orchestrator(temp_dir.path(), fetcher.clone(), 1)
        .run(&manifest)
        .await;

    assert!(matches!(
        result,
        Err(AppError::Manifest(ManifestError::InvalidPath { .. }))
    ));
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_worker_count_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = Arc::new(RecordingFetcher::default());

    let result = orchestrator(temp_dir.path(), fetcher.clone(), 0)
        .run(&two_group_manifest())
        .await;

    assert!(matches!(result, Err(AppError::Config(_))));
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_parallel_workers_fetch_everything() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = Arc::new(RecordingFetcher::default());
    let files: Vec<String> = (0..12).map(|i| format!("shard-{:02}.bin", i)).collect();
    let manifest = Manifest::new(vec![ManifestEntry::new(
        "shards",
        "https://host/shards/",
        files.clone(),
    )]);

    let summary = orchestrator(temp_dir.path(), fetcher.clone(), 4)
        .run(&manifest)
        .await
        .unwrap();

    assert_eq!(summary.files_downloaded, 12);
    let mut calls = fetcher.calls();
    calls.sort();
    let expected: Vec<String> = files
        .iter()
        .map(|file| format!("https://host/shards/{}", file))
        .collect();
    assert_eq!(calls, expected);
}

#[tokio::test]
async fn test_shutdown_cancels_run() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = Arc::new(RecordingFetcher::slow(Duration::from_secs(30)));
    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = shutdown_tx.send(());
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator(temp_dir.path(), fetcher.clone(), 1)
            .run_with_shutdown(&two_group_manifest(), shutdown_rx),
    )
    .await
    .unwrap();

    assert!(matches!(result, Err(ref e) if e.is_cancelled()));
    assert_eq!(fetcher.calls().len(), 1);
    assert!(!stt_file(temp_dir.path(), "a.json").exists());
}

#[tokio::test]
async fn test_plan_reports_skip_decisions() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(temp_dir.path().join("stt")).unwrap();
    std::fs::write(stt_file(temp_dir.path(), "a.json"), b"{}").unwrap();

    let fetcher = Arc::new(RecordingFetcher::default());
    let planned = orchestrator(temp_dir.path(), fetcher.clone(), 1)
        .plan(&two_group_manifest())
        .await
        .unwrap();

    let decisions: Vec<(String, bool)> = planned
        .iter()
        .map(|p| (p.task.source_url.clone(), p.satisfied))
        .collect();
    assert_eq!(
        decisions,
        [
            ("https://host/stt/a.json".to_string(), true),
            ("https://host/stt/sub/b.onnx".to_string(), false),
            ("https://host/tts/model.onnx".to_string(), false),
        ]
    );
    assert!(fetcher.calls().is_empty());
}
