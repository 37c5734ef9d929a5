//! Integration tests for the HTTP fetcher
//!
//! These run the real reqwest-backed fetcher against a local mock server and
//! check what ends up on disk.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{fast_client_config, fast_fetcher, has_partial_files, spawn_raw_server, RawReply};
use model_fetcher::app::{
    fetch, ClientConfig, Fetch, HttpFetcher, ProgressKind, ProgressReporter,
};
use model_fetcher::errors::{AppError, FetchError};

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

#[tokio::test]
async fn test_download_writes_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stt/config.json"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"{\"d_model\": 512}".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("stt/config.json");

    let bytes = fast_fetcher()
        .fetch(&url(&server, "/stt/config.json"), &destination)
        .await
        .unwrap();

    assert_eq!(bytes, 16);
    assert_eq!(std::fs::read(&destination).unwrap(), b"{\"d_model\": 512}");
    assert!(!has_partial_files(temp_dir.path()));
}

#[tokio::test]
async fn test_relative_redirect_is_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.json"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/a-v2.json")
                .set_body_string("moved"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a-v2.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("version two"))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("a.json");

    fast_fetcher()
        .fetch(&url(&server, "/a.json"), &destination)
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "version two");
}

#[tokio::test]
async fn test_redirect_chain_of_all_codes() {
    let server = MockServer::start().await;
    let hops = [("/one", 301, "/two"), ("/two", 307, "/three"), ("/three", 308, "/final")];
    for (from, status, to) in hops {
        Mock::given(method("GET"))
            .and(path(from))
            .respond_with(ResponseTemplate::new(status).insert_header("Location", to))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(ResponseTemplate::new(200).set_body_string("weights"))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("model.onnx");

    fast_fetcher()
        .fetch(&url(&server, "/one"), &destination)
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "weights");
}

#[tokio::test]
async fn test_redirect_loop_fails_without_retry() {
    let server = MockServer::start().await;
    // 1 initial request + 10 followed hops, and no second attempt
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .expect(11)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("loop.bin");

    let result = fast_fetcher()
        .fetch(&url(&server, "/loop"), &destination)
        .await;

    match result {
        Err(FetchError::TooManyRedirects { limit, .. }) => assert_eq!(limit, 10),
        other => panic!("Expected TooManyRedirects, got {:?}", other),
    }
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_redirect_limit_is_configurable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/second"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/third"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/third"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let fetcher = HttpFetcher::new(fast_client_config().with_max_redirects(1)).unwrap();

    let result = fetcher
        .fetch(&url(&server, "/first"), &temp_dir.path().join("x"))
        .await;
    assert!(matches!(result, Err(FetchError::TooManyRedirects { limit: 1, .. })));
}

#[tokio::test]
async fn test_persistent_503_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stt/a.json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("stt/a.json");
    let source = url(&server, "/stt/a.json");

    let result = fast_fetcher().fetch(&source, &destination).await;

    match result {
        Err(FetchError::Exhausted {
            url,
            attempts,
            last,
        }) => {
            assert_eq!(url, source.to_string());
            assert_eq!(attempts, 3);
            assert!(matches!(*last, FetchError::HttpStatus { status: 503, .. }));
        }
        other => panic!("Expected Exhausted, got {:?}", other),
    }
    assert!(!destination.exists());
    assert!(!has_partial_files(temp_dir.path()));
}

#[tokio::test]
async fn test_client_errors_are_retried_too() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.onnx"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let result = fast_fetcher()
        .fetch(&url(&server, "/missing.onnx"), &temp_dir.path().join("m.onnx"))
        .await;

    let error = result.unwrap_err();
    assert!(matches!(
        error.root_cause(),
        FetchError::HttpStatus { status: 404, .. }
    ));
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tts/tokenizer.model"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tts/tokenizer.model"))
        .respond_with(ResponseTemplate::new(200).set_body_string("sentencepiece"))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("tts/tokenizer.model");

    let started = std::time::Instant::now();
    fast_fetcher()
        .fetch(&url(&server, "/tts/tokenizer.model"), &destination)
        .await
        .unwrap();

    // 10ms + 20ms of backoff
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(
        std::fs::read_to_string(&destination).unwrap(),
        "sentencepiece"
    );
}

#[tokio::test]
async fn test_filesystem_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x"))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("stt");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let result = fast_fetcher()
        .fetch(&url(&server, "/a.json"), &blocker.join("a.json"))
        .await;

    assert!(matches!(result, Err(FetchError::Filesystem { .. })));
}

#[tokio::test]
async fn test_progress_events_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("speaker/classifier.ckpt");
    let (reporter, mut events) = ProgressReporter::channel(64);

    let fetcher = fast_fetcher().with_progress(reporter);
    fetcher
        .fetch(&url(&server, "/speaker/classifier.ckpt"), &destination)
        .await
        .unwrap();
    drop(fetcher);

    let mut kinds = Vec::new();
    while let Some(event) = events.recv().await {
        assert_eq!(event.destination, destination);
        kinds.push(event.kind);
    }

    assert_eq!(
        kinds.first(),
        Some(&ProgressKind::Started {
            total_bytes: Some(4096)
        })
    );
    assert_eq!(kinds.last(), Some(&ProgressKind::Finished { bytes: 4096 }));
}

#[tokio::test]
async fn test_one_shot_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hyperparams.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("sample_rate: 16000\n"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("hyperparams.yaml");

    let bytes = fetch(
        &format!("{}/hyperparams.yaml", server.uri()),
        &destination,
        1,
    )
    .await
    .unwrap();

    assert_eq!(bytes, 19);

    let invalid = fetch("::not a url::", &destination, 1).await;
    assert!(matches!(
        invalid,
        Err(AppError::Fetch(FetchError::InvalidUrl { .. }))
    ));
}

fn model_bytes() -> Vec<u8> {
    (0..1000u32).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_connection_drop_mid_body_is_retried() {
    let body = model_bytes();
    let (base, connections) = spawn_raw_server(
        body.clone(),
        vec![
            RawReply::Truncated { sent: 10 },
            RawReply::Paced {
                chunks: 1,
                pause: Duration::ZERO,
            },
        ],
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("stt/onnx/decoder_model.onnx");
    let source = Url::parse(&format!("{}/decoder_model.onnx", base)).unwrap();

    let bytes = fast_fetcher().fetch(&source, &destination).await.unwrap();

    assert_eq!(bytes, 1000);
    assert_eq!(std::fs::read(&destination).unwrap(), body);
    assert_eq!(connections.load(Ordering::SeqCst), 2);
    assert!(!has_partial_files(temp_dir.path()));
}

#[tokio::test]
async fn test_every_attempt_truncated_leaves_nothing() {
    let (base, connections) =
        spawn_raw_server(model_bytes(), vec![RawReply::Truncated { sent: 10 }]).await;

    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("stt/onnx/decoder_model.onnx");
    let source = Url::parse(&format!("{}/decoder_model.onnx", base)).unwrap();

    let result = fast_fetcher().fetch(&source, &destination).await;

    match result {
        Err(FetchError::Exhausted { attempts, last, .. }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, FetchError::Stream { .. }));
        }
        other => panic!("Expected Exhausted after stream failures, got {:?}", other),
    }
    assert_eq!(connections.load(Ordering::SeqCst), 3);
    assert!(!destination.exists());
    assert!(!has_partial_files(temp_dir.path()));
}

#[tokio::test]
async fn test_slow_steady_body_outlasts_timeouts() {
    let body = model_bytes();
    let (base, _) = spawn_raw_server(
        body.clone(),
        vec![RawReply::Paced {
            chunks: 8,
            pause: Duration::from_millis(60),
        }],
    )
    .await;

    // The whole transfer takes longer than either timeout
    let config = ClientConfig {
        request_timeout: Duration::from_millis(250),
        read_timeout: Duration::from_millis(250),
        ..fast_client_config().with_max_retries(1)
    };
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("tts/decoder.onnx");
    let source = Url::parse(&format!("{}/decoder.onnx", base)).unwrap();

    let started = std::time::Instant::now();
    HttpFetcher::new(config)
        .unwrap()
        .fetch(&source, &destination)
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(400));
    assert_eq!(std::fs::read(&destination).unwrap(), body);
}

#[tokio::test]
async fn test_stalled_body_times_out() {
    let (base, _) = spawn_raw_server(
        model_bytes(),
        vec![RawReply::Paced {
            chunks: 2,
            pause: Duration::from_secs(30),
        }],
    )
    .await;

    let config = ClientConfig {
        read_timeout: Duration::from_millis(100),
        ..fast_client_config().with_max_retries(1)
    };
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("tts/decoder.onnx");
    let source = Url::parse(&format!("{}/decoder.onnx", base)).unwrap();

    let started = std::time::Instant::now();
    let result = HttpFetcher::new(config)
        .unwrap()
        .fetch(&source, &destination)
        .await;

    let error = result.unwrap_err();
    assert!(matches!(error.root_cause(), FetchError::Timeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!destination.exists());
    assert!(!has_partial_files(temp_dir.path()));
}
