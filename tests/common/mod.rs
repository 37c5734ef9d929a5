//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use model_fetcher::app::{ClientConfig, HttpFetcher};

/// Client settings with millisecond backoff so retry tests stay fast
pub fn fast_client_config() -> ClientConfig {
    ClientConfig::default()
        .with_retry_base_delay(Duration::from_millis(10))
        .with_max_retries(3)
}

/// Fetcher built from [`fast_client_config`]
pub fn fast_fetcher() -> HttpFetcher {
    HttpFetcher::new(fast_client_config()).unwrap()
}

/// Whether any `.tmp` file is left anywhere below `root`
pub fn has_partial_files(root: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(root) else {
        return false;
    };

    entries.flatten().any(|entry| {
        let path = entry.path();
        if path.is_dir() {
            has_partial_files(&path)
        } else {
            path.extension().is_some_and(|ext| ext == "tmp")
        }
    })
}

/// How the raw TCP stub answers one connection
#[derive(Debug, Clone, Copy)]
pub enum RawReply {
    /// Announce the full body length, send only `sent` bytes, then close
    Truncated { sent: usize },
    /// Send the whole body in `chunks` pieces with `pause` between them
    Paced { chunks: usize, pause: Duration },
}

/// Serve `body` over plain HTTP/1.1 without a mock framework
///
/// Connection `n` is answered with `replies[n]`; the last reply repeats.
/// Returns the base URL and a counter of accepted connections.
pub async fn spawn_raw_server(body: Vec<u8>, replies: Vec<RawReply>) -> (String, Arc<AtomicUsize>) {
    assert!(!replies.is_empty());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = connections.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let index = counter.fetch_add(1, Ordering::SeqCst);
            let reply = replies[index.min(replies.len() - 1)];
            tokio::spawn(answer(socket, body.clone(), reply));
        }
    });

    (format!("http://{}", address), connections)
}

async fn answer(mut socket: TcpStream, body: Vec<u8>, reply: RawReply) {
    let _ = socket.set_nodelay(true);
    if !read_request_head(&mut socket).await {
        return;
    }

    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }

    match reply {
        RawReply::Truncated { sent } => {
            let _ = socket.write_all(&body[..sent.min(body.len())]).await;
        }
        RawReply::Paced { chunks, pause } => {
            let chunk_size = body.len().div_ceil(chunks.max(1)).max(1);
            for (i, chunk) in body.chunks(chunk_size).enumerate() {
                if i > 0 {
                    tokio::time::sleep(pause).await;
                }
                if socket.write_all(chunk).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
            }
        }
    }

    let _ = socket.shutdown().await;
}

/// Consume the request line and headers; false if the client went away
async fn read_request_head(socket: &mut TcpStream) -> bool {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|window| window == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return false,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    true
}
