//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use drf_reverse_proxy::config::{ProxyConfig, ProxySettings, TimeoutConfig};
use drf_reverse_proxy::http::HttpServer;
use drf_reverse_proxy::lifecycle::Shutdown;
use drf_reverse_proxy::net::ConnectionPool;

/// Timeouts every test installs into the process-wide pool, whichever test runs first.
pub fn test_timeouts() -> TimeoutConfig {
    TimeoutConfig {
        connect_secs: 2,
        request_secs: 2,
        idle_secs: 30,
    }
}

/// Read one request (head plus Content-Length body) from the socket.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).into_owned(),
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// Start a backend that answers every request with the raw request it received.
///
/// No Content-Type is sent, so the proxy's fallback applies.
pub async fn start_echo_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    request.len(),
                    request
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Start a backend that returns a fixed response.
///
/// `head` is the status line plus headers, without the trailing blank line.
pub async fn start_mock_backend(addr: SocketAddr, head: String, body: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let head = head.clone();
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let response = format!(
                    "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    head,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Start a backend that accepts connections and never answers.
pub async fn start_silent_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _socket = socket;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });
}

/// Config with a single proxy entry.
pub fn single_proxy(settings: ProxySettings) -> ProxyConfig {
    ProxyConfig {
        timeouts: test_timeouts(),
        proxies: vec![settings],
        ..ProxyConfig::default()
    }
}

/// Start the proxy on `addr`. Trigger the returned handle to stop it.
pub async fn start_proxy(addr: SocketAddr, config: ProxyConfig) -> Shutdown {
    ConnectionPool::install(&test_timeouts());

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind(addr).await.unwrap();
    let signal = shutdown.wait();

    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    shutdown
}

/// Client that never follows redirects, so 302s can be inspected.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
