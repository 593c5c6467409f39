//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent::config::HealthConfig;
use agent::health::{CheckResult, HealthCheck, HealthRegistry, HealthState, PolicyTable};
use agent::http::HttpServer;
use agent::lifecycle::Shutdown;
use futures_util::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        if read_request(&mut socket).await.is_none() {
                            return;
                        }

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read one request (headers and `Content-Length` body) off the socket.
async fn read_request(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    };

    let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
    let body_len = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while request.len() < header_end + body_len {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    Some(request)
}

/// Probe whose state the test flips at will.
#[derive(Clone)]
pub struct SwitchableCheck {
    name: String,
    state: Arc<Mutex<HealthState>>,
}

impl SwitchableCheck {
    pub fn new(name: &str, state: HealthState) -> Self {
        Self {
            name: name.to_string(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn set(&self, state: HealthState) {
        *self.state.lock().unwrap() = state;
    }
}

impl HealthCheck for SwitchableCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> BoxFuture<'_, CheckResult> {
        let state = *self.state.lock().unwrap();
        Box::pin(async move {
            match state {
                HealthState::Healthy => CheckResult::healthy(),
                HealthState::Degraded => CheckResult::degraded("switched to degraded"),
                HealthState::Unhealthy => CheckResult::unhealthy("switched to unhealthy"),
            }
        })
    }
}

/// Probe that never answers within any reasonable timeout.
pub struct HangingCheck;

impl HealthCheck for HangingCheck {
    fn name(&self) -> &str {
        "hanging"
    }

    fn check(&self) -> BoxFuture<'_, CheckResult> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            CheckResult::healthy()
        })
    }
}

/// Healthy probe that takes `delay` to answer.
pub struct SlowCheck {
    pub delay: Duration,
}

impl HealthCheck for SlowCheck {
    fn name(&self) -> &str {
        "slow"
    }

    fn check(&self) -> BoxFuture<'_, CheckResult> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            CheckResult::healthy()
        })
    }
}

/// Serve the health endpoints on an ephemeral port.
pub async fn spawn_health_server(registry: HealthRegistry) -> (SocketAddr, Shutdown) {
    spawn_health_server_with(&HealthConfig::default(), registry).await
}

pub async fn spawn_health_server_with(config: &HealthConfig, registry: HealthRegistry) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(config, Arc::new(registry), PolicyTable::standard());
    tokio::spawn(server.run(listener, shutdown.subscribe()));

    (addr, shutdown)
}
