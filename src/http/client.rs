//! Resilient outbound HTTP client.
//!
//! # Responsibilities
//! - Bound every request by a total deadline and every attempt by its own
//! - Retry idempotent requests on transient failures with jittered backoff
//! - Fail fast through the circuit breaker while a dependency is down
//! - Record attempt metrics and an `http.client.request` span per attempt
//!
//! Application services get a clone from the [`AppContext`](crate::AppContext);
//! clones share one connection pool and one breaker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, IntoUrl, Method, Request, RequestBuilder, Response};
use thiserror::Error;
use tracing::Instrument;

use crate::config::HttpClientConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::retries::{is_idempotent, is_retryable, is_transient_status};
use crate::resilience::{CircuitBreaker, CircuitState};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("circuit breaker is open; request rejected")]
    CircuitOpen,

    #[error("request exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
}

#[derive(Clone)]
pub struct ResilientClient {
    inner: Client,
    config: HttpClientConfig,
    breaker: Arc<CircuitBreaker>,
}

impl ResilientClient {
    pub fn new(config: HttpClientConfig, user_agent: &str) -> Result<Self, ClientError> {
        let inner = Client::builder()
            .user_agent(user_agent)
            .timeout(config.attempt_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(ClientError::Build)?;
        let breaker = Arc::new(CircuitBreaker::new(
            config.failure_threshold,
            config.break_duration(),
        ));

        Ok(Self {
            inner,
            config,
            breaker,
        })
    }

    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        self.inner.request(method, url)
    }

    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.inner.get(url)
    }

    pub fn post<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.inner.post(url)
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Send a request built from this client's builders.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let request = request.build()?;
        let deadline = self.config.total_timeout();

        match tokio::time::timeout(deadline, self.send_with_retries(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(deadline_ms = deadline.as_millis() as u64, "Outbound request deadline exceeded");
                Err(ClientError::Timeout(deadline))
            }
        }
    }

    async fn send_with_retries(&self, request: Request) -> Result<Response, ClientError> {
        let method = request.method().clone();
        let url = request.url().clone();
        let max_attempts = if is_idempotent(&method) {
            self.config.max_attempts.max(1)
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            // Streaming bodies cannot be cloned; they get exactly one attempt.
            let Some(copy) = (attempt < max_attempts).then(|| request.try_clone()).flatten() else {
                return self.attempt(request, attempt).await;
            };

            let result = self.attempt(copy, attempt).await;
            let retry = match &result {
                Ok(response) => is_retryable(&method, Some(response.status()), false),
                Err(ClientError::Request(e)) => {
                    is_retryable(&method, None, e.is_connect() || e.is_timeout() || e.is_request())
                }
                Err(_) => false,
            };
            if !retry {
                return result;
            }

            let delay = calculate_backoff(attempt, self.config.base_delay_ms, self.config.max_delay_ms);
            tracing::info!(
                method = %method,
                url = %url,
                attempt,
                delay = ?delay,
                "Retrying outbound request"
            );
            drop(result);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, request: Request, attempt: u32) -> Result<Response, ClientError> {
        if !self.breaker.try_acquire() {
            metrics::record_circuit_rejection();
            tracing::debug!(url = %request.url(), "Circuit open, rejecting outbound request");
            return Err(ClientError::CircuitOpen);
        }

        let method = request.method().to_string();
        let span = tracing::info_span!(
            "http.client.request",
            otel.kind = "client",
            http.request.method = %method,
            url.full = %request.url(),
            http.request.resend_count = attempt.saturating_sub(1),
            attempt,
            http.response.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );
        let start = Instant::now();

        match self.inner.execute(request).instrument(span.clone()).await {
            Ok(response) => {
                let status = response.status();
                span.record("http.response.status_code", status.as_u16());
                metrics::record_http_attempt(&method, Some(status.as_u16()), start);
                if is_transient_status(status) {
                    span.record("error.type", status.as_str());
                    self.breaker.record_failure();
                } else {
                    self.breaker.record_success();
                }
                Ok(response)
            }
            Err(e) => {
                span.record("error.type", error_type(&e));
                metrics::record_http_attempt(&method, None, start);
                self.breaker.record_failure();
                tracing::warn!(parent: &span, attempt, error = %e, "Outbound request failed");
                Err(ClientError::Request(e))
            }
        }
    }
}

fn error_type(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else {
        "request"
    }
}
