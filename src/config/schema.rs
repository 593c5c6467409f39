//! Configuration schema definitions.
//!
//! All sections derive Serde traits and default every field, so an empty
//! file (or no file at all) yields a runnable agent.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration for the agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Service host options (startup order, shutdown deadline).
    pub host: HostConfig,

    /// Console logging.
    pub logging: LoggingConfig,

    /// Health endpoints.
    pub health: HealthConfig,

    /// Telemetry export.
    pub telemetry: TelemetryConfig,

    /// Outbound HTTP client resilience settings.
    pub http_client: HttpClientConfig,

    /// Feature flags, by name.
    pub features: BTreeMap<String, bool>,
}

/// Background service host options.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HostConfig {
    /// Deadline for stopping all services once shutdown begins.
    pub shutdown_timeout_secs: u64,

    /// Start services concurrently instead of one after another.
    pub services_start_concurrently: bool,

    /// Stop services concurrently instead of one after another.
    pub services_stop_concurrently: bool,
}

impl HostConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 5,
            services_start_concurrently: false,
            services_stop_concurrently: true,
        }
    }
}

/// Output format of the console log.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (e.g. "info", "agent=debug,tower_http=info").
    /// `RUST_LOG` takes precedence when set.
    pub level: String,

    /// Console output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Health endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    /// Bind address for the health endpoints.
    pub bind_address: String,

    /// Route answering "should this process be restarted?".
    pub liveness_path: String,

    /// Route answering "should this process receive traffic?".
    pub readiness_path: String,

    /// Deadline for a single probe; a probe exceeding it counts as unhealthy.
    pub check_timeout_secs: u64,

    /// Deadline for a whole health request.
    pub request_timeout_secs: u64,
}

impl HealthConfig {
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            liveness_path: "/health".to_string(),
            readiness_path: "/ready".to_string(),
            check_timeout_secs: 5,
            request_timeout_secs: 10,
        }
    }
}

/// Telemetry export configuration, one section per signal.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub logging: OtlpConfig,
    pub tracing: OtlpConfig,
    pub metrics: MetricsConfig,
}

/// OTLP/HTTP exporter settings for one signal.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OtlpConfig {
    pub enabled: bool,

    /// Full signal URL, e.g. "http://collector:4318/v1/traces".
    pub endpoint: Option<String>,

    /// Extra request headers (API keys and the like).
    #[serde(deserialize_with = "scalar_map")]
    pub headers: BTreeMap<String, String>,

    /// Export request timeout in seconds.
    pub timeout_secs: u64,
}

impl OtlpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OtlpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            headers: BTreeMap::new(),
            timeout_secs: 10,
        }
    }
}

/// Accepts any scalar value and keeps its textual form, so a header set
/// through the environment as `1234` is still a header value.
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Integer(i64),
        Float(f64),
        Flag(bool),
    }

    let raw = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Scalar::Text(s) => s,
                Scalar::Integer(i) => i.to_string(),
                Scalar::Float(f) => f.to_string(),
                Scalar::Flag(b) => b.to_string(),
            };
            (key, text)
        })
        .collect())
}

/// Prometheus exposition settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,

    /// Scrape endpoint bind address.
    pub listen_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Outbound HTTP client resilience configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Deadline for a request including all retries, in seconds.
    pub total_timeout_secs: u64,

    /// Deadline for a single attempt, in seconds.
    pub attempt_timeout_secs: u64,

    /// Connection establishment timeout, in seconds.
    pub connect_timeout_secs: u64,

    /// Attempts per idempotent request (1 disables retries).
    pub max_attempts: u32,

    /// Base delay for exponential backoff, in milliseconds.
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay, in milliseconds.
    pub max_delay_ms: u64,

    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// How long the circuit stays open before a probe request, in seconds.
    pub break_duration_secs: u64,
}

impl HttpClientConfig {
    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(self.total_timeout_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn break_duration(&self) -> Duration {
        Duration::from_secs(self.break_duration_secs)
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            total_timeout_secs: 30,
            attempt_timeout_secs: 10,
            connect_timeout_secs: 5,
            max_attempts: 3,
            base_delay_ms: 2000,
            max_delay_ms: 30_000,
            failure_threshold: 5,
            break_duration_secs: 5,
        }
    }
}
