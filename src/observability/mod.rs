//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, console + optional OTLP logs)
//!     → otel.rs (span export over OTLP)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → OTLP collector (traces, logs)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Each export is opt-in per signal
//! - Telemetry is installed before the async runtime starts and flushed
//!   after it stops

pub mod logging;
pub mod metrics;
pub mod otel;
pub mod resource;

use std::net::SocketAddr;

use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use thiserror::Error;

use crate::config::AgentConfig;

pub use resource::AppInfo;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{0}: endpoint is required when export is enabled")]
    MissingEndpoint(&'static str),

    #[error("failed to build {signal} exporter: {reason}")]
    Exporter { signal: &'static str, reason: String },

    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),

    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),

    #[error("failed to flush {signal}: {reason}")]
    Shutdown { signal: &'static str, reason: String },
}

/// Keeps export pipelines alive; call [`shutdown`](Self::shutdown) to flush.
#[must_use = "dropping the guard without shutdown loses buffered telemetry"]
pub struct TelemetryGuard {
    tracer: Option<SdkTracerProvider>,
    logger: Option<SdkLoggerProvider>,
}

impl TelemetryGuard {
    pub fn shutdown(self) -> Result<(), TelemetryError> {
        if let Some(tracer) = &self.tracer {
            tracer.shutdown().map_err(|e| TelemetryError::Shutdown {
                signal: "traces",
                reason: e.to_string(),
            })?;
        }
        if let Some(logger) = &self.logger {
            logger.shutdown().map_err(|e| TelemetryError::Shutdown {
                signal: "logs",
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Install logging, trace/log export and the metrics recorder.
pub fn init_telemetry(info: &AppInfo, config: &AgentConfig) -> Result<TelemetryGuard, TelemetryError> {
    let tracer = otel::tracer_provider(info, &config.telemetry.tracing)?;
    let logger = otel::logger_provider(info, &config.telemetry.logging)?;

    logging::init_subscriber(info, &config.logging, tracer.as_ref(), logger.as_ref())?;

    tracing::info!(
        traces = tracer.is_some(),
        logs = logger.is_some(),
        metrics = config.telemetry.metrics.enabled,
        "Telemetry initialized"
    );

    if config.telemetry.metrics.enabled {
        let addr: SocketAddr = config
            .telemetry
            .metrics
            .listen_address
            .parse()
            .map_err(|e| TelemetryError::Metrics(format!("invalid listen address: {e}")))?;
        metrics::init_metrics(addr, info)?;
    }

    Ok(TelemetryGuard { tracer, logger })
}
