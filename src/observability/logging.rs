//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber
//! - Bridge spans and events to OTLP when export is enabled
//! - Enrich every event with process identity via a root span
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - JSON format for production, pretty format for development
//! - The OTLP log bridge ignores the exporter's own HTTP stack so export
//!   traffic never feeds back into itself

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, LoggingConfig};
use crate::observability::{AppInfo, TelemetryError};

const EXPORT_STACK: [&str; 5] = ["opentelemetry", "hyper", "reqwest", "h2", "tower"];

/// Build the filter: `RUST_LOG` when set, otherwise the configured level.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::Filter(e.to_string())),
    }
}

pub fn init_subscriber(
    info: &AppInfo,
    config: &LoggingConfig,
    tracer: Option<&SdkTracerProvider>,
    logger: Option<&SdkLoggerProvider>,
) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;
    let json = config.format == LogFormat::Json;

    let trace_layer = tracer.map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(info.name.clone()))
    });
    let log_layer = logger.map(|provider| {
        OpenTelemetryTracingBridge::new(provider).with_filter(filter_fn(|meta| {
            !EXPORT_STACK.iter().any(|prefix| meta.target().starts_with(prefix))
        }))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_current_span(true)))
        .with((!json).then(|| fmt::layer().with_target(true)))
        .with(trace_layer)
        .with(log_layer)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))
}

/// Span carrying process identity; enter it around the agent's lifetime.
pub fn process_span(info: &AppInfo) -> tracing::Span {
    tracing::info_span!(
        "agent",
        service.version = %info.version,
        deployment.environment = %info.environment,
        host.name = %info.host_name,
        user.name = %info.user_name,
    )
}
