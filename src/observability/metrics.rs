//! Metrics collection and exposition.
//!
//! # Metrics
//! - `agent_build_info` (gauge): always 1, labelled with version and environment
//! - `agent_health_status` (gauge): 0=healthy, 1=degraded, 2=unhealthy, per endpoint
//! - `agent_http_client_requests_total` (counter): outbound requests by method, outcome
//! - `agent_http_client_request_duration_seconds` (histogram): outbound attempt latency
//! - `agent_http_client_circuit_rejections_total` (counter): requests refused by the breaker
//!
//! Recording goes through the `metrics` facade; without an installed recorder
//! every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::{EndpointPurpose, HealthState};
use crate::observability::{AppInfo, TelemetryError};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr, info: &AppInfo) -> Result<(), TelemetryError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", info.name.clone())
        .install()
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;

    describe_gauge!("agent_build_info", "Build and environment of the running agent");
    describe_gauge!("agent_health_status", "Aggregate health per endpoint (0 healthy, 1 degraded, 2 unhealthy)");
    describe_counter!("agent_http_client_requests_total", "Outbound HTTP attempts");
    describe_histogram!(
        "agent_http_client_request_duration_seconds",
        metrics::Unit::Seconds,
        "Outbound HTTP attempt latency"
    );
    describe_counter!(
        "agent_http_client_circuit_rejections_total",
        "Outbound requests rejected by the circuit breaker"
    );

    gauge!(
        "agent_build_info",
        "version" => info.version.clone(),
        "environment" => info.environment.clone()
    )
    .set(1.0);

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_health(purpose: EndpointPurpose, state: HealthState) {
    let value = match state {
        HealthState::Healthy => 0.0,
        HealthState::Degraded => 1.0,
        HealthState::Unhealthy => 2.0,
    };
    gauge!("agent_health_status", "endpoint" => purpose.as_str()).set(value);
}

/// Record one outbound attempt. `status` is `None` when no response arrived.
pub fn record_http_attempt(method: &str, status: Option<u16>, start: Instant) {
    let outcome = match status {
        Some(code) => code.to_string(),
        None => "error".to_string(),
    };
    counter!(
        "agent_http_client_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "agent_http_client_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_circuit_rejection() {
    counter!("agent_http_client_circuit_rejections_total").increment(1);
}
