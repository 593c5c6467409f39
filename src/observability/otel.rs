//! OTLP export of traces and logs.
//!
//! Each signal gets its own provider, built only when its section is
//! enabled. Exporters speak OTLP/HTTP to the configured signal URL.

use std::collections::HashMap;

use opentelemetry_otlp::{LogExporter, SpanExporter, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

use crate::config::OtlpConfig;
use crate::observability::{AppInfo, TelemetryError};

pub fn tracer_provider(
    info: &AppInfo,
    config: &OtlpConfig,
) -> Result<Option<SdkTracerProvider>, TelemetryError> {
    if !config.enabled {
        return Ok(None);
    }
    let endpoint = endpoint(config, "telemetry.tracing")?;

    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_headers(headers(config))
        .with_timeout(config.timeout())
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "traces",
            reason: e.to_string(),
        })?;

    tracing::debug!(endpoint, "OTLP trace exporter configured");
    Ok(Some(
        SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(info.resource())
            .build(),
    ))
}

pub fn logger_provider(
    info: &AppInfo,
    config: &OtlpConfig,
) -> Result<Option<SdkLoggerProvider>, TelemetryError> {
    if !config.enabled {
        return Ok(None);
    }
    let endpoint = endpoint(config, "telemetry.logging")?;

    let exporter = LogExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_headers(headers(config))
        .with_timeout(config.timeout())
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "logs",
            reason: e.to_string(),
        })?;

    Ok(Some(
        SdkLoggerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(info.resource())
            .build(),
    ))
}

fn endpoint<'a>(config: &'a OtlpConfig, field: &'static str) -> Result<&'a str, TelemetryError> {
    config
        .endpoint
        .as_deref()
        .filter(|e| !e.is_empty())
        .ok_or(TelemetryError::MissingEndpoint(field))
}

fn headers(config: &OtlpConfig) -> HashMap<String, String> {
    config
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[test]
    fn test_disabled_signal_builds_nothing() {
        let info = AppInfo::new(&Environment::default());
        let config = OtlpConfig::default();
        assert!(tracer_provider(&info, &config).unwrap().is_none());
        assert!(logger_provider(&info, &config).unwrap().is_none());
    }

    #[test]
    fn test_enabled_signal_requires_endpoint() {
        let info = AppInfo::new(&Environment::default());
        let config = OtlpConfig {
            enabled: true,
            ..OtlpConfig::default()
        };
        assert!(matches!(
            tracer_provider(&info, &config),
            Err(TelemetryError::MissingEndpoint("telemetry.tracing"))
        ));
    }
}
