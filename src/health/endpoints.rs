//! Liveness and readiness handlers.
//!
//! Both routes run the same probes; they differ only in how the aggregate
//! state is mapped through the [`PolicyTable`].

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::config::HealthConfig;
use crate::health::policy::{EndpointPurpose, HealthState, PolicyTable};
use crate::health::registry::HealthRegistry;
use crate::observability::metrics;

const UNKNOWN: u8 = u8::MAX;

/// State shared by the health handlers.
#[derive(Clone)]
pub struct HealthEndpoints {
    registry: Arc<HealthRegistry>,
    policy: PolicyTable,
    last_seen: Arc<[AtomicU8; 2]>,
}

impl HealthEndpoints {
    pub fn new(registry: Arc<HealthRegistry>, policy: PolicyTable) -> Self {
        Self {
            registry,
            policy,
            last_seen: Arc::new([AtomicU8::new(UNKNOWN), AtomicU8::new(UNKNOWN)]),
        }
    }

    async fn respond(&self, purpose: EndpointPurpose) -> Response {
        let report = self.registry.check_all().await;
        let outcome = self.policy.outcome(purpose, report.status);

        self.observe(purpose, report.status);
        metrics::record_health(purpose, report.status);

        (outcome.status_code(), Json(report)).into_response()
    }

    /// Log when the state seen by an endpoint changes.
    fn observe(&self, purpose: EndpointPurpose, state: HealthState) {
        let slot = match purpose {
            EndpointPurpose::Liveness => &self.last_seen[0],
            EndpointPurpose::Readiness => &self.last_seen[1],
        };
        let previous = slot.swap(state as u8, Ordering::Relaxed);
        if previous == state as u8 {
            return;
        }

        match state {
            HealthState::Healthy => {
                tracing::info!(endpoint = %purpose, status = %state, "Health status changed")
            }
            _ => tracing::warn!(endpoint = %purpose, status = %state, "Health status changed"),
        }
    }
}

/// Router serving both endpoints at the configured paths.
pub fn health_router(config: &HealthConfig, endpoints: HealthEndpoints) -> Router {
    Router::new()
        .route(&config.liveness_path, get(liveness))
        .route(&config.readiness_path, get(readiness))
        .with_state(endpoints)
}

async fn liveness(State(endpoints): State<HealthEndpoints>) -> Response {
    endpoints.respond(EndpointPurpose::Liveness).await
}

async fn readiness(State(endpoints): State<HealthEndpoints>) -> Response {
    endpoints.respond(EndpointPurpose::Readiness).await
}
