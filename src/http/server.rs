//! HTTP server for the health endpoints.
//!
//! # Responsibilities
//! - Create the Axum router with the liveness and readiness handlers
//! - Wire up middleware (tracing, request timeout)
//! - Serve on a listener until shutdown is signalled

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::HealthConfig;
use crate::health::endpoints::{health_router, HealthEndpoints};
use crate::health::{HealthRegistry, PolicyTable};
use crate::lifecycle::ShutdownSignal;

pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &HealthConfig, registry: Arc<HealthRegistry>, policy: PolicyTable) -> Self {
        let endpoints = HealthEndpoints::new(registry, policy);
        Self {
            router: Self::build_router(config, endpoints),
        }
    }

    #[allow(deprecated)]
    fn build_router(config: &HealthConfig, endpoints: HealthEndpoints) -> Router {
        health_router(config, endpoints).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(config.request_timeout())),
        )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Health server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}
