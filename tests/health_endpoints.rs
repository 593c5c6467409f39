//! Liveness and readiness over real HTTP.

use std::time::Duration;

use agent::config::validation::validate_config;
use agent::config::AgentConfig;
use agent::health::{default_registry, HealthRegistry, HealthState};
use reqwest::StatusCode;
use serde_json::Value;

mod common;
use common::{spawn_health_server, spawn_health_server_with, HangingCheck, SlowCheck, SwitchableCheck};

async fn get(addr: std::net::SocketAddr, path: &str) -> (StatusCode, Value) {
    let res = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_no_probes_reports_healthy() {
    let (addr, shutdown) = spawn_health_server(HealthRegistry::new(Duration::from_secs(1))).await;

    let (live, body) = get(addr, "/health").await;
    assert_eq!(live, StatusCode::OK);
    assert_eq!(body["status"], "Healthy");

    let (ready, _) = get(addr, "/ready").await;
    assert_eq!(ready, StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn test_degraded_dependency_is_live_but_not_ready() {
    let mut registry = HealthRegistry::new(Duration::from_secs(1));
    registry.register(SwitchableCheck::new("db", HealthState::Healthy)).unwrap();
    registry.register(SwitchableCheck::new("queue", HealthState::Healthy)).unwrap();
    registry.register(SwitchableCheck::new("cache", HealthState::Degraded)).unwrap();
    let (addr, shutdown) = spawn_health_server(registry).await;

    let (live, body) = get(addr, "/health").await;
    assert_eq!(live, StatusCode::OK);
    assert_eq!(body["status"], "Degraded");
    assert_eq!(body["entries"]["cache"]["status"], "Degraded");
    assert_eq!(body["entries"]["db"]["status"], "Healthy");

    let (ready, _) = get(addr, "/ready").await;
    assert_eq!(ready, StatusCode::FAILED_DEPENDENCY);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unhealthy_fails_both_endpoints() {
    let mut registry = HealthRegistry::new(Duration::from_secs(1));
    registry.register(SwitchableCheck::new("db", HealthState::Unhealthy)).unwrap();
    let (addr, shutdown) = spawn_health_server(registry).await;

    assert_eq!(get(addr, "/health").await.0, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(get(addr, "/ready").await.0, StatusCode::SERVICE_UNAVAILABLE);

    shutdown.trigger();
}

#[tokio::test]
async fn test_hanging_probe_counts_as_unhealthy() {
    let mut registry = HealthRegistry::new(Duration::from_millis(50));
    registry.register(HangingCheck).unwrap();
    let (addr, shutdown) = spawn_health_server(registry).await;

    let (live, body) = get(addr, "/health").await;
    assert_eq!(live, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["entries"]["hanging"]["status"], "Unhealthy");

    shutdown.trigger();
}

#[tokio::test]
async fn test_endpoints_follow_state_changes() {
    let check = SwitchableCheck::new("upstream", HealthState::Healthy);
    let mut registry = HealthRegistry::new(Duration::from_secs(1));
    registry.register(check.clone()).unwrap();
    let (addr, shutdown) = spawn_health_server(registry).await;

    assert_eq!(get(addr, "/ready").await.0, StatusCode::OK);

    check.set(HealthState::Degraded);
    assert_eq!(get(addr, "/ready").await.0, StatusCode::FAILED_DEPENDENCY);
    assert_eq!(get(addr, "/health").await.0, StatusCode::OK);

    check.set(HealthState::Healthy);
    assert_eq!(get(addr, "/ready").await.0, StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let (addr, shutdown) = spawn_health_server(HealthRegistry::new(Duration::from_secs(1))).await;

    let res = reqwest::get(format!("http://{addr}/healthz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_healthy_probe_is_answered_by_policy() {
    let mut config = AgentConfig::default();
    config.health.check_timeout_secs = 2;
    config.health.request_timeout_secs = 3;
    validate_config(&config).unwrap();

    let mut registry = default_registry(&config.health);
    registry
        .register(SlowCheck {
            delay: Duration::from_millis(1500),
        })
        .unwrap();
    let (addr, shutdown) = spawn_health_server_with(&config.health, registry).await;

    let (live, body) = get(addr, "/health").await;
    assert_eq!(live, StatusCode::OK);
    assert_eq!(body["status"], "Healthy");

    shutdown.trigger();
}

#[tokio::test]
async fn test_probe_deadline_fires_before_request_deadline() {
    let mut config = AgentConfig::default();
    config.health.check_timeout_secs = 1;
    config.health.request_timeout_secs = 2;
    validate_config(&config).unwrap();

    let mut registry = default_registry(&config.health);
    registry.register(HangingCheck).unwrap();
    let (addr, shutdown) = spawn_health_server_with(&config.health, registry).await;

    // The policy answers, not the request timeout (408).
    let (live, body) = get(addr, "/health").await;
    assert_eq!(live, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["entries"]["hanging"]["status"], "Unhealthy");

    shutdown.trigger();
}
