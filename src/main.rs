//! Agent entry point.
//!
//! # Architecture Overview
//!
//! ```text
//!   agent.toml ──────┐
//!   agent.<env>.toml ┼─▶ config ──▶ observability (logs, traces, metrics)
//!   APP_* vars ──────┘     │
//!                          ├─▶ health server ◀── GET /health, /ready
//!                          │       └─ registry ─▶ policy ─▶ status code
//!                          │
//!                          └─▶ service host ──▶ background services
//!                                   ▲                └─ AppContext (config,
//!                                   │                   features, http client)
//!   SIGTERM/SIGINT ──▶ shutdown ────┘
//! ```
//!
//! Telemetry is installed before the Tokio runtime is built and flushed after
//! it stops, so the OTLP exporters never block a runtime worker.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::Instrument;

use agent::config::{self, watcher::apply_updates, AgentConfig, ConfigSource, ConfigWatcher, Environment};
use agent::health::{default_registry, PolicyTable};
use agent::http::HttpServer;
use agent::lifecycle::{wait_for_signal, ServiceHost, Shutdown};
use agent::observability::{self, logging::process_span, AppInfo};
use agent::AppContext;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "agent", version)]
#[command(about = "Background agent host", long_about = None)]
struct Cli {
    /// Directory holding agent.toml and agent.<environment>.toml
    #[arg(long, env = config::loader::CONFIG_DIR_VAR, default_value = ".")]
    config_dir: PathBuf,

    #[arg(long, env = config::loader::ENVIRONMENT_VAR, default_value = Environment::PRODUCTION)]
    environment: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("agent crashed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BoxError> {
    let source = ConfigSource::new(cli.config_dir, Environment::new(cli.environment));
    let config = source.load()?;
    let info = AppInfo::new(source.environment());
    let telemetry = observability::init_telemetry(&info, &config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let span = process_span(&info);
    let result = runtime.block_on(serve(source, config, info).instrument(span));
    runtime.shutdown_timeout(Duration::from_secs(1));

    if let Err(e) = telemetry.shutdown() {
        eprintln!("telemetry flush failed: {e}");
    }
    if let Err(e) = &result {
        tracing::error!(error = %e, "Agent stopped with error");
    }
    result
}

async fn serve(source: ConfigSource, config: AgentConfig, info: AppInfo) -> Result<(), BoxError> {
    tracing::info!(
        version = %info.version,
        environment = %info.environment,
        config_dir = %source.dir().display(),
        "Agent starting"
    );

    let shared = config::shared(config.clone());
    let shutdown = Shutdown::new();

    let (watcher, updates) = ConfigWatcher::new(source);
    let _watcher = match watcher.run() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, reload disabled");
            None
        }
    };
    tokio::spawn(apply_updates(shared.clone(), updates, shutdown.subscribe()).in_current_span());

    // With no probes registered the agent reports Healthy.
    let registry = Arc::new(default_registry(&config.health));

    let listener = TcpListener::bind(&config.health.bind_address).await?;
    let server = HttpServer::new(&config.health, registry, PolicyTable::standard());
    let server = tokio::spawn(server.run(listener, shutdown.subscribe()).in_current_span());

    let context = Arc::new(AppContext::new(info, shared, shutdown.clone())?);
    let host = ServiceHost::new(context);

    let trigger = shutdown.clone();
    tokio::spawn(
        async move {
            let signal = wait_for_signal().await;
            tracing::info!(signal, "Shutdown signal received");
            trigger.trigger();
        }
        .in_current_span(),
    );

    let hosted = host.run().await;
    shutdown.trigger();
    server.await??;
    hosted?;

    tracing::info!("Shutdown complete");
    Ok(())
}
