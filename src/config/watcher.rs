//! Configuration file watcher for hot reload.

use std::ffi::OsString;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::ConfigSource;
use crate::config::schema::AgentConfig;
use crate::config::SharedConfig;
use crate::lifecycle::ShutdownSignal;

/// Watches the layered configuration files and reloads on change.
pub struct ConfigWatcher {
    source: ConfigSource,
    update_tx: mpsc::UnboundedSender<AgentConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(source: ConfigSource) -> (Self, mpsc::UnboundedReceiver<AgentConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (Self { source, update_tx }, update_rx)
    }

    /// Start watching the configuration directory in a background thread.
    ///
    /// The directory is watched rather than the files so that a file created
    /// after startup is picked up too. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let source = self.source.clone();
        let names: Vec<OsString> = source
            .files()
            .iter()
            .filter_map(|f| f.file_name().map(|n| n.to_os_string()))
            .collect();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove())
                        && event
                            .paths
                            .iter()
                            .any(|p| p.file_name().is_some_and(|n| names.iter().any(|name| name == n)));
                    if !relevant {
                        return;
                    }

                    tracing::info!("Config file change detected, reloading...");
                    match source.load() {
                        Ok(config) => {
                            let _ = tx.send(config);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload config; keeping current configuration");
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(self.source.dir(), RecursiveMode::NonRecursive)?;

        tracing::info!(dir = %self.source.dir().display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Publish reloaded configurations into the shared snapshot until shutdown.
pub async fn apply_updates(
    shared: SharedConfig,
    mut updates: mpsc::UnboundedReceiver<AgentConfig>,
    mut shutdown: ShutdownSignal,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                let previous = shared.swap(std::sync::Arc::new(config));
                let current = shared.load();
                if current.features != previous.features {
                    tracing::info!(features = ?current.features, "Feature flags changed");
                }
                if without_features(&current) != without_features(&previous) {
                    tracing::warn!("Changed settings outside feature flags take effect after restart");
                }
                tracing::info!("Configuration reloaded");
            }
            _ = shutdown.recv() => break,
        }
    }
}

fn without_features(config: &AgentConfig) -> AgentConfig {
    AgentConfig {
        features: Default::default(),
        ..config.clone()
    }
}
