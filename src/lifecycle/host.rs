//! Background service hosting.
//!
//! # Responsibilities
//! - Start registered services, sequentially or concurrently
//! - Run each service on its own task until shutdown
//! - Stop services and bound the drain by the shutdown timeout
//!
//! # Design Decisions
//! - A failing `start` aborts the host; nothing has been spawned yet
//! - A failing `run` is logged and ignored; the rest of the agent keeps going
//! - Tasks still running when the timeout expires are aborted

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{join_all, BoxFuture};
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};

use crate::context::AppContext;

pub type ServiceError = Box<dyn Error + Send + Sync>;

/// A long-running unit of work owned by the [`ServiceHost`].
pub trait BackgroundService: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Prepare the service; runs before any service's `run`.
    fn start<'a>(&'a self, _context: &'a AppContext) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async { Ok(()) })
    }

    /// Main loop. Should return once `context.shutdown` fires.
    fn run(self: Arc<Self>, context: Arc<AppContext>) -> BoxFuture<'static, Result<(), ServiceError>>;

    fn stop(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("service '{name}' failed to start: {source}")]
    Start {
        name: String,
        #[source]
        source: ServiceError,
    },
}

pub struct ServiceHost {
    context: Arc<AppContext>,
    services: Vec<Arc<dyn BackgroundService>>,
}

type Joined = Result<(String, Result<(), ServiceError>), JoinError>;

impl ServiceHost {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self {
            context,
            services: Vec::new(),
        }
    }

    pub fn add<S: BackgroundService>(&mut self, service: S) -> &mut Self {
        self.services.push(Arc::new(service));
        self
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Start all services, run them until shutdown, then stop them.
    pub async fn run(self) -> Result<(), HostError> {
        let host = self.context.config.load().host.clone();
        let mut signal = self.context.shutdown.subscribe();

        self.start_all(host.services_start_concurrently).await?;
        tracing::info!(services = self.services.len(), "Background services started");

        let mut tasks = JoinSet::new();
        for service in &self.services {
            let name = service.name().to_string();
            let run = Arc::clone(service).run(Arc::clone(&self.context));
            tasks.spawn(async move { (name, run.await) });
        }

        loop {
            tokio::select! {
                _ = signal.recv() => break,
                Some(joined) = tasks.join_next() => report(joined),
            }
        }

        self.stop_all(host.services_stop_concurrently, host.shutdown_timeout(), &mut tasks)
            .await;
        Ok(())
    }

    async fn start_all(&self, concurrently: bool) -> Result<(), HostError> {
        let results = if concurrently {
            join_all(self.services.iter().map(|service| async move {
                (service.name().to_string(), service.start(&self.context).await)
            }))
            .await
        } else {
            let mut results = Vec::with_capacity(self.services.len());
            for service in &self.services {
                let result = service.start(&self.context).await;
                let failed = result.is_err();
                results.push((service.name().to_string(), result));
                if failed {
                    break;
                }
            }
            results
        };

        for (name, result) in results {
            if let Err(source) = result {
                tracing::error!(service = %name, error = %source, "Background service failed to start");
                return Err(HostError::Start { name, source });
            }
        }
        Ok(())
    }

    async fn stop_all(
        &self,
        concurrently: bool,
        timeout: Duration,
        tasks: &mut JoinSet<(String, Result<(), ServiceError>)>,
    ) {
        tracing::info!(timeout = ?timeout, "Stopping background services");

        let drain = async {
            if concurrently {
                join_all(self.services.iter().map(|service| service.stop())).await;
            } else {
                for service in &self.services {
                    service.stop().await;
                }
            }
            while let Some(joined) = tasks.join_next().await {
                report(joined);
            }
        };

        if tokio::time::timeout(timeout, drain).await.is_err() {
            tracing::warn!(
                remaining = tasks.len(),
                "Background services did not stop in time, aborting"
            );
            tasks.abort_all();
        }
    }
}

fn report(joined: Joined) {
    match joined {
        Ok((name, Ok(()))) => tracing::info!(service = %name, "Background service completed"),
        Ok((name, Err(e))) => {
            tracing::error!(service = %name, error = %e, "Background service failed, continuing")
        }
        Err(e) if e.is_cancelled() => tracing::debug!("Background service task cancelled"),
        Err(e) => tracing::error!(error = %e, "Background service panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{shared, AgentConfig};
    use crate::lifecycle::Shutdown;
    use crate::observability::AppInfo;
    use crate::config::Environment;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn context() -> Arc<AppContext> {
        let info = AppInfo::new(&Environment::default());
        Arc::new(AppContext::new(info, shared(AgentConfig::default()), Shutdown::new()).unwrap())
    }

    struct FailsToStart;

    impl BackgroundService for FailsToStart {
        fn name(&self) -> &str {
            "broken"
        }

        fn start<'a>(&'a self, _context: &'a AppContext) -> BoxFuture<'a, Result<(), ServiceError>> {
            Box::pin(async { Err("no credentials".into()) })
        }

        fn run(self: Arc<Self>, _context: Arc<AppContext>) -> BoxFuture<'static, Result<(), ServiceError>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct Flag(Arc<AtomicBool>);

    impl BackgroundService for Flag {
        fn name(&self) -> &str {
            "flag"
        }

        fn run(self: Arc<Self>, context: Arc<AppContext>) -> BoxFuture<'static, Result<(), ServiceError>> {
            Box::pin(async move {
                context.shutdown.subscribe().recv().await;
                self.0.store(true, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_start_failure_is_fatal() {
        let mut host = ServiceHost::new(context());
        host.add(FailsToStart);

        match host.run().await {
            Err(HostError::Start { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("expected start failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_services_observe_shutdown() {
        let context = context();
        let stopped = Arc::new(AtomicBool::new(false));
        let mut host = ServiceHost::new(context.clone());
        host.add(Flag(stopped.clone()));

        context.shutdown.trigger();
        host.run().await.unwrap();

        assert!(stopped.load(Ordering::SeqCst));
    }
}
