//! Monitoring engine
//!
//! The engine owns the shared resources (result store, notification
//! dispatcher, concurrency semaphore, root cancellation token) and spawns
//! one scheduler task per enabled endpoint.
//!
//! ```text
//!                  ┌─────────────────┐
//!                  │     Engine      │
//!                  └────────┬────────┘
//!                           │ spawns
//!          ┌────────────────┼────────────────┐
//!          │                │                │
//!  ┌───────▼───────┐        │        ┌───────▼───────┐
//!  │ Scheduler-1   │        │        │ Scheduler-N   │
//!  │ (endpoint A)  │        │        │ (endpoint N)  │
//!  └───────┬───────┘        │        └───────┬───────┘
//!          │   probe → store → metrics → alerts → notify
//!          └──── shared: semaphore, store, dispatcher ────┘
//! ```
//!
//! Shutdown cancels the root token and waits for every scheduler within a
//! drain deadline; stragglers are aborted and logged.

pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ResolvedConfig;
use crate::metrics;
use crate::notify::Dispatcher;
use crate::storage::ResultStore;
use scheduler::EndpointScheduler;

/// How long shutdown waits for in-flight probes and store writes
const DRAIN_DEADLINE: Duration = Duration::from_secs(10);

/// How often the process uptime gauge is refreshed
const UPTIME_REFRESH: Duration = Duration::from_secs(5);

pub struct Engine {
    store: Arc<dyn ResultStore>,
    cancel: CancellationToken,
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl Engine {
    /// Build the engine and spawn one scheduler per enabled endpoint plus
    /// the uptime gauge task.
    ///
    /// Store and dispatcher are injected; the engine never constructs
    /// backends itself.
    pub fn start(
        config: ResolvedConfig,
        store: Arc<dyn ResultStore>,
        dispatcher: Arc<Dispatcher>,
    ) -> anyhow::Result<Self> {
        let cancel = CancellationToken::new();
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_checks));

        let mut tasks = Vec::with_capacity(config.endpoints.len() + 1);

        for endpoint in config.endpoints {
            let name = endpoint.name.clone();
            let scheduler = EndpointScheduler::new(
                endpoint,
                store.clone(),
                dispatcher.clone(),
                semaphore.clone(),
                cancel.child_token(),
            )?;

            info!("scheduler started for {name}");
            tasks.push((name, tokio::spawn(scheduler.run())));
        }

        tasks.push(("uptime".to_string(), tokio::spawn(uptime_task(cancel.child_token()))));

        Ok(Self {
            store,
            cancel,
            tasks,
        })
    }

    /// Number of scheduler tasks (excluding the uptime task).
    pub fn endpoint_count(&self) -> usize {
        self.tasks.len().saturating_sub(1)
    }

    /// Cancel all schedulers and wait for them to drain.
    ///
    /// Each scheduler gets until the shared drain deadline to finish or
    /// abandon its in-flight probe; whatever is still running afterwards
    /// is aborted and its pending work dropped.
    pub async fn shutdown(self) {
        info!("shutting down engine");
        self.cancel.cancel();

        let deadline = tokio::time::Instant::now() + DRAIN_DEADLINE;

        for (name, handle) in self.tasks {
            let abort = handle.abort_handle();
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => debug!("task {name} drained"),
                Ok(Err(e)) => warn!("task {name} panicked: {e}"),
                Err(_) => {
                    warn!("task {name} did not drain within {DRAIN_DEADLINE:?}, aborting");
                    abort.abort();
                }
            }
        }

        if let Err(e) = self.store.close().await {
            warn!("error closing result store: {e}");
        }

        info!("engine stopped");
    }
}

/// Refresh the process uptime gauge until cancelled.
async fn uptime_task(cancel: CancellationToken) {
    let started = tokio::time::Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(UPTIME_REFRESH) => {
                metrics::set_uptime_seconds(started.elapsed().as_secs_f64());
            }
        }
    }
}
