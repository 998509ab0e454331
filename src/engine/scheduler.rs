//! Per-endpoint probe scheduler
//!
//! One scheduler task owns everything mutable about its endpoint: the
//! probe executor, the endpoint bookkeeping, the metrics window and the
//! alert state machines. Results therefore flow through store, metrics
//! and alerting in strict probe order; nothing outside the task ever
//! touches this state.
//!
//! ## Tick computation
//!
//! Ticks are anchored to the scheduler's start instant, so drift from slow
//! probes does not accumulate: the next tick is the first anchor boundary
//! after `now`. A probe that overran a full interval triggers exactly one
//! immediate catch-up probe before the schedule re-anchors; overdue ticks
//! are never queued up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::alerts::{AlertEvent, AlertPolicy, ChannelAlerts};
use crate::config::ResolvedEndpoint;
use crate::metrics::{self, ResultWindow};
use crate::notify::Dispatcher;
use crate::probes::Prober;
use crate::storage::ResultStore;
use crate::{EndpointState, ProbeResult, ProbeStatus};

/// Wall-clock allowance on top of the configured probe timeout
const TIMEOUT_GRACE: Duration = Duration::from_millis(100);

pub struct EndpointScheduler {
    endpoint: ResolvedEndpoint,
    prober: Prober,
    store: Arc<dyn ResultStore>,
    dispatcher: Arc<Dispatcher>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,

    state: EndpointState,
    window: ResultWindow,
    email_alerts: Option<ChannelAlerts>,
    webhook_alerts: Option<ChannelAlerts>,
}

impl EndpointScheduler {
    pub fn new(
        endpoint: ResolvedEndpoint,
        store: Arc<dyn ResultStore>,
        dispatcher: Arc<Dispatcher>,
        semaphore: Arc<Semaphore>,
        cancel: CancellationToken,
    ) -> anyhow::Result<Self> {
        let prober = Prober::new(&endpoint.name, &endpoint.probe, endpoint.timeout)?;

        let email_alerts = endpoint.email.as_ref().map(|cfg| {
            ChannelAlerts::new(AlertPolicy {
                failure_threshold: cfg.failure_threshold,
                events: cfg.events,
                suppress_repeated: cfg.suppress_repeated,
            })
        });

        let webhook_alerts = endpoint.webhook.as_ref().map(|cfg| {
            ChannelAlerts::new(AlertPolicy {
                failure_threshold: cfg.failure_threshold,
                events: cfg.events,
                suppress_repeated: cfg.suppress_repeated,
            })
        });

        Ok(Self {
            endpoint,
            prober,
            store,
            dispatcher,
            semaphore,
            cancel,
            state: EndpointState::default(),
            window: ResultWindow::default(),
            email_alerts,
            webhook_alerts,
        })
    }

    /// Run the scheduler loop until cancellation.
    #[instrument(skip(self), fields(endpoint = %self.endpoint.name))]
    pub async fn run(mut self) {
        debug!("starting endpoint scheduler");

        let epoch = Instant::now();
        // First probe fires immediately
        let mut deadline = epoch;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep_until(deadline) => {}
            }

            // Admission: a miss is counted as backpressure, then the probe
            // proceeds as soon as a slot frees up (with its actual start time)
            let permit = match self.semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    metrics::record_backpressure();
                    trace!("probe slot busy, waiting");
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        permit = self.semaphore.clone().acquire_owned() => {
                            match permit {
                                Ok(permit) => permit,
                                Err(_) => break,
                            }
                        }
                    }
                }
            };

            let result = self.probe_once().await;
            drop(permit);

            // Shutdown mid-probe: the synthetic result must not reach the
            // store, the counters or the alert machines
            if result.is_cancelled() {
                trace!("discarding cancelled probe result");
                break;
            }

            self.process_result(result).await;

            let now = Instant::now();
            deadline = if now.duration_since(deadline) >= self.endpoint.interval {
                // Probe overran at least one anchor: single immediate catch-up
                trace!("probe overran interval, firing catch-up");
                now
            } else {
                next_tick(epoch, self.endpoint.interval, now)
            };
        }

        debug!("endpoint scheduler stopped");
    }

    /// Execute one probe, bounded by timeout + grace and by cancellation.
    async fn probe_once(&self) -> ProbeResult {
        let bound = self.endpoint.timeout + TIMEOUT_GRACE;

        tokio::select! {
            _ = self.cancel.cancelled() => ProbeResult::cancelled(&self.endpoint.name),
            outcome = tokio::time::timeout(bound, self.prober.probe()) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => ProbeResult::down(&self.endpoint.name, None, "timeout"),
                }
            }
        }
    }

    /// Feed a completed result to store, metrics and the alert machines,
    /// in that order, all within this task.
    async fn process_result(&mut self, result: ProbeResult) {
        trace!(
            "probe result: success={} detail={:?}",
            result.success, result.detail
        );

        // History is advisory: a failed write is counted and dropped
        if let Err(e) = self.store.record(&result).await {
            warn!("failed to record probe result: {e}");
            metrics::record_store_write_error();
        }

        metrics::record_check(&self.endpoint.name, result.status.as_str());
        if let Some(latency) = result.latency {
            metrics::record_response_time(&self.endpoint.name, latency);
        }
        metrics::set_endpoint_up(&self.endpoint.name, result.success);

        self.window.push(result.success, result.latency);
        if let Some(rate) = self.window.success_rate() {
            metrics::set_success_rate(&self.endpoint.name, rate);
        }
        if let Some(avg) = self.window.avg_response_time() {
            metrics::set_avg_response_time(&self.endpoint.name, avg);
        }

        self.state.observe(&result);

        if let (Some(machine), Some(cfg)) =
            (self.email_alerts.as_mut(), self.endpoint.email.as_ref())
            && let Some(event) = machine.observe(result.success)
        {
            if event == AlertEvent::Failure {
                self.state.last_notified_down = true;
            }
            self.dispatcher
                .send_email(cfg, &self.endpoint.name, event_status(event), &result)
                .await;
        }

        if let (Some(machine), Some(cfg)) =
            (self.webhook_alerts.as_mut(), self.endpoint.webhook.as_ref())
            && let Some(event) = machine.observe(result.success)
        {
            if event == AlertEvent::Failure {
                self.state.last_notified_down = true;
            }
            self.dispatcher
                .send_webhook(cfg, &self.endpoint.name, event_status(event), &result)
                .await;
        }
    }
}

fn event_status(event: AlertEvent) -> ProbeStatus {
    match event {
        AlertEvent::Failure => ProbeStatus::Down,
        AlertEvent::Recovery => ProbeStatus::Up,
    }
}

/// First anchor boundary strictly after `now`.
fn next_tick(epoch: Instant, interval: Duration, now: Instant) -> Instant {
    let elapsed = now.duration_since(epoch);
    let intervals = (elapsed.as_millis() / interval.as_millis()) as u32 + 1;
    epoch + interval * intervals
}
