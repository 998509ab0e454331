//! Per-endpoint, per-channel alert state machine
//!
//! Each endpoint owns one machine per configured notification channel
//! (email and webhook are independent and may use different thresholds).
//! The machine turns the stream of probe results into dispatch decisions:
//!
//! ```text
//! Ok           --failure--> Degraded(1)        (threshold > 1)
//! Ok           --failure--> Firing + notify    (threshold == 1)
//! Degraded(k)  --failure--> Degraded(k+1)      (k+1 < threshold)
//! Degraded(k)  --failure--> Firing + notify    (k+1 == threshold)
//! Degraded(k)  --success--> Ok                 (no recovery: nothing fired)
//! Firing       --failure--> Firing             (+ notify unless suppressed)
//! Firing       --success--> Ok + recovery      (if recovery subscribed)
//! ```
//!
//! Machines run synchronously inside the owning scheduler task, so results
//! for one endpoint are always observed in timestamp order.

use crate::config::NotifyEvents;

/// Current alert state for one endpoint/channel pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    /// Last probe succeeded (or nothing observed yet)
    Ok,

    /// `k` consecutive failures, below the threshold
    Degraded(u32),

    /// Threshold reached; a down alert has been dispatched (if subscribed)
    Firing,
}

/// Notification to dispatch after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEvent {
    Failure,
    Recovery,
}

/// Channel policy derived from the effective notification config
#[derive(Debug, Clone, Copy)]
pub struct AlertPolicy {
    /// Consecutive failures required before firing (>= 1)
    pub failure_threshold: u32,

    /// Which events the channel subscribes to
    pub events: NotifyEvents,

    /// Skip duplicate failure notifications while already firing
    pub suppress_repeated: bool,
}

/// Alert state machine for a single channel of a single endpoint
#[derive(Debug)]
pub struct ChannelAlerts {
    state: AlertState,
    policy: AlertPolicy,
}

impl ChannelAlerts {
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            state: AlertState::Ok,
            policy,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Feed one probe outcome into the machine and return the notification
    /// to dispatch, if any.
    ///
    /// The state transition itself never depends on the subscribed events:
    /// a channel subscribed only to `recovery` still moves through
    /// `Degraded` and `Firing`, it just stays silent on the way down.
    pub fn observe(&mut self, success: bool) -> Option<AlertEvent> {
        match (self.state, success) {
            (AlertState::Ok, true) => None,

            (AlertState::Ok, false) => {
                if self.policy.failure_threshold <= 1 {
                    self.state = AlertState::Firing;
                    self.policy.events.failure.then_some(AlertEvent::Failure)
                } else {
                    self.state = AlertState::Degraded(1);
                    None
                }
            }

            (AlertState::Degraded(k), false) => {
                let failures = k + 1;
                if failures >= self.policy.failure_threshold {
                    self.state = AlertState::Firing;
                    self.policy.events.failure.then_some(AlertEvent::Failure)
                } else {
                    self.state = AlertState::Degraded(failures);
                    None
                }
            }

            // The down alert never fired, so there is nothing to recover from
            (AlertState::Degraded(_), true) => {
                self.state = AlertState::Ok;
                None
            }

            (AlertState::Firing, false) => (!self.policy.suppress_repeated
                && self.policy.events.failure)
                .then_some(AlertEvent::Failure),

            // Recovery is sent regardless of suppress_repeated
            (AlertState::Firing, true) => {
                self.state = AlertState::Ok;
                self.policy.events.recovery.then_some(AlertEvent::Recovery)
            }
        }
    }
}
