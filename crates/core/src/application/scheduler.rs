//! Retrieval Scheduler - the single long-lived loop that triggers rounds
//!
//! State machine:
//! - `Running`: a round is in progress (the loop blocks on it)
//! - `IdleWait`: both queues empty, waiting for an enqueue signal
//! - `ThrottleWait`: work pending, waiting for the throttle window to close
//!   (an enqueue signal also wakes it, but cannot start a round early)
//! - `Stopped`: shutdown received, loop exited
//!
//! A round starts when no round has started yet or at least
//! `throttle_window` has passed since the previous round *started*. A round
//! on empty queues is a no-op but still counts as a start.

use super::lane::Lanes;
use super::round::{RetrievalRound, RoundOutcome};
use super::worker::ShutdownToken;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulerState {
    /// Not started yet
    Created,
    IdleWait,
    ThrottleWait,
    Running,
    Stopped,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Created => write!(f, "CREATED"),
            SchedulerState::IdleWait => write!(f, "IDLE_WAIT"),
            SchedulerState::ThrottleWait => write!(f, "THROTTLE_WAIT"),
            SchedulerState::Running => write!(f, "RUNNING"),
            SchedulerState::Stopped => write!(f, "STOPPED"),
        }
    }
}

pub struct RetrievalScheduler {
    lanes: Arc<Lanes>,
    round: RetrievalRound,
    throttle_window: Duration,
    state: Arc<watch::Sender<SchedulerState>>,
}

impl RetrievalScheduler {
    pub fn new(
        lanes: Arc<Lanes>,
        round: RetrievalRound,
        throttle_window: Duration,
        state: Arc<watch::Sender<SchedulerState>>,
    ) -> Self {
        Self {
            lanes,
            round,
            throttle_window,
            state,
        }
    }

    /// Run the scheduling loop until `shutdown` fires
    ///
    /// Should be spawned with tokio::spawn. Pending identifiers are left in
    /// their queues on exit.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            throttle_window_ms = self.throttle_window.as_millis() as u64,
            "Retrieval scheduler started"
        );

        let mut last_round: Option<Instant> = None;
        let mut rounds: u64 = 0;

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            let now = Instant::now();
            let due = last_round.map_or(true, |started| {
                now.saturating_duration_since(started) >= self.throttle_window
            });

            if due {
                self.set_state(SchedulerState::Running);
                last_round = Some(now);
                rounds += 1;

                match self.round.run_until_stopped(shutdown.clone()).await {
                    RoundOutcome::Idle => debug!(round = rounds, "Nothing queued"),
                    RoundOutcome::Completed(report) => info!(
                        round = rounds,
                        cell_dispatched = report.cell.dispatched(),
                        wifi_dispatched = report.wifi.dispatched(),
                        located = report.cell.dispatch.located + report.wifi.dispatch.located,
                        pending_cell = self.lanes.cell.queue().len(),
                        pending_wifi = self.lanes.wifi.queue().len(),
                        "Retrieval round completed"
                    ),
                    RoundOutcome::Interrupted => break,
                }
            } else {
                debug!("Throttled, waiting for window to close");
            }

            if self.lanes.is_empty() {
                self.set_state(SchedulerState::IdleWait);
                tokio::select! {
                    biased;
                    _ = shutdown.wait() => break,
                    _ = self.lanes.woken() => {}
                }
            } else {
                self.set_state(SchedulerState::ThrottleWait);
                // `due` rounds always set last_round, so this is Some here
                let deadline = last_round.map_or(now, |started| started + self.throttle_window);
                tokio::select! {
                    biased;
                    _ = shutdown.wait() => break,
                    _ = self.lanes.woken() => {}
                    _ = sleep_until(deadline) => {}
                }
            }
        }

        self.set_state(SchedulerState::Stopped);
        info!(rounds, "Retrieval scheduler stopped");
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }
}
