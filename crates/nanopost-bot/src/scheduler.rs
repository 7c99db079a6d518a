//! Heartbeat scheduling
//!
//! Two states: `Idle` between heartbeats and `Running` while one executes.
//! Shutdown is only observed while idle, so a heartbeat that has started
//! always finishes, state save included.

use crate::heartbeat::Heartbeat;
use crate::stats::RoundStats;
use nanopost_client::{ForumApi, TextGenerator};
use nanopost_core::Clock;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Drives a [`Heartbeat`] once or on a fixed interval
pub struct Scheduler<F, G, C> {
    heartbeat: Heartbeat<F, G, C>,
    interval: Duration,
    state: SchedulerState,
}

impl<F, G, C> Scheduler<F, G, C>
where
    F: ForumApi,
    G: TextGenerator,
    C: Clock,
{
    pub fn new(heartbeat: Heartbeat<F, G, C>, interval: Duration) -> Self {
        Self {
            heartbeat,
            interval,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn heartbeat(&self) -> &Heartbeat<F, G, C> {
        &self.heartbeat
    }

    /// Execute exactly one heartbeat
    pub async fn run_once(&mut self) -> RoundStats {
        self.state = SchedulerState::Running;
        let stats = self.heartbeat.run().await;
        self.state = SchedulerState::Idle;
        stats
    }

    /// Run a heartbeat immediately, then one per interval until `shutdown`
    /// completes while idle
    ///
    /// Returns the number of heartbeats run.
    pub async fn run_until<S>(&mut self, shutdown: S) -> u64
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        info!(
            "Heartbeat every {} minutes, press Ctrl+C to stop",
            self.interval.as_secs() / 60
        );

        self.run_once().await;
        let mut cycles = 1;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping after {} heartbeats", cycles);
                    break;
                }
                _ = ticker.tick() => {
                    self.run_once().await;
                    cycles += 1;
                }
            }
        }

        cycles
    }
}
