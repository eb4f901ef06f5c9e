//! Tick loop
//!
//! One task owns the monitor. Ticks, operator commands and Ctrl-C are
//! multiplexed with `select!`, so every command runs between two ticks.

use crate::operator::OperatorCommand;
use anyhow::Result;
use blurwatch_core::{BlurMonitor, BlurSampler, ClearOutcome, EventSink, Notifier};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Totals reported when the loop stops.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub alerts: usize,
    pub aggregate_alerts: usize,
    pub episodes: usize,
    pub sink_failures: usize,
}

/// Hook for printing operator feedback and status.
pub trait OperatorView {
    fn show_message(&mut self, message: &str);
    fn show_status(&mut self, snapshot: &blurwatch_core::FleetSnapshot);
}

impl<W: std::io::Write> OperatorView for crate::console::ConsoleNotifier<W> {
    fn show_message(&mut self, message: &str) {
        self.print_message(message);
    }

    fn show_status(&mut self, snapshot: &blurwatch_core::FleetSnapshot) {
        self.print_status(snapshot);
    }
}

pub struct Simulation<S, K, N> {
    monitor: BlurMonitor<K, N>,
    sampler: S,
    interval: Duration,
    max_ticks: Option<u64>,
}

impl<S, K, N> Simulation<S, K, N>
where
    S: BlurSampler,
    K: EventSink,
    N: Notifier + OperatorView,
{
    pub fn new(monitor: BlurMonitor<K, N>, sampler: S, interval: Duration, max_ticks: Option<u64>) -> Self {
        Self {
            monitor,
            sampler,
            interval,
            max_ticks,
        }
    }

    pub fn monitor(&self) -> &BlurMonitor<K, N> {
        &self.monitor
    }

    /// Run until `max_ticks`, a `quit` command, or Ctrl-C.
    pub async fn run(&mut self, mut commands: Receiver<OperatorCommand>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut ticker = time::interval(self.interval);
        // a paused loop resumes with one tick, not a burst
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(&mut summary);
                    if self.max_ticks.is_some_and(|max| summary.ticks >= max) {
                        info!("Reached {} ticks, stopping", summary.ticks);
                        break;
                    }
                }
                Some(command) = commands.recv() => {
                    if !self.handle_command(command, &mut summary) {
                        break;
                    }
                }
                _ = &mut shutdown => {
                    info!("Interrupted, stopping");
                    break;
                }
            }
        }

        Ok(summary)
    }

    fn tick(&mut self, summary: &mut RunSummary) {
        let now = Utc::now();
        let samples = self.sampler.sample(now);
        let report = self.monitor.process_tick(now, samples);

        summary.ticks += 1;
        summary.alerts += report.alerts.len();
        summary.aggregate_alerts += report.aggregates.len();
        summary.sink_failures += report.sink_failures.len();
        debug!("Tick {} complete", summary.ticks);
    }

    /// Returns false when the loop should stop.
    fn handle_command(&mut self, command: OperatorCommand, summary: &mut RunSummary) -> bool {
        let now = Utc::now();
        match command {
            OperatorCommand::Clear(camera_id) => {
                let report = self.monitor.clear(&camera_id, now);
                if report.sink_failure.is_some() {
                    summary.sink_failures += 1;
                }
                match report.outcome {
                    ClearOutcome::Cleared(_) => {
                        summary.episodes += 1;
                        self.sampler.on_cleared(&camera_id);
                    }
                    ClearOutcome::NothingToClear => {
                        self.monitor
                            .notifier_mut()
                            .show_message(&format!("Nothing to clear for {}", camera_id));
                    }
                }
            }
            OperatorCommand::ClearSite => {
                if !self.monitor.clear_aggregate(now) {
                    self.monitor
                        .notifier_mut()
                        .show_message("No site-wide alert is active");
                }
            }
            OperatorCommand::Status => {
                let snapshot = self.monitor.snapshot();
                self.monitor.notifier_mut().show_status(&snapshot);
            }
            OperatorCommand::Quit => return false,
        }
        true
    }
}
