//! Blur monitor
//!
//! Owns the fleet state and wires the tracker, aggregator and washdown
//! filter to an event sink and a notifier. Ticks and clears are `&mut self`
//! methods, so a clear can never interleave with a tick in progress.

use crate::aggregator::Aggregator;
use crate::config::BlurwatchConfig;
use crate::error::{ConfigError, SinkError};
use crate::model::{AggregateAlert, CameraAlert, CameraId, CameraState, ClearOutcome};
use crate::notify::Notifier;
use crate::sink::EventSink;
use crate::tracker::EpisodeTracker;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// What one tick produced.
#[derive(Debug, Default)]
pub struct TickReport {
    pub samples: usize,
    pub alerts: Vec<CameraAlert>,
    pub aggregates: Vec<AggregateAlert>,
    pub sink_failures: Vec<SinkError>,
}

/// What one clear request produced.
#[derive(Debug)]
pub struct ClearReport {
    pub outcome: ClearOutcome,
    pub sink_failure: Option<SinkError>,
}

/// Read-only view of the fleet for status displays.
#[derive(Debug, Clone)]
pub struct FleetSnapshot {
    pub site_id: String,
    pub cameras: Vec<(CameraId, CameraState)>,
    pub aggregate_active: bool,
}

impl FleetSnapshot {
    pub fn alerting(&self) -> impl Iterator<Item = &CameraId> {
        self.cameras
            .iter()
            .filter(|(_, state)| state.alert_active)
            .map(|(id, _)| id)
    }
}

pub struct BlurMonitor<S, N> {
    site_id: String,
    tracker: EpisodeTracker,
    aggregator: Aggregator,
    sink: S,
    notifier: N,
}

impl<S: EventSink, N: Notifier> BlurMonitor<S, N> {
    /// Build a monitor from a validated configuration.
    pub fn from_config(config: &BlurwatchConfig, sink: S, notifier: N) -> Result<Self, ConfigError> {
        config.validate()?;

        info!(
            "Monitoring {} cameras at site {} (threshold {}s, aggregate {} within {}s)",
            config.fleet.cameras,
            config.fleet.site_id,
            config.alerts.alert_threshold_seconds,
            config.aggregate.min_count,
            config.aggregate.window_seconds
        );

        Ok(Self {
            site_id: config.fleet.site_id.clone(),
            tracker: EpisodeTracker::new(&config.cameras(), config.alert_policy(), config.washdown_filter()),
            aggregator: Aggregator::new(config.aggregate_policy()),
            sink,
            notifier,
        })
    }

    pub fn tracker(&self) -> &EpisodeTracker {
        &self.tracker
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    /// Process one batch of samples taken at `at`.
    pub fn process_tick<I>(&mut self, at: DateTime<Utc>, samples: I) -> TickReport
    where
        I: IntoIterator<Item = (CameraId, bool)>,
    {
        let mut report = TickReport::default();

        for (camera_id, is_blurry) in samples {
            report.samples += 1;
            let outcome = self.tracker.record_sample(&camera_id, is_blurry, at);

            if let Err(err) = self.sink.append_tick(&outcome.tick) {
                warn!("Dropping tick record for {}: {}", camera_id, err);
                report.sink_failures.push(err);
            }

            let Some(alert) = outcome.alert else {
                continue;
            };

            self.notifier.on_alert_raised(&alert);
            if let Some(contributors) = self.aggregator.on_alert_raised(&alert.camera_id, at) {
                let aggregate = AggregateAlert {
                    site_id: self.site_id.clone(),
                    washdown_hint: self.washdown_hint(&contributors),
                    camera_ids: contributors,
                    raised_at: at,
                };
                self.notifier.on_aggregate_alert_raised(&aggregate);
                report.aggregates.push(aggregate);
            }
            report.alerts.push(alert);
        }

        debug!(
            "Tick at {}: {} samples, {} alerts",
            at.to_rfc3339(),
            report.samples,
            report.alerts.len()
        );
        report
    }

    /// Operator acknowledged a camera's blur.
    pub fn clear(&mut self, camera_id: &CameraId, at: DateTime<Utc>) -> ClearReport {
        let outcome = self.tracker.clear(camera_id, at);
        let mut sink_failure = None;

        if let ClearOutcome::Cleared(episode) = &outcome {
            if let Err(err) = self.sink.append_episode(episode) {
                warn!("Failed to record blur episode for {}: {}", camera_id, err);
                sink_failure = Some(err);
            }
            self.aggregator.on_alert_cleared(camera_id);
            self.notifier.on_alert_cleared(episode);
        }

        ClearReport { outcome, sink_failure }
    }

    /// Operator acknowledged the site-wide alert. Returns whether one was active.
    pub fn clear_aggregate(&mut self, at: DateTime<Utc>) -> bool {
        if !self.aggregator.clear() {
            warn!("No aggregate alert active for site {}", self.site_id);
            return false;
        }
        info!("Aggregate alert for site {} cleared", self.site_id);
        self.notifier.on_aggregate_cleared(&self.site_id, at);
        true
    }

    pub fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot {
            site_id: self.site_id.clone(),
            cameras: self
                .tracker
                .states()
                .map(|(id, state)| (id.clone(), state.clone()))
                .collect(),
            aggregate_active: self.aggregator.is_active(),
        }
    }

    /// True when any contributor's streak began inside a washdown window.
    fn washdown_hint(&self, contributors: &[CameraId]) -> bool {
        let washdown = self.tracker.washdown();
        contributors.iter().any(|id| {
            self.tracker
                .state(id)
                .and_then(|state| state.blur_started_at)
                .map(|started| washdown.is_active_at(started))
                .unwrap_or(false)
        })
    }
}
