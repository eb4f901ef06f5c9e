//! Notifier boundary
//!
//! The core calls into a notifier when alerts are raised or cleared. Operator
//! acknowledgements come back as plain method calls on the monitor.

use crate::model::{AggregateAlert, BlurEpisode, CameraAlert};
use chrono::{DateTime, Utc};

pub trait Notifier {
    fn on_alert_raised(&mut self, alert: &CameraAlert);

    fn on_aggregate_alert_raised(&mut self, alert: &AggregateAlert);

    fn on_alert_cleared(&mut self, _episode: &BlurEpisode) {}

    fn on_aggregate_cleared(&mut self, _site_id: &str, _at: DateTime<Utc>) {}
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn on_alert_raised(&mut self, alert: &CameraAlert) {
        (**self).on_alert_raised(alert)
    }

    fn on_aggregate_alert_raised(&mut self, alert: &AggregateAlert) {
        (**self).on_aggregate_alert_raised(alert)
    }

    fn on_alert_cleared(&mut self, episode: &BlurEpisode) {
        (**self).on_alert_cleared(episode)
    }

    fn on_aggregate_cleared(&mut self, site_id: &str, at: DateTime<Utc>) {
        (**self).on_aggregate_cleared(site_id, at)
    }
}

/// Everything a notifier was told, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Raised(CameraAlert),
    AggregateRaised(AggregateAlert),
    Cleared(BlurEpisode),
    AggregateCleared { site_id: String, at: DateTime<Utc> },
}

/// Notifier that keeps every call, for headless runs and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    pub notifications: Vec<Notification>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raised(&self) -> Vec<&CameraAlert> {
        self.notifications
            .iter()
            .filter_map(|n| match n {
                Notification::Raised(alert) => Some(alert),
                _ => None,
            })
            .collect()
    }

    pub fn aggregates(&self) -> Vec<&AggregateAlert> {
        self.notifications
            .iter()
            .filter_map(|n| match n {
                Notification::AggregateRaised(alert) => Some(alert),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn on_alert_raised(&mut self, alert: &CameraAlert) {
        self.notifications.push(Notification::Raised(alert.clone()));
    }

    fn on_aggregate_alert_raised(&mut self, alert: &AggregateAlert) {
        self.notifications.push(Notification::AggregateRaised(alert.clone()));
    }

    fn on_alert_cleared(&mut self, episode: &BlurEpisode) {
        self.notifications.push(Notification::Cleared(episode.clone()));
    }

    fn on_aggregate_cleared(&mut self, site_id: &str, at: DateTime<Utc>) {
        self.notifications.push(Notification::AggregateCleared {
            site_id: site_id.to_string(),
            at,
        });
    }
}
