//! Site-wide alert aggregation
//!
//! Keeps the most recent individual raise per camera inside a rolling window
//! and raises one aggregate alert when enough distinct cameras are alerting.

use crate::model::{elapsed_seconds, CameraId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Window, quorum and suppression for the aggregate alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatePolicy {
    pub window_seconds: f64,
    pub min_count: usize,
    pub suppress_seconds: f64,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    policy: AggregatePolicy,
    recent: BTreeMap<CameraId, DateTime<Utc>>,
    active: bool,
    last_alert_at: Option<DateTime<Utc>>,
}

impl Aggregator {
    pub fn new(policy: AggregatePolicy) -> Self {
        Self {
            policy,
            recent: BTreeMap::new(),
            active: false,
            last_alert_at: None,
        }
    }

    pub fn policy(&self) -> AggregatePolicy {
        self.policy
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn last_alert_at(&self) -> Option<DateTime<Utc>> {
        self.last_alert_at
    }

    /// Cameras currently counted towards the quorum.
    pub fn window_members(&self) -> Vec<CameraId> {
        self.recent.keys().cloned().collect()
    }

    /// Record an individual raise. Returns the contributing cameras when this
    /// raise tips the site into a (non-suppressed) aggregate alert.
    pub fn on_alert_raised(&mut self, camera_id: &CameraId, now: DateTime<Utc>) -> Option<Vec<CameraId>> {
        self.recent.insert(camera_id.clone(), now);

        let window = self.policy.window_seconds;
        self.recent
            .retain(|_, raised_at| elapsed_seconds(*raised_at, now) <= window);

        let count = self.recent.len();
        if count < self.policy.min_count {
            debug!("{} of {} cameras alerting inside window", count, self.policy.min_count);
            return None;
        }

        if let Some(last) = self.last_alert_at {
            if elapsed_seconds(last, now) < self.policy.suppress_seconds {
                debug!("Aggregate alert suppressed ({} cameras alerting)", count);
                return None;
            }
        }

        self.active = true;
        self.last_alert_at = Some(now);
        let contributors = self.window_members();
        info!("Raising aggregate alert for {} cameras", contributors.len());
        Some(contributors)
    }

    /// Drop a camera from the window once its alert is cleared. An already
    /// active aggregate alert stays active.
    pub fn on_alert_cleared(&mut self, camera_id: &CameraId) {
        if self.recent.remove(camera_id).is_some() {
            debug!("Camera {} left the aggregate window", camera_id);
        }
    }

    /// Operator acknowledgement of the aggregate alert.
    pub fn clear(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }
}
