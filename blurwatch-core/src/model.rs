//! Camera fleet data model
//!
//! Identities, per-camera tracker state, and the value records handed to the
//! event sink and the notifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a production-line camera, e.g. `CAM-03`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraId(String);

impl CameraId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id for the `index`-th camera of a fleet, 1-based: `CAM-01`, `CAM-02`, ...
    pub fn numbered(index: usize) -> Self {
        Self(format!("CAM-{:02}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short label shown to operators (`CAM-07` -> `07`).
    pub fn label(&self) -> &str {
        self.0.rsplit('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CameraId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CameraId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A configured camera. Carries no mutable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    pub id: CameraId,
    pub line_number: u32,
    pub site_id: String,
}

impl Camera {
    /// Build the fleet `CAM-01..CAM-n`, one camera per production line.
    pub fn fleet(count: usize, site_id: &str) -> Vec<Camera> {
        (1..=count)
            .map(|index| Camera {
                id: CameraId::numbered(index),
                line_number: index as u32,
                site_id: site_id.to_string(),
            })
            .collect()
    }
}

/// Mutable tracker record for one camera.
///
/// `blur_started_at` is set iff the camera has an unresolved streak, and
/// `alert_active` implies `blur_started_at.is_some()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CameraState {
    pub is_blurry: bool,
    pub blur_started_at: Option<DateTime<Utc>>,
    pub alert_active: bool,
    pub last_alert_at: Option<DateTime<Utc>>,
    pub accumulated_blur_seconds: f64,
    pub last_sample_at: Option<DateTime<Utc>>,
}

impl CameraState {
    pub fn has_streak(&self) -> bool {
        self.blur_started_at.is_some()
    }

    /// Whether the state-machine invariants hold.
    pub fn is_consistent(&self) -> bool {
        !self.alert_active || self.blur_started_at.is_some()
    }
}

/// One sample of one camera, emitted every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickRecord {
    pub timestamp: DateTime<Utc>,
    pub camera_id: CameraId,
    pub is_blurry: bool,
}

/// Finalized record of one resolved streak. Created only on manual clear.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlurEpisode {
    camera_id: CameraId,
    started_at: DateTime<Utc>,
    cleared_at: DateTime<Utc>,
    duration_seconds: f64,
    alert_was_raised: bool,
}

impl BlurEpisode {
    pub fn new(
        camera_id: CameraId,
        started_at: DateTime<Utc>,
        cleared_at: DateTime<Utc>,
        alert_was_raised: bool,
    ) -> Self {
        Self {
            duration_seconds: elapsed_seconds(started_at, cleared_at),
            camera_id,
            started_at,
            cleared_at,
            alert_was_raised,
        }
    }

    pub fn camera_id(&self) -> &CameraId {
        &self.camera_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn cleared_at(&self) -> DateTime<Utc> {
        self.cleared_at
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn alert_was_raised(&self) -> bool {
        self.alert_was_raised
    }
}

/// Individual camera alert, handed to the notifier when raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraAlert {
    pub camera_id: CameraId,
    pub line_number: Option<u32>,
    pub site_id: String,
    pub blur_since: DateTime<Utc>,
    pub raised_at: DateTime<Utc>,
}

impl CameraAlert {
    /// Whole minutes the camera has been blurry, never less than one.
    pub fn minutes_blurry(&self) -> i64 {
        (elapsed_seconds(self.blur_since, self.raised_at) / 60.0)
            .floor()
            .max(1.0) as i64
    }
}

/// Site-wide alert raised when enough cameras alert inside the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateAlert {
    pub site_id: String,
    pub camera_ids: Vec<CameraId>,
    pub raised_at: DateTime<Utc>,
    pub washdown_hint: bool,
}

/// Result of an operator clear request.
#[derive(Debug, Clone, PartialEq)]
pub enum ClearOutcome {
    Cleared(BlurEpisode),
    NothingToClear,
}

impl ClearOutcome {
    pub fn episode(&self) -> Option<&BlurEpisode> {
        match self {
            ClearOutcome::Cleared(episode) => Some(episode),
            ClearOutcome::NothingToClear => None,
        }
    }
}

/// Seconds from `from` to `to`, clamped at zero when the clock ran backwards.
pub fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to.signed_duration_since(from);
    match delta.num_microseconds() {
        Some(micros) => (micros as f64 / 1_000_000.0).max(0.0),
        None => (delta.num_milliseconds() as f64 / 1000.0).max(0.0),
    }
}
