//! Episode Tracker
//!
//! Per-camera blur streak state machine. A streak starts on the first blurry
//! sample and ends only when an operator clears it; a camera turning clean on
//! its own keeps the streak open so the episode duration reflects how long the
//! issue really lasted.

use crate::model::{elapsed_seconds, BlurEpisode, Camera, CameraAlert, CameraId, CameraState, ClearOutcome, TickRecord};
use crate::washdown::WashdownFilter;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Thresholds for raising an individual camera alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertPolicy {
    pub alert_threshold_seconds: f64,
    pub suppress_seconds: f64,
}

/// What one sample produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome {
    pub tick: TickRecord,
    pub alert: Option<CameraAlert>,
}

#[derive(Debug, Clone)]
pub struct EpisodeTracker {
    policy: AlertPolicy,
    washdown: WashdownFilter,
    cameras: BTreeMap<CameraId, Camera>,
    states: BTreeMap<CameraId, CameraState>,
    default_site: String,
}

impl EpisodeTracker {
    /// Create a tracker with one idle state per configured camera.
    pub fn new(cameras: &[Camera], policy: AlertPolicy, washdown: WashdownFilter) -> Self {
        let default_site = cameras
            .first()
            .map(|camera| camera.site_id.clone())
            .unwrap_or_default();

        Self {
            policy,
            washdown,
            states: cameras
                .iter()
                .map(|camera| (camera.id.clone(), CameraState::default()))
                .collect(),
            cameras: cameras
                .iter()
                .map(|camera| (camera.id.clone(), camera.clone()))
                .collect(),
            default_site,
        }
    }

    pub fn policy(&self) -> AlertPolicy {
        self.policy
    }

    pub fn washdown(&self) -> &WashdownFilter {
        &self.washdown
    }

    pub fn state(&self, camera_id: &CameraId) -> Option<&CameraState> {
        self.states.get(camera_id)
    }

    pub fn states(&self) -> impl Iterator<Item = (&CameraId, &CameraState)> {
        self.states.iter()
    }

    pub fn camera(&self, camera_id: &CameraId) -> Option<&Camera> {
        self.cameras.get(camera_id)
    }

    /// Fold one sample into the camera's streak and decide whether to alert.
    pub fn record_sample(&mut self, camera_id: &CameraId, is_blurry: bool, at: DateTime<Utc>) -> SampleOutcome {
        let washdown_active = self.washdown.is_active_at(at);
        let policy = self.policy;

        let state = self.states.entry(camera_id.clone()).or_insert_with(|| {
            debug!("Tracking unconfigured camera {}", camera_id);
            CameraState::default()
        });

        let elapsed = state
            .last_sample_at
            .map(|previous| elapsed_seconds(previous, at))
            .unwrap_or(0.0);

        if is_blurry {
            if state.blur_started_at.is_none() {
                state.blur_started_at = Some(at);
                state.accumulated_blur_seconds = 0.0;
                debug!("Camera {} blur streak started at {}", camera_id, at.to_rfc3339());
            } else {
                state.accumulated_blur_seconds += elapsed;
            }
        }
        state.is_blurry = is_blurry;
        state.last_sample_at = Some(at);

        let mut alert = None;
        if let Some(blur_since) = state.blur_started_at {
            if !state.alert_active && state.accumulated_blur_seconds >= policy.alert_threshold_seconds {
                let suppressed = state
                    .last_alert_at
                    .map(|last| elapsed_seconds(last, at) < policy.suppress_seconds)
                    .unwrap_or(false);

                if washdown_active {
                    debug!("Camera {} over threshold during washdown, not alerting", camera_id);
                } else if suppressed {
                    debug!("Camera {} alert suppressed until suppression window passes", camera_id);
                } else {
                    state.alert_active = true;
                    state.last_alert_at = Some(at);

                    let camera = self.cameras.get(camera_id);
                    let raised = CameraAlert {
                        camera_id: camera_id.clone(),
                        line_number: camera.map(|c| c.line_number),
                        site_id: camera
                            .map(|c| c.site_id.clone())
                            .unwrap_or_else(|| self.default_site.clone()),
                        blur_since,
                        raised_at: at,
                    };
                    info!(
                        "Camera {} blurry for {:.0}s, raising alert",
                        camera_id, state.accumulated_blur_seconds
                    );
                    alert = Some(raised);
                }
            }
        }

        SampleOutcome {
            tick: TickRecord {
                timestamp: at,
                camera_id: camera_id.clone(),
                is_blurry,
            },
            alert,
        }
    }

    /// Finalize the camera's streak on operator acknowledgement.
    ///
    /// `last_alert_at` survives the reset so the next streak on this camera
    /// is still subject to the suppression window.
    pub fn clear(&mut self, camera_id: &CameraId, at: DateTime<Utc>) -> ClearOutcome {
        let Some(state) = self.states.get_mut(camera_id) else {
            warn!("Clear requested for unknown camera {}", camera_id);
            return ClearOutcome::NothingToClear;
        };

        let Some(started_at) = state.blur_started_at else {
            warn!("Nothing to clear for camera {}", camera_id);
            return ClearOutcome::NothingToClear;
        };

        let episode = BlurEpisode::new(camera_id.clone(), started_at, at, state.alert_active);

        state.blur_started_at = None;
        state.accumulated_blur_seconds = 0.0;
        state.alert_active = false;
        state.is_blurry = false;

        info!(
            "Camera {} cleared after {:.0}s (alert raised: {})",
            camera_id,
            episode.duration_seconds(),
            episode.alert_was_raised()
        );
        ClearOutcome::Cleared(episode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::washdown::{WashdownClock, WashdownSchedule};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn tracker(threshold: f64, suppress: f64) -> EpisodeTracker {
        EpisodeTracker::new(
            &Camera::fleet(3, "SiteA"),
            AlertPolicy {
                alert_threshold_seconds: threshold,
                suppress_seconds: suppress,
            },
            WashdownFilter::default(),
        )
    }

    fn cam(index: usize) -> CameraId {
        CameraId::numbered(index)
    }

    fn assert_invariants(tracker: &EpisodeTracker) {
        for (id, state) in tracker.states() {
            assert!(state.is_consistent(), "alert without streak on {}", id);
        }
    }

    #[test]
    fn test_streak_starts_on_first_blurry_sample() {
        let mut tracker = tracker(60.0, 300.0);
        let outcome = tracker.record_sample(&cam(1), true, t0());

        let state = tracker.state(&cam(1)).unwrap();
        assert_eq!(state.blur_started_at, Some(t0()));
        assert_eq!(state.accumulated_blur_seconds, 0.0);
        assert!(outcome.alert.is_none());
        assert!(outcome.tick.is_blurry);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut tracker = tracker(10.0, 300.0);
        tracker.record_sample(&cam(1), true, t0());
        let before = tracker.record_sample(&cam(1), true, t0() + Duration::seconds(5));
        assert!(before.alert.is_none());

        let at = tracker.record_sample(&cam(1), true, t0() + Duration::seconds(10));
        let alert = at.alert.expect("alert at exactly the threshold");
        assert_eq!(alert.blur_since, t0());
        assert_eq!(alert.line_number, Some(1));
        assert_eq!(alert.site_id, "SiteA");
        assert_invariants(&tracker);
    }

    #[test]
    fn test_no_repeat_raise_while_active() {
        let mut tracker = tracker(5.0, 0.0);
        let mut raised = 0;
        for i in 0..10 {
            let outcome = tracker.record_sample(&cam(1), true, t0() + Duration::seconds(5 * i));
            raised += outcome.alert.is_some() as usize;
        }
        assert_eq!(raised, 1);
    }

    #[test]
    fn test_clean_sample_keeps_streak_open() {
        let mut tracker = tracker(60.0, 300.0);
        tracker.record_sample(&cam(1), true, t0());
        tracker.record_sample(&cam(1), true, t0() + Duration::seconds(5));
        tracker.record_sample(&cam(1), false, t0() + Duration::seconds(10));

        let state = tracker.state(&cam(1)).unwrap();
        assert!(!state.is_blurry);
        assert_eq!(state.blur_started_at, Some(t0()));
        assert_eq!(state.accumulated_blur_seconds, 5.0);
    }

    #[test]
    fn test_blurry_sample_counts_time_since_previous_tick() {
        let mut tracker = tracker(60.0, 300.0);
        tracker.record_sample(&cam(1), true, t0());
        tracker.record_sample(&cam(1), false, t0() + Duration::seconds(30));
        assert_eq!(tracker.state(&cam(1)).unwrap().accumulated_blur_seconds, 0.0);

        tracker.record_sample(&cam(1), true, t0() + Duration::seconds(60));
        tracker.record_sample(&cam(1), true, t0() + Duration::seconds(65));

        let state = tracker.state(&cam(1)).unwrap();
        assert_eq!(state.accumulated_blur_seconds, 35.0);
    }

    #[test]
    fn test_flickering_camera_still_alerts() {
        let mut tracker = tracker(60.0, 300.0);
        let mut raised_at = None;

        for i in 0..200 {
            let at = t0() + Duration::seconds(5 * i);
            let outcome = tracker.record_sample(&cam(1), i % 2 == 0, at);
            if outcome.alert.is_some() {
                assert!(raised_at.is_none(), "raised twice");
                raised_at = Some(at);
            }
        }

        // every blurry tick after the first adds the 5s since the clean tick before it
        assert_eq!(raised_at, Some(t0() + Duration::seconds(120)));
        assert_invariants(&tracker);
    }

    #[test]
    fn test_irregular_cadence_uses_real_deltas() {
        let mut tracker = tracker(60.0, 300.0);
        tracker.record_sample(&cam(1), true, t0());
        tracker.record_sample(&cam(1), true, t0() + Duration::seconds(5));
        // simulator paused for a while
        let outcome = tracker.record_sample(&cam(1), true, t0() + Duration::seconds(65));

        assert_eq!(tracker.state(&cam(1)).unwrap().accumulated_blur_seconds, 65.0);
        assert!(outcome.alert.is_some());
    }

    #[test]
    fn test_backwards_clock_clamps_to_zero() {
        let mut tracker = tracker(60.0, 300.0);
        tracker.record_sample(&cam(1), true, t0());
        tracker.record_sample(&cam(1), true, t0() - Duration::seconds(120));

        assert_eq!(tracker.state(&cam(1)).unwrap().accumulated_blur_seconds, 0.0);
    }

    #[test]
    fn test_clear_before_streak_start_has_zero_duration() {
        let mut tracker = tracker(60.0, 300.0);
        tracker.record_sample(&cam(1), true, t0());

        let outcome = tracker.clear(&cam(1), t0() - Duration::seconds(45));
        let episode = outcome.episode().expect("episode");
        assert_eq!(episode.duration_seconds(), 0.0);
        assert!(!tracker.state(&cam(1)).unwrap().has_streak());
    }

    #[test]
    fn test_backwards_clock_keeps_next_streak_suppressed() {
        let mut tracker = tracker(0.0, 60.0);
        let first = tracker.record_sample(&cam(1), true, t0() + Duration::seconds(100));
        assert!(first.alert.is_some());
        tracker.clear(&cam(1), t0() + Duration::seconds(101));

        // host clock jumps back below the last raise
        let outcome = tracker.record_sample(&cam(1), true, t0() + Duration::seconds(50));
        assert!(outcome.alert.is_none());
        assert!(tracker.state(&cam(1)).unwrap().has_streak());
        assert_eq!(
            tracker.state(&cam(1)).unwrap().last_alert_at,
            Some(t0() + Duration::seconds(100))
        );

        let later = tracker.record_sample(&cam(1), true, t0() + Duration::seconds(160));
        assert!(later.alert.is_some());
    }

    #[test]
    fn test_clear_without_streak_is_noop() {
        let mut tracker = tracker(60.0, 300.0);
        tracker.record_sample(&cam(2), false, t0());

        assert_eq!(tracker.clear(&cam(2), t0()), ClearOutcome::NothingToClear);
        assert_eq!(tracker.clear(&CameraId::from("CAM-99"), t0()), ClearOutcome::NothingToClear);
        assert_eq!(tracker.state(&cam(2)).unwrap(), &CameraState {
            last_sample_at: Some(t0()),
            ..CameraState::default()
        });
    }

    #[test]
    fn test_clear_produces_episode_and_resets() {
        let mut tracker = tracker(10.0, 300.0);
        for i in 0..3 {
            tracker.record_sample(&cam(1), true, t0() + Duration::seconds(5 * i));
        }
        let cleared_at = t0() + Duration::seconds(42);

        let outcome = tracker.clear(&cam(1), cleared_at);
        let episode = outcome.episode().expect("episode");
        assert_eq!(episode.started_at(), t0());
        assert_eq!(episode.cleared_at(), cleared_at);
        assert_eq!(episode.duration_seconds(), 42.0);
        assert!(episode.alert_was_raised());

        let state = tracker.state(&cam(1)).unwrap();
        assert!(!state.has_streak());
        assert!(!state.alert_active);
        assert!(!state.is_blurry);
        assert_eq!(state.accumulated_blur_seconds, 0.0);
        assert_eq!(state.last_alert_at, Some(t0() + Duration::seconds(10)));
        assert_invariants(&tracker);
    }

    #[test]
    fn test_suppression_applies_to_next_streak() {
        let mut tracker = tracker(5.0, 60.0);
        tracker.record_sample(&cam(1), true, t0());
        assert!(tracker.record_sample(&cam(1), true, t0() + Duration::seconds(5)).alert.is_some());
        tracker.clear(&cam(1), t0() + Duration::seconds(6));

        tracker.record_sample(&cam(1), true, t0() + Duration::seconds(10));
        let early = tracker.record_sample(&cam(1), true, t0() + Duration::seconds(20));
        assert!(early.alert.is_none(), "second raise inside suppression window");

        let late = tracker.record_sample(&cam(1), true, t0() + Duration::seconds(65));
        assert!(late.alert.is_some());
    }

    #[test]
    fn test_washdown_blocks_raise_but_not_bookkeeping() {
        let washdown = WashdownFilter::new(
            "11:55-12:05".parse::<WashdownSchedule>().unwrap(),
            WashdownClock::Utc,
        );
        let mut tracker = EpisodeTracker::new(
            &Camera::fleet(1, "SiteA"),
            AlertPolicy {
                alert_threshold_seconds: 10.0,
                suppress_seconds: 300.0,
            },
            washdown,
        );

        for i in 0..=12 {
            let outcome = tracker.record_sample(&cam(1), true, t0() + Duration::seconds(20 * i));
            assert!(outcome.alert.is_none(), "alert raised during washdown at tick {}", i);
            assert_eq!(outcome.tick.camera_id, cam(1));
        }
        assert_eq!(tracker.state(&cam(1)).unwrap().accumulated_blur_seconds, 240.0);
        assert!(!tracker.state(&cam(1)).unwrap().alert_active);

        // first tick after the window closes
        let outcome = tracker.record_sample(&cam(1), true, t0() + Duration::seconds(320));
        assert!(outcome.alert.is_some());
    }
}
