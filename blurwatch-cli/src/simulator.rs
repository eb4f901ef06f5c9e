//! Random camera blur simulator
//!
//! Each clean camera turns blurry with a fixed probability per tick. A blurry
//! camera stays blurry until its lens is wiped, unless auto-clear is enabled.

use blurwatch_core::config::SimulatorConfig;
use blurwatch_core::{BlurSampler, Camera, CameraId};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct RandomSampler<R = StdRng> {
    cameras: Vec<(CameraId, bool)>,
    rng: R,
    blur_on_probability: f64,
    blur_off_probability: f64,
    auto_clear: bool,
}

impl RandomSampler<StdRng> {
    pub fn new(cameras: &[Camera], settings: &SimulatorConfig) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(cameras, settings, rng)
    }
}

impl<R: Rng> RandomSampler<R> {
    pub fn with_rng(cameras: &[Camera], settings: &SimulatorConfig, rng: R) -> Self {
        Self {
            cameras: cameras.iter().map(|camera| (camera.id.clone(), false)).collect(),
            rng,
            blur_on_probability: settings.blur_on_probability.clamp(0.0, 1.0),
            blur_off_probability: settings.blur_off_probability.clamp(0.0, 1.0),
            auto_clear: settings.auto_clear,
        }
    }

    /// Force a camera's state, e.g. when the lens was wiped.
    pub fn set_blurry(&mut self, camera_id: &CameraId, is_blurry: bool) {
        if let Some((_, blurry)) = self.cameras.iter_mut().find(|(id, _)| id == camera_id) {
            *blurry = is_blurry;
        }
    }
}

impl<R: Rng> BlurSampler for RandomSampler<R> {
    fn sample(&mut self, _at: DateTime<Utc>) -> Vec<(CameraId, bool)> {
        for (_, blurry) in self.cameras.iter_mut() {
            if !*blurry {
                if self.rng.gen_bool(self.blur_on_probability) {
                    *blurry = true;
                }
            } else if self.auto_clear && self.rng.gen_bool(self.blur_off_probability) {
                *blurry = false;
            }
        }
        self.cameras.clone()
    }

    fn on_cleared(&mut self, camera_id: &CameraId) {
        self.set_blurry(camera_id, false);
    }
}
