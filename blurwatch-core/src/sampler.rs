use crate::model::CameraId;
use chrono::{DateTime, Utc};

/// Source of per-camera blurry/not-blurry samples, one batch per tick.
pub trait BlurSampler {
    fn sample(&mut self, at: DateTime<Utc>) -> Vec<(CameraId, bool)>;

    /// The operator wiped this camera's lens.
    fn on_cleared(&mut self, _camera_id: &CameraId) {}
}

/// Replays a fixed script of samples; once exhausted every camera reads clean.
#[derive(Debug, Clone)]
pub struct ScriptedSampler {
    cameras: Vec<CameraId>,
    script: Vec<Vec<bool>>,
    position: usize,
}

impl ScriptedSampler {
    /// `script[tick][camera]` is the sample for that camera on that tick.
    pub fn new(cameras: Vec<CameraId>, script: Vec<Vec<bool>>) -> Self {
        Self {
            cameras,
            script,
            position: 0,
        }
    }
}

impl BlurSampler for ScriptedSampler {
    fn sample(&mut self, _at: DateTime<Utc>) -> Vec<(CameraId, bool)> {
        let row = self.script.get(self.position);
        self.position += 1;
        self.cameras
            .iter()
            .enumerate()
            .map(|(index, id)| {
                let blurry = row.and_then(|r| r.get(index)).copied().unwrap_or(false);
                (id.clone(), blurry)
            })
            .collect()
    }
}
