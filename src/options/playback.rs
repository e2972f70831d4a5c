use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::interpolation::Easing;

/// Timeline, motion and prefetch settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Playback", inline)]
#[serde(default)]
pub struct PlaybackOptions {
    /// Speed multiplier; the step interval is `base_interval_ms / factor`.
    #[schemars(title = "Speed")]
    pub factor: f32,
    /// Step interval at speed 1.
    #[schemars(title = "Step Interval (ms)")]
    pub base_interval_ms: f32,
    /// Advance fractionally every frame instead of one keyframe per step.
    #[schemars(title = "Continuous")]
    pub continuous: bool,
    /// Easing applied to transition progress.
    #[schemars(title = "Easing")]
    pub easing: Easing,
    /// Only animate the cover atoms of the current transition.
    #[schemars(title = "Subtree-Only Motion")]
    pub subtree_only_motion: bool,
    /// Let the whole tree rotate with its root.
    #[schemars(title = "Rigid Rotation")]
    pub rigid_rotation: bool,
    /// Draw motion trails behind moving leaves.
    #[schemars(title = "Motion Trails")]
    pub motion_trails: bool,
    /// Sub-frames per trail.
    #[schemars(title = "Trail Length")]
    pub trail_length: usize,
    /// Progress between trail sub-frames.
    #[schemars(title = "Trail Step")]
    pub trail_step: f32,
    /// Keyframes around the current one worth keeping jobs for.
    #[schemars(skip)]
    pub prefetch_horizon: usize,
    /// Keyframes past the target to prefetch speculatively.
    #[schemars(skip)]
    pub prefetch_ahead: usize,
    /// Failures on one keyframe before it is given up on.
    #[schemars(skip)]
    pub max_worker_failures: u32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            factor: 1.0,
            base_interval_ms: 1000.0,
            continuous: false,
            easing: Easing::Linear,
            subtree_only_motion: false,
            rigid_rotation: false,
            motion_trails: false,
            trail_length: 6,
            trail_step: 0.04,
            prefetch_horizon: 4,
            prefetch_ahead: 2,
            max_worker_failures: 3,
        }
    }
}

impl PlaybackOptions {
    /// Milliseconds between steps at the current factor.
    pub fn interval_ms(&self) -> f32 {
        self.base_interval_ms / self.factor.max(f32::EPSILON)
    }
}
