use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::animation::DEFAULT_DURATION_FRAMES;
use crate::util::easing::EasingFunction;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Animation", inline)]
#[serde(default)]
/// Vehicle motion between snapshots.
pub struct AnimationOptions {
    /// Whether vehicles glide to new positions. When off they jump.
    #[schemars(title = "Smooth Motion")]
    pub enabled: bool,
    /// Frames per transition.
    #[schemars(title = "Duration (frames)", range(min = 1, max = 600))]
    pub duration_frames: u32,
    /// Interpolation curve.
    #[schemars(title = "Easing")]
    pub easing: EasingFunction,
    /// Target frame rate of the headless loop.
    #[schemars(title = "Frame Rate", range(min = 1, max = 240))]
    pub frame_rate: u32,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_frames: DEFAULT_DURATION_FRAMES,
            easing: EasingFunction::default(),
            frame_rate: 60,
        }
    }
}
