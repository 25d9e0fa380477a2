use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::animation::{LoopMode, PlaybackStrategy};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Animation", inline)]
#[serde(default)]
/// Trajectory playback parameters.
pub struct AnimationOptions {
    /// Interval between frames in milliseconds.
    #[schemars(title = "Speed (ms)", range(min = 10, max = 10000), extend("step" = 10))]
    pub speed_ms: u32,
    /// How the frame index advances.
    #[schemars(title = "Loop Mode")]
    pub loop_mode: LoopMode,
    /// Who owns the playback loop.
    #[schemars(skip)]
    pub strategy: PlaybackStrategy,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            speed_ms: 200,
            loop_mode: LoopMode::Forward,
            strategy: PlaybackStrategy::HostTimer,
        }
    }
}
