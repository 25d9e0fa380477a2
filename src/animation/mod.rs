//! Trajectory playback.
//!
//! - [`LoopMode`] and [`FrameStepper`] compute the next frame index.
//! - [`IntervalTimer`] is a host-clocked repeating timer with an id.
//! - [`AnimationSynchronizer`] is the `Stopped`/`Playing` state machine
//!   that arms, cancels and fires timers.

mod loop_mode;
mod synchronizer;
mod timer;

pub use loop_mode::{Direction, FrameStepper, LoopMode};
pub use synchronizer::{
    AnimationSynchronizer, PlaybackState, PlaybackStrategy, Step,
};
pub use timer::{IntervalTimer, TimerId};
