use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How the frame index advances during playback.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// 0, 1, ..., n-1, 0, ...
    #[default]
    Forward,
    /// n-1, ..., 1, 0, n-1, ...
    Backward,
    /// 0, 1, ..., n-1, n-2, ..., 0, 1, ...
    PingPong,
}

impl LoopMode {
    /// Every mode, in control order.
    pub const ALL: [Self; 3] = [Self::Forward, Self::Backward, Self::PingPong];

    /// Host-facing name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::PingPong => "pingpong",
        }
    }

    /// Name the external viewer's own animation loop expects.
    #[must_use]
    pub const fn viewer_name(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::PingPong => "backAndForth",
        }
    }

    /// Parse a host-facing name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == name)
    }
}

/// Travel direction for ping-pong playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Increasing indices.
    #[default]
    Up,
    /// Decreasing indices.
    Down,
}

/// Computes successive frame indices for a [`LoopMode`].
///
/// Only ping-pong carries state (its direction); forward and backward are
/// pure functions of the current index.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStepper {
    direction: Direction,
}

impl FrameStepper {
    /// Current ping-pong direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Forget any ping-pong state.
    pub fn reset(&mut self) {
        self.direction = Direction::Up;
    }

    /// Next frame after `current`, or `None` when there is nothing to
    /// advance to (`total <= 1`).
    pub fn next(
        &mut self,
        current: usize,
        total: usize,
        mode: LoopMode,
    ) -> Option<usize> {
        if total <= 1 {
            return None;
        }
        let current = current.min(total - 1);
        let next = match mode {
            LoopMode::Forward => (current + 1) % total,
            LoopMode::Backward => (current + total - 1) % total,
            LoopMode::PingPong => {
                let at_top = current >= total - 1;
                let at_bottom = current == 0;
                match self.direction {
                    Direction::Up if at_top => self.direction = Direction::Down,
                    Direction::Down if at_bottom => {
                        self.direction = Direction::Up;
                    }
                    _ => {}
                }
                match self.direction {
                    Direction::Up => current + 1,
                    Direction::Down => current - 1,
                }
            }
        };
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(mode: LoopMode, start: usize, total: usize, steps: usize) -> Vec<usize> {
        let mut stepper = FrameStepper::default();
        let mut frame = start;
        let mut seen = vec![frame];
        for _ in 0..steps {
            frame = stepper.next(frame, total, mode).unwrap();
            seen.push(frame);
        }
        seen
    }

    #[test]
    fn forward_wraps_to_zero() {
        assert_eq!(run(LoopMode::Forward, 3, 5, 3), [3, 4, 0, 1]);
    }

    #[test]
    fn backward_wraps_to_last() {
        assert_eq!(run(LoopMode::Backward, 1, 5, 3), [1, 0, 4, 3]);
    }

    #[test]
    fn pingpong_bounces_without_repeating_ends() {
        assert_eq!(
            run(LoopMode::PingPong, 0, 4, 8),
            [0, 1, 2, 3, 2, 1, 0, 1, 2]
        );
    }

    #[test]
    fn pingpong_with_two_frames_alternates() {
        assert_eq!(run(LoopMode::PingPong, 0, 2, 4), [0, 1, 0, 1, 0]);
    }

    #[test]
    fn single_frame_has_no_successor() {
        let mut stepper = FrameStepper::default();
        for mode in LoopMode::ALL {
            assert_eq!(stepper.next(0, 1, mode), None);
            assert_eq!(stepper.next(0, 0, mode), None);
        }
    }

    #[test]
    fn names_round_trip() {
        for mode in LoopMode::ALL {
            assert_eq!(LoopMode::from_name(mode.as_str()), Some(mode));
            let json = serde_json::to_value(mode).unwrap();
            assert_eq!(json, mode.as_str());
        }
        assert_eq!(LoopMode::from_name("sideways"), None);
        assert_eq!(LoopMode::PingPong.viewer_name(), "backAndForth");
    }
}
