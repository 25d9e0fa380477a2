use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use web_time::{Duration, Instant};

use super::loop_mode::FrameStepper;
use super::timer::{IntervalTimer, TimerId};
use crate::error::Mol3dError;
use crate::params::ParamStore;
use crate::viewer::{AnimateOptions, ViewerBridge, ViewerFactory};

/// Who owns the playback loop.
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
#[serde(rename_all = "snake_case")]
pub enum PlaybackStrategy {
    /// The crate computes every next frame and seeks the viewer.
    #[default]
    HostTimer,
    /// The viewer runs its own loop; each tick polls the frame it shows.
    Native,
}

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No timer armed.
    Stopped,
    /// A timer is armed.
    Playing,
}

/// Result of one timer expiry.
#[derive(Debug)]
pub enum Step {
    /// Nothing was due.
    Idle,
    /// The callback belonged to a cancelled timer and was ignored.
    Stale,
    /// Show this frame next.
    Advance(usize),
    /// The viewer's own loop is showing this frame.
    Observed(usize),
    /// Playback cannot continue; the timer has been cancelled.
    Halt(Mol3dError),
}

/// Keeps the frame index moving while playing.
///
/// Exactly one timer is live while [`Playing`](PlaybackState::Playing).
/// Every start allocates a new [`TimerId`]; expiries carrying any other id
/// are reported as [`Step::Stale`] and change nothing.
#[derive(Debug, Default)]
pub struct AnimationSynchronizer {
    strategy: PlaybackStrategy,
    timer: Option<IntervalTimer>,
    stepper: FrameStepper,
    next_id: u64,
}

impl AnimationSynchronizer {
    /// Stopped synchronizer using `strategy`.
    #[must_use]
    pub fn new(strategy: PlaybackStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Active strategy.
    #[must_use]
    pub fn strategy(&self) -> PlaybackStrategy {
        self.strategy
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        if self.timer.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    /// Id of the live timer.
    #[must_use]
    pub fn timer_id(&self) -> Option<TimerId> {
        self.timer.as_ref().map(IntervalTimer::id)
    }

    /// Interval of the live timer.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.timer.as_ref().map(IntervalTimer::interval)
    }

    /// Forget the ping-pong direction (new structure loaded).
    pub fn reset_direction(&mut self) {
        self.stepper.reset();
    }

    /// Begin playback.
    ///
    /// Returns `None` without arming anything when there is at most one
    /// frame. Starting while already playing keeps the live timer.
    pub fn start<F: ViewerFactory>(
        &mut self,
        store: &ParamStore,
        bridge: &mut ViewerBridge<F>,
        now: Instant,
    ) -> Result<Option<TimerId>, Mol3dError> {
        if store.total_frames() <= 1 {
            log::debug!("play requested with a single frame, ignoring");
            return Ok(None);
        }
        if let Some(id) = self.timer_id() {
            return Ok(Some(id));
        }
        if self.strategy == PlaybackStrategy::Native {
            bridge.start_native(&AnimateOptions::looping(
                store.speed_ms(),
                store.loop_mode(),
            ))?;
        }
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let interval = Duration::from_millis(u64::from(store.speed_ms()));
        self.timer = Some(IntervalTimer::new(id, interval, now));
        log::debug!("playback started ({id:?}, {interval:?})");
        Ok(Some(id))
    }

    /// Cancel playback. Returns whether a timer was live.
    pub fn stop<F: ViewerFactory>(
        &mut self,
        bridge: &mut ViewerBridge<F>,
    ) -> bool {
        let Some(timer) = self.timer.take() else {
            return false;
        };
        if self.strategy == PlaybackStrategy::Native {
            if let Err(e) = bridge.stop_native() {
                log::warn!("failed to stop viewer animation: {e}");
            }
        }
        log::debug!("playback stopped ({:?})", timer.id());
        true
    }

    /// Cancel and re-arm with the store's current speed and loop mode.
    ///
    /// The frame index is untouched, so the next expiry continues from
    /// where playback was. Does nothing while stopped.
    pub fn restart<F: ViewerFactory>(
        &mut self,
        store: &ParamStore,
        bridge: &mut ViewerBridge<F>,
        now: Instant,
    ) -> Result<Option<TimerId>, Mol3dError> {
        if !self.stop(bridge) {
            return Ok(None);
        }
        self.start(store, bridge, now)
    }

    /// Id of the live timer if it is due at `now`.
    #[must_use]
    pub fn due(&self, now: Instant) -> Option<TimerId> {
        self.timer
            .as_ref()
            .filter(|timer| timer.is_due(now))
            .map(IntervalTimer::id)
    }

    /// Handle an expiry of timer `id`.
    pub fn fire<F: ViewerFactory>(
        &mut self,
        id: TimerId,
        store: &ParamStore,
        bridge: &ViewerBridge<F>,
        now: Instant,
    ) -> Step {
        let Some(timer) = self.timer.as_mut().filter(|t| t.id() == id) else {
            log::debug!("ignoring expiry of stale timer {id:?}");
            return Step::Stale;
        };
        timer.rearm(now);
        match self.strategy {
            PlaybackStrategy::HostTimer => match self.stepper.next(
                store.current_frame(),
                store.total_frames(),
                store.loop_mode(),
            ) {
                Some(next) => Step::Advance(next),
                None => {
                    self.timer = None;
                    Step::Halt(Mol3dError::invalid(format!(
                        "no frame to advance to with {} frame(s)",
                        store.total_frames()
                    )))
                }
            },
            PlaybackStrategy::Native => match bridge.viewer_frame() {
                Ok(frame) => Step::Observed(frame),
                Err(Mol3dError::ExternalViewer(msg)) => {
                    log::warn!("could not read viewer frame: {msg}");
                    Step::Idle
                }
                Err(e) => {
                    self.timer = None;
                    Step::Halt(e)
                }
            },
        }
    }

    /// Fire the live timer if it is due.
    pub fn tick<F: ViewerFactory>(
        &mut self,
        store: &ParamStore,
        bridge: &ViewerBridge<F>,
        now: Instant,
    ) -> Step {
        match self.due(now) {
            Some(id) => self.fire(id, store, bridge, now),
            None => Step::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Origin;
    use crate::viewer::{RecordingFactory, ViewerCall, ViewerConfig};

    fn setup(
        total: usize,
    ) -> (ParamStore, ViewerBridge<RecordingFactory>, RecordingFactory) {
        let mut store = ParamStore::default();
        let _ = store.set_total_frames(total, Origin::Host).unwrap();
        let factory = RecordingFactory::default();
        let mut bridge = ViewerBridge::new(factory.clone());
        let _ = bridge.initialize("v", &ViewerConfig::default()).unwrap();
        (store, bridge, factory)
    }

    #[test]
    fn single_frame_never_starts() {
        let (store, mut bridge, _) = setup(1);
        let mut sync = AnimationSynchronizer::default();
        assert_eq!(sync.start(&store, &mut bridge, Instant::now()).unwrap(), None);
        assert_eq!(sync.state(), PlaybackState::Stopped);
    }

    #[test]
    fn start_is_idempotent_while_playing() {
        let (store, mut bridge, _) = setup(3);
        let mut sync = AnimationSynchronizer::default();
        let now = Instant::now();
        let a = sync.start(&store, &mut bridge, now).unwrap();
        let b = sync.start(&store, &mut bridge, now).unwrap();
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn tick_respects_the_interval() {
        let (store, mut bridge, _) = setup(3);
        let mut sync = AnimationSynchronizer::default();
        let t0 = Instant::now();
        let _ = sync.start(&store, &mut bridge, t0).unwrap();
        assert!(matches!(
            sync.tick(&store, &bridge, t0 + Duration::from_millis(150)),
            Step::Idle
        ));
        assert!(matches!(
            sync.tick(&store, &bridge, t0 + Duration::from_millis(200)),
            Step::Advance(1)
        ));
        assert!(matches!(
            sync.tick(&store, &bridge, t0 + Duration::from_millis(300)),
            Step::Idle
        ));
    }

    #[test]
    fn restart_invalidates_the_old_timer() {
        let (mut store, mut bridge, _) = setup(3);
        let mut sync = AnimationSynchronizer::default();
        let t0 = Instant::now();
        let old = sync.start(&store, &mut bridge, t0).unwrap().unwrap();
        let _ = store.set_speed_ms(50, Origin::Host).unwrap();
        let new = sync.restart(&store, &mut bridge, t0).unwrap().unwrap();
        assert_ne!(old, new);
        assert_eq!(sync.interval(), Some(Duration::from_millis(50)));
        assert!(matches!(
            sync.fire(old, &store, &bridge, t0),
            Step::Stale
        ));
        assert!(matches!(
            sync.fire(new, &store, &bridge, t0),
            Step::Advance(1)
        ));
    }

    #[test]
    fn restart_while_stopped_does_nothing() {
        let (store, mut bridge, _) = setup(3);
        let mut sync = AnimationSynchronizer::default();
        assert_eq!(
            sync.restart(&store, &mut bridge, Instant::now()).unwrap(),
            None
        );
        assert_eq!(sync.state(), PlaybackState::Stopped);
    }

    #[test]
    fn stopped_timer_is_stale() {
        let (store, mut bridge, _) = setup(3);
        let mut sync = AnimationSynchronizer::default();
        let now = Instant::now();
        let id = sync.start(&store, &mut bridge, now).unwrap().unwrap();
        assert!(sync.stop(&mut bridge));
        assert!(!sync.stop(&mut bridge));
        assert!(matches!(sync.fire(id, &store, &bridge, now), Step::Stale));
        assert_eq!(sync.state(), PlaybackState::Stopped);
    }

    #[test]
    fn shrinking_to_one_frame_halts() {
        let (mut store, mut bridge, _) = setup(3);
        let mut sync = AnimationSynchronizer::default();
        let now = Instant::now();
        let id = sync.start(&store, &mut bridge, now).unwrap().unwrap();
        let _ = store.set_total_frames(1, Origin::Host).unwrap();
        assert!(matches!(
            sync.fire(id, &store, &bridge, now),
            Step::Halt(Mol3dError::InvalidParameter(_))
        ));
        assert_eq!(sync.state(), PlaybackState::Stopped);
    }

    #[test]
    fn native_strategy_drives_the_viewer_loop() {
        let (mut store, mut bridge, factory) = setup(4);
        let _ = store.set_speed_ms(100, Origin::Host).unwrap();
        let mut sync = AnimationSynchronizer::new(PlaybackStrategy::Native);
        let now = Instant::now();
        factory.clear_calls();
        let id = sync.start(&store, &mut bridge, now).unwrap().unwrap();
        assert!(factory.is_animating());
        assert_eq!(
            factory.calls(),
            vec![ViewerCall::Animate {
                options: serde_json::json!({
                    "loop": "forward", "reps": 0, "interval": 100
                })
            }]
        );

        factory.set_viewer_frame(2);
        assert!(matches!(
            sync.fire(id, &store, &bridge, now),
            Step::Observed(2)
        ));

        assert!(sync.stop(&mut bridge));
        assert!(!factory.is_animating());
    }

    #[test]
    fn native_strategy_needs_a_viewer() {
        let mut store = ParamStore::default();
        let _ = store.set_total_frames(4, Origin::Host).unwrap();
        let mut bridge = ViewerBridge::new(RecordingFactory::default());
        let mut sync = AnimationSynchronizer::new(PlaybackStrategy::Native);
        assert!(matches!(
            sync.start(&store, &mut bridge, Instant::now()),
            Err(Mol3dError::NotInitialized)
        ));
        assert_eq!(sync.state(), PlaybackState::Stopped);
    }
}
