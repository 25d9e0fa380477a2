//! The host-facing molecular viewer widget.
//!
//! ```
//! # use mol3d::{Mol3dViewer, RecordingFactory, FileFormat};
//! let mut widget = Mol3dViewer::builder(RecordingFactory::default())
//!     .with_surface("viewer")
//!     .build()
//!     .unwrap();
//! widget
//!     .initialize()
//!     .unwrap()
//!     .load_model("3\nWater\nO 0 0 0\nH 0.76 0.59 0\nH -0.76 0.59 0", FileFormat::Xyz)
//!     .unwrap()
//!     .show_atom_labels(true);
//! assert_eq!(widget.displayed_labels().len(), 3);
//! ```
//!
//! Every host call is one change batch: the store is updated (observers
//! fire), then the affected state is projected onto the viewer. Viewer
//! failures are logged and absorbed; only invalid input is returned.

use web_time::Instant;

use crate::animation::{
    AnimationSynchronizer, LoopMode, PlaybackState, PlaybackStrategy, Step,
    TimerId,
};
use crate::error::Mol3dError;
use crate::labels::{atom_sites, auto_labels, Label, LabelText};
use crate::options::Options;
use crate::params::{ObserverId, Origin, Param, ParamChange, ParamStore};
use crate::structure::{count_xyz_frames, join_frames, FileFormat, Structure};
use crate::style::{StyleFlags, StyleSpec};
use crate::viewer::{ViewerBridge, ViewerConfig, ViewerFactory};

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Mol3dViewer`].
pub struct Mol3dViewerBuilder<F: ViewerFactory> {
    factory: F,
    options: Options,
    structure: Option<Structure>,
}

impl<F: ViewerFactory> Mol3dViewerBuilder<F> {
    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Set the host surface the viewer attaches to.
    #[must_use]
    pub fn with_surface(mut self, surface: impl Into<String>) -> Self {
        self.options.viewer.surface = surface.into();
        self
    }

    /// Structure to show once the viewer is initialized.
    #[must_use]
    pub fn with_structure(
        mut self,
        text: impl Into<String>,
        format: FileFormat,
    ) -> Self {
        self.structure = Some(Structure::new(text, format));
        self
    }

    /// Consume the builder. Fails if the options hold an invalid playback
    /// speed.
    pub fn build(self) -> Result<Mol3dViewer<F>, Mol3dError> {
        let mut store = ParamStore::default();
        let opts = &self.options;
        let _ = store.set_background_color(
            &opts.display.background_color,
            Origin::Host,
        );
        let _ = store.set_style(
            opts.display.style_flags(),
            Some(&opts.style.template()),
            Origin::Host,
        );
        let _ = store
            .set_show_atom_labels(opts.display.show_atom_labels, Origin::Host);
        let _ = store.set_speed_ms(opts.animation.speed_ms, Origin::Host)?;
        let _ = store.set_loop_mode(opts.animation.loop_mode, Origin::Host);
        if let Some(structure) = self.structure {
            let total = frame_count(&structure.text, &structure.format);
            let _ = store.set_structure(structure, total, Origin::Host)?;
        }
        Ok(Mol3dViewer {
            sync: AnimationSynchronizer::new(self.options.animation.strategy),
            bridge: ViewerBridge::new(self.factory),
            store,
            options: self.options,
        })
    }
}

// ── Widget ───────────────────────────────────────────────────────────────

/// A molecular viewer widget: parameter store, viewer bridge and playback
/// synchronizer behind one chainable API.
pub struct Mol3dViewer<F: ViewerFactory> {
    store: ParamStore,
    bridge: ViewerBridge<F>,
    sync: AnimationSynchronizer,
    options: Options,
}

impl<F: ViewerFactory> Mol3dViewer<F> {
    /// Start a builder around `factory`.
    #[must_use]
    pub fn builder(factory: F) -> Mol3dViewerBuilder<F> {
        Mol3dViewerBuilder {
            factory,
            options: Options::default(),
            structure: None,
        }
    }

    /// Widget with default options.
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self {
            store: ParamStore::default(),
            bridge: ViewerBridge::new(factory),
            sync: AnimationSynchronizer::default(),
            options: Options::default(),
        }
    }

    /// Create the viewer handle and replay the current state onto it.
    ///
    /// A second call does nothing. Fails only if the viewer cannot be
    /// created.
    pub fn initialize(&mut self) -> Result<&mut Self, Mol3dError> {
        let config = ViewerConfig::from_options(&self.options);
        let surface = self.options.viewer.surface.clone();
        if self.bridge.initialize(&surface, &config)? {
            self.replay();
        }
        Ok(self)
    }

    fn replay(&mut self) {
        let background = self.store.background_color().to_owned();
        log_viewer("background", self.bridge.set_background(&background));
        if !self.store.structure().is_empty() {
            self.project_structure();
        }
        if self.store.current_frame() > 0 {
            self.seek_logged();
        }
    }
}

// ── Structure ────────────────────────────────────────────────────────────

impl<F: ViewerFactory> Mol3dViewer<F> {
    /// Replace the displayed structure. Concatenated XYZ frames become a
    /// trajectory; other formats are a single frame.
    pub fn load_model(
        &mut self,
        text: impl Into<String>,
        format: FileFormat,
    ) -> Result<&mut Self, Mol3dError> {
        let text = text.into();
        let total = frame_count(&text, &format);
        self.replace_structure(Structure::new(text, format), total)
    }

    /// Replace the displayed structure with one frame per entry.
    pub fn add_frames<S: AsRef<str>>(
        &mut self,
        frames: &[S],
        format: FileFormat,
    ) -> Result<&mut Self, Mol3dError> {
        if frames.is_empty() {
            return Err(Mol3dError::invalid("no frames given"));
        }
        let text = join_frames(frames);
        self.replace_structure(Structure::new(text, format), frames.len())
    }

    /// Remove the structure and every label, and stop playback.
    pub fn clear(&mut self) -> Result<&mut Self, Mol3dError> {
        let _ = self.stop_animation();
        let format = self.store.structure().format.clone();
        let mut changes = self.store.set_labels(Vec::new(), Origin::Host);
        changes.extend(self.store.set_structure(
            Structure::new(String::new(), format),
            1,
            Origin::Host,
        )?);
        self.project_logged(&changes);
        Ok(self)
    }

    /// Change the format tag of the current structure and reload it. The
    /// frame count is recomputed for the new format.
    pub fn set_file_format(
        &mut self,
        format: FileFormat,
    ) -> Result<&mut Self, Mol3dError> {
        let text = self.store.structure().text.clone();
        let total = frame_count(&text, &format);
        self.replace_structure(Structure::new(text, format), total)
    }

    fn replace_structure(
        &mut self,
        structure: Structure,
        total: usize,
    ) -> Result<&mut Self, Mol3dError> {
        let changes = self.store.set_structure(structure, total, Origin::Host)?;
        if changes.is_empty() {
            return Ok(self);
        }
        self.sync.reset_direction();
        self.project_logged(&changes);
        if self.store.is_playing() {
            if self.store.total_frames() <= 1 {
                self.halt("structure has a single frame");
            } else if self.sync.strategy() == PlaybackStrategy::Native {
                self.restart_playback();
            }
        }
        Ok(self)
    }
}

// ── Appearance ───────────────────────────────────────────────────────────

impl<F: ViewerFactory> Mol3dViewer<F> {
    /// Select representations. With every flag off, stick and sphere are
    /// shown.
    pub fn set_style(&mut self, flags: StyleFlags) -> &mut Self {
        let changes = self.store.set_style(flags, None, Origin::Host);
        self.project_logged(&changes);
        self
    }

    /// Select representations and their options from a style map such as
    /// `{"stick": {"radius": 0.2}, "sphere": {"scale": 0.3}}`.
    pub fn set_style_json(&mut self, style: &serde_json::Value) -> &mut Self {
        let spec = StyleSpec::from_json(style);
        let changes =
            self.store.set_style(spec.flags(), Some(&spec), Origin::Host);
        self.project_logged(&changes);
        self
    }

    /// Change the background color.
    pub fn set_background(&mut self, color: &str) -> &mut Self {
        let changes = self.store.set_background_color(color, Origin::Host);
        self.project_logged(&changes);
        self
    }

    /// Add a label after the existing ones.
    pub fn add_label(&mut self, label: Label) -> &mut Self {
        let mut labels = self.store.labels().to_vec();
        labels.push(label);
        let changes = self.store.set_labels(labels, Origin::Host);
        self.project_logged(&changes);
        self
    }

    /// Remove every label, including automatic atom labels.
    pub fn remove_all_labels(&mut self) -> &mut Self {
        let mut changes = self.store.set_labels(Vec::new(), Origin::Host);
        changes.extend(self.store.set_show_atom_labels(false, Origin::Host));
        self.project_logged(&changes);
        self
    }

    /// Toggle one label per atom of the first frame.
    pub fn show_atom_labels(&mut self, on: bool) -> &mut Self {
        let changes = self.store.set_show_atom_labels(on, Origin::Host);
        self.project_logged(&changes);
        self
    }

    /// Show automatic atom labels with the given text.
    pub fn auto_label(&mut self, text: LabelText) -> &mut Self {
        let text_changed = self.options.labels.text != text;
        self.options.labels.text = text;
        if self.store.show_atom_labels() {
            if text_changed {
                self.project_labels();
            }
        } else {
            let _ = self.show_atom_labels(true);
        }
        self
    }

    /// Labels currently projected onto the viewer: host labels first, then
    /// automatic atom labels.
    #[must_use]
    pub fn displayed_labels(&self) -> Vec<Label> {
        let mut labels = self.store.labels().to_vec();
        if self.store.show_atom_labels() {
            let structure = self.store.structure();
            labels.extend(auto_labels(
                atom_sites(&structure.text, &structure.format),
                self.options.labels.text,
                &self.options.labels.style,
            ));
        }
        labels
    }

    /// Redraw.
    pub fn render(&mut self) -> &mut Self {
        log_viewer("render", self.bridge.render());
        self
    }

    /// Fit the camera to the structure.
    pub fn center(&mut self) -> &mut Self {
        log_viewer("center", self.bridge.zoom_to());
        self
    }
}

// ── Frames & playback ────────────────────────────────────────────────────

impl<F: ViewerFactory> Mol3dViewer<F> {
    /// Show frame `frame`.
    pub fn set_frame(&mut self, frame: usize) -> Result<&mut Self, Mol3dError> {
        let changes = self.store.set_current_frame(frame, Origin::Host)?;
        self.project_logged(&changes);
        Ok(self)
    }

    /// Displayed frame index.
    #[must_use]
    pub fn current_frame(&self) -> usize {
        self.store.current_frame()
    }

    /// Number of frames.
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.store.total_frames()
    }

    /// Show the first frame.
    pub fn first_frame(&mut self) -> &mut Self {
        self.seek_host(0)
    }

    /// Show the last frame.
    pub fn last_frame(&mut self) -> &mut Self {
        let last = self.store.total_frames() - 1;
        self.seek_host(last)
    }

    /// Show the next frame; stays on the last one.
    pub fn step_forward(&mut self) -> &mut Self {
        let next = (self.store.current_frame() + 1)
            .min(self.store.total_frames() - 1);
        self.seek_host(next)
    }

    /// Show the previous frame; stays on the first one.
    pub fn step_backward(&mut self) -> &mut Self {
        let prev = self.store.current_frame().saturating_sub(1);
        self.seek_host(prev)
    }

    /// Stop playback and return to the first frame.
    pub fn reset_animation(&mut self) -> &mut Self {
        self.sync.reset_direction();
        self.stop_animation().first_frame()
    }

    /// Seek to an index already known to be in range.
    fn seek_host(&mut self, frame: usize) -> &mut Self {
        match self.store.set_current_frame(frame, Origin::Host) {
            Ok(changes) => self.project_logged(&changes),
            Err(e) => log::warn!("cannot show frame {frame}: {e}"),
        }
        self
    }

    /// Start playback. Does nothing with a single frame.
    pub fn start_animation(&mut self) -> &mut Self {
        match self.sync.start(&self.store, &mut self.bridge, Instant::now()) {
            Ok(Some(_)) => {
                let _ = self.store.set_playing(true, Origin::Host);
            }
            Ok(None) => {}
            Err(e) => log::warn!("cannot start playback: {e}"),
        }
        self
    }

    /// Stop playback, keeping the current frame.
    pub fn stop_animation(&mut self) -> &mut Self {
        let _ = self.sync.stop(&mut self.bridge);
        let _ = self.store.set_playing(false, Origin::Host);
        self
    }

    /// Whether playback is running.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.store.is_playing()
    }

    /// Change the playback interval. A running timer is restarted at the
    /// new speed without repeating or skipping a frame.
    pub fn set_animation_speed(
        &mut self,
        speed_ms: u32,
    ) -> Result<&mut Self, Mol3dError> {
        let changes = self.store.set_speed_ms(speed_ms, Origin::Host)?;
        if !changes.is_empty() {
            self.restart_playback();
        }
        Ok(self)
    }

    /// Change the loop mode.
    pub fn set_loop_mode(&mut self, mode: LoopMode) -> &mut Self {
        let changes = self.store.set_loop_mode(mode, Origin::Host);
        // The viewer's own loop captured the old mode at start.
        if !changes.is_empty()
            && self.sync.strategy() == PlaybackStrategy::Native
        {
            self.restart_playback();
        }
        self
    }

    /// Playback state.
    #[must_use]
    pub fn playback_state(&self) -> PlaybackState {
        self.sync.state()
    }

    /// Id of the live playback timer.
    #[must_use]
    pub fn timer_id(&self) -> Option<TimerId> {
        self.sync.timer_id()
    }

    /// Advance playback if its interval has elapsed at `now`.
    pub fn tick(&mut self, now: Instant) -> &mut Self {
        let step = self.sync.tick(&self.store, &self.bridge, now);
        self.apply_step(step);
        self
    }

    /// Handle an expiry of timer `id` from a host-owned interval. Stale ids
    /// are ignored.
    pub fn fire_timer(&mut self, id: TimerId) -> &mut Self {
        let step = self.sync.fire(id, &self.store, &self.bridge, Instant::now());
        self.apply_step(step);
        self
    }

    /// Record that the viewer is showing `frame`. The viewer is not asked
    /// to seek again.
    pub fn report_viewer_frame(
        &mut self,
        frame: usize,
    ) -> Result<&mut Self, Mol3dError> {
        let changes = self.store.set_current_frame(frame, Origin::Viewer)?;
        self.project_logged(&changes);
        Ok(self)
    }

    /// Read the viewer's frame and record it as
    /// [`report_viewer_frame`](Self::report_viewer_frame) does.
    pub fn poll_viewer_frame(&mut self) -> &mut Self {
        match self.bridge.viewer_frame() {
            Ok(frame) => {
                if let Err(e) = self.report_viewer_frame(frame) {
                    log::warn!("viewer reported an unusable frame: {e}");
                }
            }
            Err(e) => log::debug!("cannot read viewer frame: {e}"),
        }
        self
    }

    fn apply_step(&mut self, step: Step) {
        match step {
            Step::Idle | Step::Stale => {}
            Step::Advance(frame) => {
                let result = self
                    .store
                    .set_current_frame(frame, Origin::Playback)
                    .and_then(|changes| self.project(&changes));
                match result {
                    Ok(()) => {}
                    Err(Mol3dError::ExternalViewer(msg)) => {
                        log::warn!("seek to frame {frame} failed: {msg}");
                    }
                    Err(e) => self.halt(&e.to_string()),
                }
            }
            Step::Observed(frame) => {
                if let Err(e) = self.report_viewer_frame(frame) {
                    log::warn!("viewer reported an unusable frame: {e}");
                }
            }
            Step::Halt(e) => self.halt(&e.to_string()),
        }
    }

    fn halt(&mut self, reason: &str) {
        log::warn!("playback halted: {reason}");
        let _ = self.sync.stop(&mut self.bridge);
        let _ = self.store.set_playing(false, Origin::Playback);
    }

    fn restart_playback(&mut self) {
        match self.sync.restart(&self.store, &mut self.bridge, Instant::now())
        {
            Ok(_) => {}
            Err(e) => self.halt(&e.to_string()),
        }
    }
}

// ── Observation & access ─────────────────────────────────────────────────

impl<F: ViewerFactory> Mol3dViewer<F> {
    /// Register an observer called after every effective change.
    pub fn observe(
        &mut self,
        observer: impl FnMut(&ParamChange, &ParamStore) + 'static,
    ) -> ObserverId {
        self.store.observe(observer)
    }

    /// Remove an observer.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        self.store.unobserve(id)
    }

    /// Read-only view of every parameter.
    #[must_use]
    pub fn params(&self) -> &ParamStore {
        &self.store
    }

    /// Options the widget was built with.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The viewer bridge.
    #[must_use]
    pub fn bridge(&self) -> &ViewerBridge<F> {
        &self.bridge
    }
}

// ── Projection ───────────────────────────────────────────────────────────

/// Which parts of the viewer a change batch touches.
#[derive(Debug, Default)]
struct Projection {
    structure: bool,
    style: bool,
    labels: bool,
    background: bool,
    seek: bool,
}

impl Projection {
    fn from_changes(changes: &[ParamChange]) -> Self {
        let mut plan = Self::default();
        for change in changes {
            match change.param {
                Param::Structure | Param::FileFormat => plan.structure = true,
                Param::Style => plan.style = true,
                Param::Labels | Param::ShowAtomLabels => plan.labels = true,
                Param::BackgroundColor => plan.background = true,
                // A frame the viewer reported is already on screen.
                Param::CurrentFrame => {
                    plan.seek |= change.origin != Origin::Viewer;
                }
                Param::TotalFrames
                | Param::Playing
                | Param::SpeedMs
                | Param::LoopMode => {}
            }
        }
        plan
    }
}

impl<F: ViewerFactory> Mol3dViewer<F> {
    /// Project a change batch. Only a failed seek is returned; everything
    /// else is logged.
    fn project(&mut self, changes: &[ParamChange]) -> Result<(), Mol3dError> {
        let mut plan = Projection::from_changes(changes);
        if plan.structure {
            self.project_structure();
            // Loading shows frame 0; style and labels were re-applied.
            plan.seek = self.store.total_frames() > 1
                && self.store.current_frame() > 0;
            plan.style = false;
            plan.labels = false;
        }
        if plan.style {
            let style = self.store.active_style();
            log_viewer("style", self.bridge.apply_style(&style));
        }
        if plan.labels {
            self.project_labels();
        }
        if plan.background {
            let color = self.store.background_color().to_owned();
            log_viewer("background", self.bridge.set_background(&color));
        }
        if plan.seek {
            return self.seek();
        }
        Ok(())
    }

    fn project_logged(&mut self, changes: &[ParamChange]) {
        if let Err(e) = self.project(changes) {
            match e {
                Mol3dError::NotInitialized => {
                    log::debug!("seek deferred until the viewer exists");
                }
                e => log::warn!("seek failed: {e}"),
            }
        }
    }

    fn project_structure(&mut self) {
        let total = self.store.total_frames();
        log_viewer(
            "load",
            self.bridge.load_structure(self.store.structure(), total),
        );
        if !self.store.structure().is_empty() {
            let style = self.store.active_style();
            log_viewer("style", self.bridge.apply_style(&style));
        }
        // Loading cleared the viewer's labels.
        if self.store.show_atom_labels() || !self.store.labels().is_empty() {
            self.project_labels();
        }
    }

    fn project_labels(&mut self) {
        let labels = self.displayed_labels();
        log_viewer("labels", self.bridge.apply_labels(&labels));
    }

    fn seek(&mut self) -> Result<(), Mol3dError> {
        self.bridge
            .jump_to_frame(self.store.current_frame(), self.store.total_frames())
    }

    fn seek_logged(&mut self) {
        self.project_logged(&[ParamChange {
            param: Param::CurrentFrame,
            origin: Origin::Host,
        }]);
    }
}

fn log_viewer(what: &str, result: Result<(), Mol3dError>) {
    if let Err(e) = result {
        log::warn!("{what}: {e}");
    }
}

/// Frames in `text`: concatenated XYZ frames are counted, anything else is
/// one frame.
fn frame_count(text: &str, format: &FileFormat) -> usize {
    if format.supports_concatenated_frames() {
        count_xyz_frames(text).max(1)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec3;
    use serde_json::json;
    use web_time::Duration;

    use super::*;
    use crate::viewer::{RecordingFactory, ViewerCall};

    const WATER: &str = "3\nWater\nO 0.000 0.000 0.000\n\
                         H 0.757 0.586 0.000\nH -0.757 0.586 0.000\n";

    fn trajectory(frames: usize) -> String {
        let frames: Vec<String> = (0..frames)
            .map(|i| format!("1\nframe {i}\nC {i}.0 0.0 0.0"))
            .collect();
        join_frames(&frames)
    }

    fn widget(frames: usize) -> (Mol3dViewer<RecordingFactory>, RecordingFactory) {
        let factory = RecordingFactory::default();
        let mut w = Mol3dViewer::new(factory.clone());
        let _ = w
            .initialize()
            .unwrap()
            .load_model(trajectory(frames), FileFormat::Xyz)
            .unwrap();
        factory.clear_calls();
        (w, factory)
    }

    /// Fire the live timer `n` times, returning the frames shown.
    fn fire_n(w: &mut Mol3dViewer<RecordingFactory>, n: usize) -> Vec<usize> {
        (0..n)
            .map(|_| {
                let id = w.timer_id().unwrap();
                w.fire_timer(id).current_frame()
            })
            .collect()
    }

    #[test]
    fn xyz_trajectory_sets_frame_count() {
        let (w, _) = widget(5);
        assert_eq!(w.total_frames(), 5);
        assert_eq!(w.current_frame(), 0);
    }

    #[test]
    fn forward_playback_wraps() {
        let (mut w, factory) = widget(5);
        let _ = w.set_frame(4).unwrap().start_animation();
        assert_eq!(fire_n(&mut w, 2), [0, 1]);
        assert_eq!(factory.frames_shown(), [4, 0, 1]);
    }

    #[test]
    fn backward_playback_wraps() {
        let (mut w, _) = widget(3);
        let _ = w.set_loop_mode(LoopMode::Backward).start_animation();
        assert_eq!(fire_n(&mut w, 4), [2, 1, 0, 2]);
    }

    #[test]
    fn pingpong_playback_bounces() {
        let (mut w, factory) = widget(4);
        let _ = w.set_loop_mode(LoopMode::PingPong).start_animation();
        assert_eq!(fire_n(&mut w, 7), [1, 2, 3, 2, 1, 0, 1]);
        assert_eq!(factory.frames_shown(), [1, 2, 3, 2, 1, 0, 1]);
    }

    #[test]
    fn single_frame_play_is_a_no_op() {
        let factory = RecordingFactory::default();
        let mut w = Mol3dViewer::new(factory.clone());
        let _ = w
            .initialize()
            .unwrap()
            .load_model(WATER, FileFormat::Xyz)
            .unwrap()
            .start_animation();
        assert!(!w.is_playing());
        assert_eq!(w.playback_state(), PlaybackState::Stopped);
        assert_eq!(w.timer_id(), None);
    }

    #[test]
    fn shrinking_trajectory_resets_frame_to_zero() {
        let (mut w, factory) = widget(5);
        let _ = w.set_frame(4).unwrap();
        let _ = w.load_model(trajectory(3), FileFormat::Xyz).unwrap();
        assert_eq!(w.current_frame(), 0);
        assert_eq!(w.total_frames(), 3);
        // Loading already shows frame 0.
        assert_eq!(factory.frames_shown(), [4]);
    }

    #[test]
    fn growing_trajectory_keeps_frame() {
        let (mut w, factory) = widget(3);
        let _ = w.set_frame(2).unwrap();
        factory.clear_calls();
        let _ = w.load_model(trajectory(6), FileFormat::Xyz).unwrap();
        assert_eq!(w.current_frame(), 2);
        assert_eq!(factory.frames_shown(), [2]);
    }

    #[test]
    fn out_of_range_frame_is_rejected() {
        let (mut w, factory) = widget(3);
        assert!(matches!(
            w.set_frame(3),
            Err(Mol3dError::InvalidParameter(_))
        ));
        assert_eq!(w.current_frame(), 0);
        assert!(factory.calls().is_empty());
    }

    #[test]
    fn viewer_reported_frames_are_not_echoed() {
        let (mut w, factory) = widget(5);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _ = w.observe(move |change, store| {
            sink.borrow_mut().push((change.origin, store.current_frame()));
        });
        let _ = w.report_viewer_frame(3).unwrap();
        assert_eq!(w.current_frame(), 3);
        assert!(factory.frames_shown().is_empty());
        assert_eq!(*seen.borrow(), [(Origin::Viewer, 3)]);
    }

    #[test]
    fn host_frames_are_seeked() {
        let (mut w, factory) = widget(5);
        let _ = w.set_frame(2).unwrap();
        assert_eq!(
            factory.calls(),
            [ViewerCall::SetFrame { index: 2 }, ViewerCall::Render]
        );
    }

    #[test]
    fn speed_change_restarts_without_skipping() {
        let (mut w, factory) = widget(5);
        let _ = w.start_animation();
        assert_eq!(fire_n(&mut w, 2), [1, 2]);
        let old = w.timer_id().unwrap();

        factory.clear_calls();
        let _ = w.set_animation_speed(50).unwrap();
        let new = w.timer_id().unwrap();
        assert_ne!(old, new);
        assert!(w.is_playing());
        assert_eq!(w.current_frame(), 2);
        assert!(factory.calls().is_empty());

        // The cancelled timer no longer advances anything.
        let _ = w.fire_timer(old);
        assert_eq!(w.current_frame(), 2);

        assert_eq!(fire_n(&mut w, 1), [3]);
        assert_eq!(factory.frames_shown(), [3]);
    }

    #[test]
    fn invalid_speed_is_rejected_while_playing() {
        let (mut w, _) = widget(5);
        let id = w.start_animation().timer_id();
        assert!(w.set_animation_speed(0).is_err());
        assert_eq!(w.timer_id(), id);
        assert_eq!(w.params().speed_ms(), 200);
    }

    #[test]
    fn stop_then_start_resumes() {
        let (mut w, _) = widget(5);
        let _ = w.start_animation();
        assert_eq!(fire_n(&mut w, 3), [1, 2, 3]);
        let old = w.timer_id().unwrap();
        let _ = w.stop_animation();
        assert!(!w.is_playing());
        let _ = w.fire_timer(old);
        assert_eq!(w.current_frame(), 3);

        let _ = w.start_animation();
        assert_eq!(fire_n(&mut w, 2), [4, 0]);
    }

    #[test]
    fn tick_advances_on_the_interval() {
        let (mut w, _) = widget(3);
        let t0 = Instant::now();
        let _ = w.set_animation_speed(100).unwrap().start_animation();
        let _ = w.tick(t0 + Duration::from_millis(10));
        assert_eq!(w.current_frame(), 0);
        let _ = w.tick(t0 + Duration::from_millis(400));
        assert_eq!(w.current_frame(), 1);
    }

    #[test]
    fn failed_seeks_do_not_stop_playback() {
        let (mut w, factory) = widget(3);
        factory.fail_seeks(true);
        let _ = w.start_animation();
        assert_eq!(fire_n(&mut w, 2), [1, 2]);
        assert!(w.is_playing());
        // Each failed seek still renders.
        let renders = factory
            .calls()
            .iter()
            .filter(|c| **c == ViewerCall::Render)
            .count();
        assert_eq!(renders, 2);
    }

    #[test]
    fn playback_without_viewer_halts() {
        let mut w = Mol3dViewer::new(RecordingFactory::default());
        let _ = w.load_model(trajectory(3), FileFormat::Xyz).unwrap();
        let _ = w.start_animation();
        assert!(w.is_playing());
        let id = w.timer_id().unwrap();
        let _ = w.fire_timer(id);
        assert!(!w.is_playing());
        assert_eq!(w.playback_state(), PlaybackState::Stopped);
    }

    #[test]
    fn loading_a_single_frame_stops_playback() {
        let (mut w, _) = widget(4);
        let _ = w.start_animation();
        let _ = w.load_model(WATER, FileFormat::Xyz).unwrap();
        assert!(!w.is_playing());
        assert_eq!(w.timer_id(), None);
    }

    #[test]
    fn water_atom_labels() {
        let factory = RecordingFactory::default();
        let mut w = Mol3dViewer::new(factory.clone());
        let _ = w
            .initialize()
            .unwrap()
            .load_model(WATER, FileFormat::Xyz)
            .unwrap();
        factory.clear_calls();
        let _ = w.show_atom_labels(true);

        let labels = w.displayed_labels();
        let texts: Vec<_> = labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["1", "2", "3"]);
        assert_eq!(labels[1].position, Vec3::new(0.757, 0.586, 0.0));
        assert_eq!(
            factory.calls(),
            [
                ViewerCall::RemoveAllLabels,
                ViewerCall::AddLabel { text: "1".into() },
                ViewerCall::AddLabel { text: "2".into() },
                ViewerCall::AddLabel { text: "3".into() },
                ViewerCall::Render,
            ]
        );

        let _ = w.auto_label(LabelText::ElementIndex);
        let texts: Vec<_> =
            w.displayed_labels().into_iter().map(|l| l.text).collect();
        assert_eq!(texts, ["O1", "H2", "H3"]);
    }

    #[test]
    fn host_labels_precede_atom_labels() {
        let (mut w, _) = widget(1);
        let _ = w
            .add_label(Label::new("origin", Vec3::ZERO))
            .show_atom_labels(true);
        let labels = w.displayed_labels();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].text, "origin");
        let _ = w.remove_all_labels();
        assert!(w.displayed_labels().is_empty());
    }

    #[test]
    fn equal_values_are_silent() {
        let (mut w, factory) = widget(3);
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let _ = w.observe(move |_, _| *sink.borrow_mut() += 1);
        let _ = w
            .set_background("white")
            .set_style(StyleFlags::default())
            .show_atom_labels(false)
            .set_loop_mode(LoopMode::Forward)
            .set_frame(0)
            .unwrap();
        assert_eq!(*count.borrow(), 0);
        assert!(factory.calls().is_empty());
    }

    #[test]
    fn empty_style_falls_back_to_stick_and_sphere() {
        let (mut w, factory) = widget(1);
        let _ = w.set_style(StyleFlags::none());
        let expected = json!({"stick": {"radius": 0.15}, "sphere": {"radius": 0.3}});
        assert_eq!(w.params().active_style().to_json(), expected);
        let _ = w.set_style_json(&json!({"cartoon": {"color": "spectrum"}}));
        assert_eq!(
            factory.calls().last(),
            Some(&ViewerCall::Render)
        );
        assert!(factory.calls().contains(&ViewerCall::SetStyle {
            style: json!({"cartoon": {"color": "spectrum"}})
        }));
    }

    #[test]
    fn state_set_before_initialize_is_replayed() {
        let factory = RecordingFactory::default();
        let mut w = Mol3dViewer::builder(factory.clone())
            .with_surface("panel-1")
            .with_structure(trajectory(4), FileFormat::Xyz)
            .build()
            .unwrap();
        let _ = w.set_background("black").set_frame(2).unwrap();
        assert!(factory.calls().is_empty());

        let _ = w.initialize().unwrap();
        let calls = factory.calls();
        assert_eq!(
            calls[0],
            ViewerCall::Create {
                surface: "panel-1".into(),
                background_color: "white".into()
            }
        );
        assert!(calls.contains(&ViewerCall::SetBackgroundColor {
            color: "black".into()
        }));
        assert_eq!(factory.frames_shown(), [2]);

        let _ = w.initialize().unwrap();
        assert_eq!(factory.created(), 1);
    }

    #[test]
    fn builder_rejects_invalid_speed() {
        let mut options = Options::default();
        options.animation.speed_ms = 5;
        assert!(Mol3dViewer::builder(RecordingFactory::default())
            .with_options(options)
            .build()
            .is_err());
    }

    #[test]
    fn pdb_frames_degrade_to_first_frame() {
        let factory = RecordingFactory::default();
        let mut w = Mol3dViewer::new(factory.clone());
        let _ = w
            .initialize()
            .unwrap()
            .add_frames(&["MODEL 1", "MODEL 2"], FileFormat::Pdb)
            .unwrap();
        assert_eq!(w.total_frames(), 2);
        assert!(factory
            .calls()
            .iter()
            .any(|c| matches!(c, ViewerCall::AddModel { format, .. } if format == "pdb")));
    }

    #[test]
    fn clear_removes_structure_and_stops() {
        let (mut w, factory) = widget(3);
        let _ = w.start_animation().clear().unwrap();
        assert!(!w.is_playing());
        assert!(w.params().structure().is_empty());
        assert_eq!(w.total_frames(), 1);
        assert!(factory.calls().contains(&ViewerCall::Clear));
    }

    #[test]
    fn native_strategy_reports_viewer_frames() {
        let factory = RecordingFactory::default();
        let mut options = Options::default();
        options.animation.strategy = PlaybackStrategy::Native;
        let mut w = Mol3dViewer::builder(factory.clone())
            .with_options(options)
            .with_structure(trajectory(4), FileFormat::Xyz)
            .build()
            .unwrap();
        let _ = w.initialize().unwrap().start_animation();
        assert!(factory.is_animating());

        factory.clear_calls();
        factory.set_viewer_frame(3);
        let _ = fire_n(&mut w, 1);
        assert_eq!(w.current_frame(), 3);
        // The viewer moved on its own; nothing is seeked back.
        assert!(factory.frames_shown().is_empty());

        let _ = w.set_loop_mode(LoopMode::PingPong);
        assert!(factory.calls().contains(&ViewerCall::StopAnimate));
        assert!(factory.is_animating());

        let _ = w.stop_animation();
        assert!(!factory.is_animating());
    }

    #[test]
    fn format_change_recounts_frames() {
        let factory = RecordingFactory::default();
        let mut w = Mol3dViewer::new(factory.clone());
        let _ = w
            .initialize()
            .unwrap()
            .load_model(trajectory(4), FileFormat::from("txt"))
            .unwrap();
        assert_eq!(w.total_frames(), 1);

        factory.clear_calls();
        let _ = w.set_file_format(FileFormat::Xyz).unwrap().start_animation();
        assert_eq!(w.total_frames(), 4);
        assert!(w.is_playing());
        assert!(factory
            .calls()
            .iter()
            .any(|c| matches!(c, ViewerCall::AddModelsAsFrames { .. })));
    }

    #[test]
    fn format_change_away_from_xyz_collapses_frames() {
        let (mut w, _) = widget(4);
        let _ = w.set_frame(3).unwrap().start_animation();
        let _ = w.set_file_format(FileFormat::Pdb).unwrap();
        assert_eq!(w.total_frames(), 1);
        assert_eq!(w.current_frame(), 0);
        assert!(!w.is_playing());
    }

    #[test]
    fn stepping_stops_at_both_ends() {
        let (mut w, factory) = widget(3);
        let _ = w.step_backward();
        assert_eq!(w.current_frame(), 0);
        let _ = w.step_forward().step_forward();
        assert_eq!(w.current_frame(), 2);
        let _ = w.step_forward();
        assert_eq!(w.current_frame(), 2);
        let _ = w.step_backward();
        assert_eq!(w.current_frame(), 1);
        assert_eq!(factory.frames_shown(), [1, 2, 1]);
    }

    #[test]
    fn first_and_last_frame() {
        let (mut w, factory) = widget(5);
        let _ = w.last_frame();
        assert_eq!(w.current_frame(), 4);
        let _ = w.first_frame();
        assert_eq!(w.current_frame(), 0);
        assert_eq!(factory.frames_shown(), [4, 0]);
    }

    #[test]
    fn navigation_on_a_single_frame_stays_put() {
        let (mut w, factory) = widget(1);
        let _ = w.step_forward().last_frame().step_backward().first_frame();
        assert_eq!(w.current_frame(), 0);
        assert!(factory.frames_shown().is_empty());
    }

    #[test]
    fn reset_stops_and_rewinds() {
        let (mut w, _) = widget(4);
        let _ = w.set_loop_mode(LoopMode::PingPong).start_animation();
        assert_eq!(fire_n(&mut w, 2), [1, 2]);
        let _ = w.reset_animation();
        assert!(!w.is_playing());
        assert_eq!(w.current_frame(), 0);
        let _ = w.start_animation();
        assert_eq!(fire_n(&mut w, 1), [1]);
    }

    #[test]
    fn shared_widget_is_readable_after_deferred_delivery() {
        let shared = Rc::new(RefCell::new(Mol3dViewer::new(
            RecordingFactory::default(),
        )));
        let queue = crate::params::ChangeQueue::new();
        {
            let mut w = shared.borrow_mut();
            let _ = w.observe(queue.recorder());
            let _ = w.load_model(trajectory(3), FileFormat::Xyz).unwrap();
            let _ = w.set_frame(2).unwrap();
        }
        let seen: Vec<_> = queue
            .drain()
            .into_iter()
            .filter(|(change, _)| change.param == Param::CurrentFrame)
            .map(|(_, value)| (value, shared.borrow().current_frame()))
            .collect();
        assert_eq!(seen, [(json!(2), 2)]);
    }
}
