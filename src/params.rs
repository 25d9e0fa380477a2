//! Parameter store: the widget's observable fields.
//!
//! Every setter compares against the current value and returns the list of
//! [`ParamChange`]s it produced. An equal value produces nothing and
//! notifies no one; a new value notifies every registered observer, in
//! registration order, before the setter returns. Each change carries the
//! [`Origin`] of the batch that caused it so downstream projections can
//! refuse to echo a value back to where it came from.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::{json, Value};

use crate::animation::LoopMode;
use crate::error::Mol3dError;
use crate::labels::Label;
use crate::structure::Structure;
use crate::style::{StyleFlags, StyleSpec};

/// Slowest accepted playback interval.
pub const MAX_SPEED_MS: u32 = 10_000;
/// Fastest accepted playback interval.
pub const MIN_SPEED_MS: u32 = 10;

/// Identifies one observable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Param {
    /// Structure text.
    Structure,
    /// Structure format tag.
    FileFormat,
    /// Background color.
    BackgroundColor,
    /// Representation flags or their option records.
    Style,
    /// Host-added labels.
    Labels,
    /// Automatic atom-label toggle.
    ShowAtomLabels,
    /// Displayed frame index.
    CurrentFrame,
    /// Number of frames in the structure.
    TotalFrames,
    /// Playback flag.
    Playing,
    /// Playback interval.
    SpeedMs,
    /// Playback loop mode.
    LoopMode,
}

impl Param {
    /// Host-facing field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::FileFormat => "filetype",
            Self::BackgroundColor => "background_color",
            Self::Style => "style",
            Self::Labels => "labels",
            Self::ShowAtomLabels => "show_atom_labels",
            Self::CurrentFrame => "current_frame",
            Self::TotalFrames => "total_frames",
            Self::Playing => "playing",
            Self::SpeedMs => "speed_ms",
            Self::LoopMode => "loop_mode",
        }
    }
}

/// Where a change batch originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A host-side call (dashboard control, script).
    Host,
    /// The playback loop advancing the frame.
    Playback,
    /// A value reported back by the external viewer.
    Viewer,
}

/// One field changed to a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamChange {
    /// The field that changed.
    pub param: Param,
    /// Origin of the batch.
    pub origin: Origin,
}

/// Registration token returned by [`ParamStore::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&ParamChange, &ParamStore)>;

/// The widget's fields plus their observers.
pub struct ParamStore {
    structure: Structure,
    background_color: String,
    style_flags: StyleFlags,
    style_template: StyleSpec,
    labels: Vec<Label>,
    show_atom_labels: bool,
    current_frame: usize,
    total_frames: usize,
    playing: bool,
    speed_ms: u32,
    loop_mode: LoopMode,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl fmt::Debug for ParamStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamStore")
            .field("format", &self.structure.format)
            .field("structure_len", &self.structure.text.len())
            .field("background_color", &self.background_color)
            .field("style_flags", &self.style_flags)
            .field("labels", &self.labels.len())
            .field("show_atom_labels", &self.show_atom_labels)
            .field("current_frame", &self.current_frame)
            .field("total_frames", &self.total_frames)
            .field("playing", &self.playing)
            .field("speed_ms", &self.speed_ms)
            .field("loop_mode", &self.loop_mode)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self {
            structure: Structure::default(),
            background_color: "white".into(),
            style_flags: StyleFlags::default(),
            style_template: StyleSpec::new(),
            labels: Vec::new(),
            show_atom_labels: false,
            current_frame: 0,
            total_frames: 1,
            playing: false,
            speed_ms: 200,
            loop_mode: LoopMode::Forward,
            observers: Vec::new(),
            next_observer: 0,
        }
    }
}

// ── Observers ────────────────────────────────────────────────────────────

impl ParamStore {
    /// Register an observer called after every effective change.
    pub fn observe(
        &mut self,
        observer: impl FnMut(&ParamChange, &Self) + 'static,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    /// Notify observers of `changes` and hand them back.
    fn notify(&mut self, changes: Vec<ParamChange>) -> Vec<ParamChange> {
        if changes.is_empty() || self.observers.is_empty() {
            return changes;
        }
        let mut observers = std::mem::take(&mut self.observers);
        for change in &changes {
            for (_, observer) in &mut observers {
                observer(change, self);
            }
        }
        // Observers registered during notification cannot exist (they
        // would need `&mut self`), so a plain swap back is enough.
        self.observers = observers;
        changes
    }
}

// ── Accessors ────────────────────────────────────────────────────────────

impl ParamStore {
    /// Loaded structure.
    #[must_use]
    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    /// Background color.
    #[must_use]
    pub fn background_color(&self) -> &str {
        &self.background_color
    }

    /// Representation toggles as set (before the fallback rule).
    #[must_use]
    pub fn style_flags(&self) -> StyleFlags {
        self.style_flags
    }

    /// Style to apply: active kinds resolved against the option records.
    #[must_use]
    pub fn active_style(&self) -> StyleSpec {
        StyleSpec::resolve(&self.style_flags, &self.style_template)
    }

    /// Host-added labels in insertion order.
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Whether automatic atom labels are shown.
    #[must_use]
    pub fn show_atom_labels(&self) -> bool {
        self.show_atom_labels
    }

    /// Displayed frame index, always `< total_frames`.
    #[must_use]
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Number of frames, at least 1.
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Whether playback is running.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Playback interval in milliseconds.
    #[must_use]
    pub fn speed_ms(&self) -> u32 {
        self.speed_ms
    }

    /// Playback loop mode.
    #[must_use]
    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    /// Current value of `param` as JSON, in the shape hosts receive it.
    #[must_use]
    pub fn value_json(&self, param: Param) -> Value {
        match param {
            Param::Structure => json!(self.structure.text),
            Param::FileFormat => json!(self.structure.format.as_str()),
            Param::BackgroundColor => json!(self.background_color),
            Param::Style => self.active_style().to_json(),
            Param::Labels => self
                .labels
                .iter()
                .map(|label| {
                    json!({"text": label.text, "position": label.position})
                })
                .collect(),
            Param::ShowAtomLabels => json!(self.show_atom_labels),
            Param::CurrentFrame => json!(self.current_frame),
            Param::TotalFrames => json!(self.total_frames),
            Param::Playing => json!(self.playing),
            Param::SpeedMs => json!(self.speed_ms),
            Param::LoopMode => json!(self.loop_mode.as_str()),
        }
    }
}

// ── Setters ──────────────────────────────────────────────────────────────

impl ParamStore {
    /// Replace the structure and its frame count in one batch.
    ///
    /// An out-of-range current frame is reset to 0.
    pub(crate) fn set_structure(
        &mut self,
        structure: Structure,
        total_frames: usize,
        origin: Origin,
    ) -> Result<Vec<ParamChange>, Mol3dError> {
        validate_total_frames(total_frames)?;
        let mut changes = Vec::new();
        if structure.text != self.structure.text {
            self.structure.text = structure.text;
            changes.push(ParamChange {
                param: Param::Structure,
                origin,
            });
        }
        if structure.format != self.structure.format {
            self.structure.format = structure.format;
            changes.push(ParamChange {
                param: Param::FileFormat,
                origin,
            });
        }
        self.apply_total_frames(total_frames, origin, &mut changes);
        Ok(self.notify(changes))
    }

    /// Change the frame count; an out-of-range current frame resets to 0.
    pub(crate) fn set_total_frames(
        &mut self,
        total_frames: usize,
        origin: Origin,
    ) -> Result<Vec<ParamChange>, Mol3dError> {
        validate_total_frames(total_frames)?;
        let mut changes = Vec::new();
        self.apply_total_frames(total_frames, origin, &mut changes);
        Ok(self.notify(changes))
    }

    fn apply_total_frames(
        &mut self,
        total_frames: usize,
        origin: Origin,
        changes: &mut Vec<ParamChange>,
    ) {
        if total_frames == self.total_frames {
            return;
        }
        self.total_frames = total_frames;
        changes.push(ParamChange {
            param: Param::TotalFrames,
            origin,
        });
        if self.current_frame >= total_frames {
            self.current_frame = 0;
            changes.push(ParamChange {
                param: Param::CurrentFrame,
                origin,
            });
        }
    }

    /// Set the displayed frame; must be `< total_frames`.
    pub(crate) fn set_current_frame(
        &mut self,
        frame: usize,
        origin: Origin,
    ) -> Result<Vec<ParamChange>, Mol3dError> {
        if frame >= self.total_frames {
            return Err(Mol3dError::invalid(format!(
                "frame {frame} outside [0, {})",
                self.total_frames
            )));
        }
        if frame == self.current_frame {
            return Ok(Vec::new());
        }
        self.current_frame = frame;
        Ok(self.notify(vec![ParamChange {
            param: Param::CurrentFrame,
            origin,
        }]))
    }

    /// Set the background color.
    pub(crate) fn set_background_color(
        &mut self,
        color: &str,
        origin: Origin,
    ) -> Vec<ParamChange> {
        if color == self.background_color {
            return Vec::new();
        }
        color.clone_into(&mut self.background_color);
        self.notify(vec![ParamChange {
            param: Param::BackgroundColor,
            origin,
        }])
    }

    /// Set the representation flags and, optionally, new option records
    /// for the kinds present in `records`.
    pub(crate) fn set_style(
        &mut self,
        flags: StyleFlags,
        records: Option<&StyleSpec>,
        origin: Origin,
    ) -> Vec<ParamChange> {
        let mut template = self.style_template.clone();
        if let Some(records) = records {
            for rep in records.iter() {
                template.insert(rep.clone());
            }
        }
        if flags == self.style_flags && template == self.style_template {
            return Vec::new();
        }
        self.style_flags = flags;
        self.style_template = template;
        self.notify(vec![ParamChange {
            param: Param::Style,
            origin,
        }])
    }

    /// Replace the host-added labels.
    pub(crate) fn set_labels(
        &mut self,
        labels: Vec<Label>,
        origin: Origin,
    ) -> Vec<ParamChange> {
        if labels == self.labels {
            return Vec::new();
        }
        self.labels = labels;
        self.notify(vec![ParamChange {
            param: Param::Labels,
            origin,
        }])
    }

    /// Toggle automatic atom labels.
    pub(crate) fn set_show_atom_labels(
        &mut self,
        on: bool,
        origin: Origin,
    ) -> Vec<ParamChange> {
        if on == self.show_atom_labels {
            return Vec::new();
        }
        self.show_atom_labels = on;
        self.notify(vec![ParamChange {
            param: Param::ShowAtomLabels,
            origin,
        }])
    }

    /// Set the playback flag.
    pub(crate) fn set_playing(
        &mut self,
        playing: bool,
        origin: Origin,
    ) -> Vec<ParamChange> {
        if playing == self.playing {
            return Vec::new();
        }
        self.playing = playing;
        self.notify(vec![ParamChange {
            param: Param::Playing,
            origin,
        }])
    }

    /// Set the playback interval; must lie in
    /// [`MIN_SPEED_MS`]`..=`[`MAX_SPEED_MS`].
    pub(crate) fn set_speed_ms(
        &mut self,
        speed_ms: u32,
        origin: Origin,
    ) -> Result<Vec<ParamChange>, Mol3dError> {
        if !(MIN_SPEED_MS..=MAX_SPEED_MS).contains(&speed_ms) {
            return Err(Mol3dError::invalid(format!(
                "speed {speed_ms} ms outside [{MIN_SPEED_MS}, {MAX_SPEED_MS}]"
            )));
        }
        if speed_ms == self.speed_ms {
            return Ok(Vec::new());
        }
        self.speed_ms = speed_ms;
        Ok(self.notify(vec![ParamChange {
            param: Param::SpeedMs,
            origin,
        }]))
    }

    /// Set the loop mode.
    pub(crate) fn set_loop_mode(
        &mut self,
        mode: LoopMode,
        origin: Origin,
    ) -> Vec<ParamChange> {
        if mode == self.loop_mode {
            return Vec::new();
        }
        self.loop_mode = mode;
        self.notify(vec![ParamChange {
            param: Param::LoopMode,
            origin,
        }])
    }
}

// ── Deferred delivery ────────────────────────────────────────────────────

/// Changes recorded during a batch, for delivery after the batch returns.
///
/// Observers run while the widget is mutably borrowed, so a host that
/// shares the widget behind `Rc<RefCell<_>>` cannot read it back from inside
/// an observer. Register [`recorder`](Self::recorder) instead and
/// [`drain`](Self::drain) once the borrow is released. Each entry carries
/// the value at the time of the change.
#[derive(Debug, Clone, Default)]
pub struct ChangeQueue {
    pending: Rc<RefCell<Vec<(ParamChange, Value)>>>,
}

impl ChangeQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observer appending every change, with its value, to this queue.
    #[must_use]
    pub fn recorder(&self) -> impl FnMut(&ParamChange, &ParamStore) + 'static {
        let pending = Rc::clone(&self.pending);
        move |change, store| {
            pending
                .borrow_mut()
                .push((*change, store.value_json(change.param)));
        }
    }

    /// Take every recorded change, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<(ParamChange, Value)> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    /// Whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}

fn validate_total_frames(total_frames: usize) -> Result<(), Mol3dError> {
    if total_frames == 0 {
        return Err(Mol3dError::invalid("frame count must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn recorded(store: &mut ParamStore) -> Rc<RefCell<Vec<ParamChange>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _ = store.observe(move |change, _| sink.borrow_mut().push(*change));
        seen
    }

    #[test]
    fn equal_values_do_not_notify() {
        let mut store = ParamStore::default();
        let seen = recorded(&mut store);
        assert!(store.set_background_color("white", Origin::Host).is_empty());
        assert!(store.set_current_frame(0, Origin::Host).unwrap().is_empty());
        assert!(store.set_loop_mode(LoopMode::Forward, Origin::Host).is_empty());
        assert!(store
            .set_style(StyleFlags::default(), None, Origin::Host)
            .is_empty());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn new_values_notify_before_returning() {
        let mut store = ParamStore::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _ = store.observe(move |change, store| {
            sink.borrow_mut()
                .push((change.param, store.background_color().to_owned()));
        });
        let changes = store.set_background_color("black", Origin::Host);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            *seen.borrow(),
            vec![(Param::BackgroundColor, "black".to_owned())]
        );
    }

    #[test]
    fn out_of_range_writes_fail_without_mutating() {
        let mut store = ParamStore::default();
        assert!(matches!(
            store.set_current_frame(1, Origin::Host),
            Err(Mol3dError::InvalidParameter(_))
        ));
        assert!(store.set_total_frames(0, Origin::Host).is_err());
        assert!(store.set_speed_ms(0, Origin::Host).is_err());
        assert!(store.set_speed_ms(MAX_SPEED_MS + 1, Origin::Host).is_err());
        assert_eq!(store.total_frames(), 1);
        assert_eq!(store.speed_ms(), 200);
    }

    #[test]
    fn frame_count_changes_keep_current_frame_in_range() {
        let mut store = ParamStore::default();
        let sequence = [5, 3, 10, 1, 7, 7, 2];
        let mut frame_targets = [4, 2, 9, 0, 6, 6, 1].into_iter();
        for total in sequence {
            let before = store.current_frame();
            let _ = store.set_total_frames(total, Origin::Host).unwrap();
            let after = store.current_frame();
            assert!(after < total);
            if before >= total {
                assert_eq!(after, 0, "reset to 0, not clamped");
            } else {
                assert_eq!(after, before);
            }
            let target = frame_targets.next().unwrap();
            let _ = store.set_current_frame(target, Origin::Host).unwrap();
        }
    }

    #[test]
    fn frame_reset_is_part_of_the_same_batch() {
        let mut store = ParamStore::default();
        let _ = store.set_total_frames(5, Origin::Host).unwrap();
        let _ = store.set_current_frame(4, Origin::Host).unwrap();
        let changes = store.set_total_frames(3, Origin::Viewer).unwrap();
        assert_eq!(
            changes,
            vec![
                ParamChange {
                    param: Param::TotalFrames,
                    origin: Origin::Viewer
                },
                ParamChange {
                    param: Param::CurrentFrame,
                    origin: Origin::Viewer
                },
            ]
        );
    }

    #[test]
    fn unobserve_stops_notifications() {
        let mut store = ParamStore::default();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = store.observe(move |_, _| *sink.borrow_mut() += 1);
        let _ = store.set_playing(true, Origin::Host);
        assert!(store.unobserve(id));
        assert!(!store.unobserve(id));
        let _ = store.set_playing(false, Origin::Host);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn style_records_merge_into_template() {
        let mut store = ParamStore::default();
        let records = StyleSpec::new().with(crate::style::Representation::Stick(
            crate::style::StickStyle { radius: 0.08 },
        ));
        let changes =
            store.set_style(StyleFlags::default(), Some(&records), Origin::Host);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            store.active_style().to_json(),
            json!({"stick": {"radius": 0.08}, "sphere": {"radius": 0.3}})
        );
    }

    #[test]
    fn queued_changes_carry_their_values() {
        let mut store = ParamStore::default();
        let queue = ChangeQueue::new();
        let _ = store.observe(queue.recorder());
        let _ = store.set_total_frames(5, Origin::Host).unwrap();
        let _ = store.set_current_frame(3, Origin::Playback).unwrap();
        let _ = store.set_loop_mode(LoopMode::PingPong, Origin::Host);
        let drained: Vec<_> = queue
            .drain()
            .into_iter()
            .map(|(change, value)| (change.param.as_str(), value))
            .collect();
        assert_eq!(
            drained,
            vec![
                ("total_frames", json!(5)),
                ("current_frame", json!(3)),
                ("loop_mode", json!("pingpong")),
            ]
        );
        assert!(queue.is_empty());
    }
}
