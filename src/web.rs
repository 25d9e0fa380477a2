//! Browser bindings: `$3Dmol` as the external viewer and an exported
//! [`WebMol3dViewer`] whose playback runs on `setInterval`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::animation::{LoopMode, TimerId};
use crate::error::Mol3dError;
use crate::options::Options;
use crate::params::ChangeQueue;
use crate::structure::FileFormat;
use crate::viewer::{AnimateOptions, ViewerConfig, ViewerFactory, ViewerHandle};
use crate::widget::Mol3dViewer;

#[wasm_bindgen]
extern "C" {
    type GlViewer;

    #[wasm_bindgen(js_namespace = ["$3Dmol"], js_name = createViewer, catch)]
    fn create_viewer(
        element: &web_sys::Element,
        config: &JsValue,
    ) -> Result<GlViewer, JsValue>;

    #[wasm_bindgen(method, catch, js_name = addModel)]
    fn add_model(
        this: &GlViewer,
        data: &str,
        format: &str,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = addModelsAsFrames)]
    fn add_models_as_frames(
        this: &GlViewer,
        data: &str,
        format: &str,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = clear)]
    fn clear(this: &GlViewer) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setStyle)]
    fn set_style(
        this: &GlViewer,
        selection: &JsValue,
        style: &JsValue,
    ) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setBackgroundColor)]
    fn set_background_color(this: &GlViewer, color: &str)
        -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = zoomTo)]
    fn zoom_to(this: &GlViewer) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = render)]
    fn render(this: &GlViewer) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setFrame)]
    fn set_frame(this: &GlViewer, index: u32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = getFrame)]
    fn get_frame(this: &GlViewer) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = addLabel)]
    fn add_label(
        this: &GlViewer,
        text: &str,
        options: &JsValue,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = removeAllLabels)]
    fn remove_all_labels(this: &GlViewer) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = animate)]
    fn animate(this: &GlViewer, options: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = stopAnimate)]
    fn stop_animate(this: &GlViewer) -> Result<(), JsValue>;
}

fn js_err(e: &JsValue) -> Mol3dError {
    Mol3dError::viewer(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

fn to_js(value: &Value) -> Result<JsValue, Mol3dError> {
    js_sys::JSON::parse(&value.to_string()).map_err(|e| js_err(&e))
}

/// Installs the panic hook and routes `log` to the browser console.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::debug!("console logger already installed");
    }
}

// ── $3Dmol handle ────────────────────────────────────────────────────────

/// Creates `$3Dmol` viewers on DOM elements looked up by id.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreeDmolFactory;

/// A `$3Dmol` GLViewer.
pub struct ThreeDmolViewer {
    viewer: GlViewer,
}

impl ViewerFactory for ThreeDmolFactory {
    type Handle = ThreeDmolViewer;

    fn create_viewer(
        &mut self,
        surface: &str,
        config: &ViewerConfig,
    ) -> Result<ThreeDmolViewer, Mol3dError> {
        let element = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(surface))
            .ok_or_else(|| {
                Mol3dError::viewer(format!("no element with id '{surface}'"))
            })?;
        if let Some(html) = element.dyn_ref::<web_sys::HtmlElement>() {
            let (width, height) = config.css_size();
            let style = html.style();
            style.set_property("width", &width).map_err(|e| js_err(&e))?;
            style.set_property("height", &height).map_err(|e| js_err(&e))?;
        }
        let viewer = create_viewer(&element, &to_js(&config.to_json())?)
            .map_err(|e| js_err(&e))?;
        Ok(ThreeDmolViewer { viewer })
    }
}

impl ViewerHandle for ThreeDmolViewer {
    fn add_model(&mut self, text: &str, format: &str) -> Result<(), Mol3dError> {
        self.viewer
            .add_model(text, format)
            .map(|_| ())
            .map_err(|e| js_err(&e))
    }

    fn add_models_as_frames(
        &mut self,
        text: &str,
        format: &str,
    ) -> Result<(), Mol3dError> {
        self.viewer
            .add_models_as_frames(text, format)
            .map(|_| ())
            .map_err(|e| js_err(&e))
    }

    fn clear(&mut self) -> Result<(), Mol3dError> {
        self.viewer.clear().map_err(|e| js_err(&e))
    }

    fn set_style(&mut self, style: &Value) -> Result<(), Mol3dError> {
        let all = js_sys::Object::new();
        self.viewer
            .set_style(&all, &to_js(style)?)
            .map_err(|e| js_err(&e))
    }

    fn set_background_color(&mut self, color: &str) -> Result<(), Mol3dError> {
        self.viewer
            .set_background_color(color)
            .map_err(|e| js_err(&e))
    }

    fn zoom_to(&mut self) -> Result<(), Mol3dError> {
        self.viewer.zoom_to().map_err(|e| js_err(&e))
    }

    fn render(&mut self) -> Result<(), Mol3dError> {
        self.viewer.render().map_err(|e| js_err(&e))
    }

    fn set_frame(&mut self, index: usize) -> Result<(), Mol3dError> {
        self.viewer
            .set_frame(index as u32)
            .map(|_| ())
            .map_err(|e| js_err(&e))
    }

    fn get_frame(&self) -> Result<usize, Mol3dError> {
        let frame = self.viewer.get_frame().map_err(|e| js_err(&e))?;
        frame
            .as_f64()
            .map(|f| f as usize)
            .ok_or_else(|| Mol3dError::viewer("getFrame returned no number"))
    }

    fn add_label(
        &mut self,
        text: &str,
        options: &Value,
    ) -> Result<(), Mol3dError> {
        self.viewer
            .add_label(text, &to_js(options)?)
            .map(|_| ())
            .map_err(|e| js_err(&e))
    }

    fn remove_all_labels(&mut self) -> Result<(), Mol3dError> {
        self.viewer.remove_all_labels().map_err(|e| js_err(&e))
    }

    fn animate(&mut self, options: &AnimateOptions) -> Result<(), Mol3dError> {
        self.viewer
            .animate(&to_js(&options.to_json())?)
            .map_err(|e| js_err(&e))
    }

    fn stop_animate(&mut self) -> Result<(), Mol3dError> {
        self.viewer.stop_animate().map_err(|e| js_err(&e))
    }
}

// ── Exported widget ──────────────────────────────────────────────────────

type Shared = Rc<RefCell<Mol3dViewer<ThreeDmolFactory>>>;

/// A browser `setInterval` bound to one playback timer. The handle is
/// shared with the callback so a halt inside it can clear the interval.
struct Interval {
    timer: TimerId,
    handle: Rc<Cell<Option<i32>>>,
}

impl Interval {
    fn clear(&self, window: &web_sys::Window) {
        if let Some(handle) = self.handle.take() {
            window.clear_interval_with_handle(handle);
        }
    }
}

/// Host change callbacks and the queue feeding them.
///
/// Delivery happens only after the widget borrow is released, so a
/// callback may read or drive the viewer.
#[derive(Clone, Default)]
struct Notifier {
    queue: ChangeQueue,
    listeners: Rc<RefCell<Vec<js_sys::Function>>>,
}

impl Notifier {
    fn deliver(&self) {
        let pending = self.queue.drain();
        if pending.is_empty() {
            return;
        }
        let listeners = self.listeners.borrow().clone();
        for (change, value) in pending {
            let name = JsValue::from_str(change.param.as_str());
            let value = match to_js(&value) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("{}: {e}", change.param.as_str());
                    continue;
                }
            };
            for listener in &listeners {
                if let Err(e) = listener.call2(&JsValue::NULL, &name, &value) {
                    log::warn!("change callback failed: {e:?}");
                }
            }
        }
    }
}

/// Molecular viewer widget for JavaScript hosts.
#[wasm_bindgen]
pub struct WebMol3dViewer {
    inner: Shared,
    notifier: Notifier,
    interval: RefCell<Option<Interval>>,
}

fn to_js_err(e: &Mol3dError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
impl WebMol3dViewer {
    /// Create a viewer on the element with id `surface`, optionally
    /// configured by a TOML options preset.
    #[wasm_bindgen(constructor)]
    pub fn new(
        surface: &str,
        options_toml: Option<String>,
    ) -> Result<WebMol3dViewer, JsValue> {
        let options = match options_toml {
            Some(text) => Options::from_toml(&text).map_err(|e| to_js_err(&e))?,
            None => Options::default(),
        };
        let mut widget = Mol3dViewer::builder(ThreeDmolFactory)
            .with_options(options)
            .with_surface(surface)
            .build()
            .map_err(|e| to_js_err(&e))?;
        let notifier = Notifier::default();
        let _ = widget.observe(notifier.queue.recorder());
        let _ = widget.initialize().map_err(|e| to_js_err(&e))?;
        Ok(Self {
            inner: Rc::new(RefCell::new(widget)),
            notifier,
            interval: RefCell::new(None),
        })
    }

    /// Replace the structure.
    #[wasm_bindgen(js_name = loadModel)]
    pub fn load_model(&self, text: String, format: &str) -> Result<(), JsValue> {
        self.with(|w| w.load_model(text, FileFormat::from(format)).map(|_| ()))
    }

    /// Change the format tag of the loaded structure.
    #[wasm_bindgen(js_name = setFileFormat)]
    pub fn set_file_format(&self, format: &str) -> Result<(), JsValue> {
        self.with(|w| w.set_file_format(FileFormat::from(format)).map(|_| ()))
    }

    /// Apply a style map such as `{"stick": {"radius": 0.2}}`.
    #[wasm_bindgen(js_name = setStyle)]
    pub fn set_style(&self, style_json: &str) -> Result<(), JsValue> {
        let style: Value = serde_json::from_str(style_json)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.with(|w| {
            let _ = w.set_style_json(&style);
            Ok(())
        })
    }

    /// Change the background color.
    #[wasm_bindgen(js_name = setBackground)]
    pub fn set_background(&self, color: &str) -> Result<(), JsValue> {
        self.with(|w| {
            let _ = w.set_background(color);
            Ok(())
        })
    }

    /// Toggle automatic atom labels.
    #[wasm_bindgen(js_name = showAtomLabels)]
    pub fn show_atom_labels(&self, on: bool) -> Result<(), JsValue> {
        self.with(|w| {
            let _ = w.show_atom_labels(on);
            Ok(())
        })
    }

    /// Remove every label.
    #[wasm_bindgen(js_name = removeAllLabels)]
    pub fn remove_all_labels(&self) -> Result<(), JsValue> {
        self.with(|w| {
            let _ = w.remove_all_labels();
            Ok(())
        })
    }

    /// Show frame `frame`.
    #[wasm_bindgen(js_name = setFrame)]
    pub fn set_frame(&self, frame: usize) -> Result<(), JsValue> {
        self.with(|w| w.set_frame(frame).map(|_| ()))
    }

    /// Show the first frame.
    #[wasm_bindgen(js_name = firstFrame)]
    pub fn first_frame(&self) -> Result<(), JsValue> {
        self.with(|w| {
            let _ = w.first_frame();
            Ok(())
        })
    }

    /// Show the last frame.
    #[wasm_bindgen(js_name = lastFrame)]
    pub fn last_frame(&self) -> Result<(), JsValue> {
        self.with(|w| {
            let _ = w.last_frame();
            Ok(())
        })
    }

    /// Show the next frame, stopping at the last.
    #[wasm_bindgen(js_name = stepForward)]
    pub fn step_forward(&self) -> Result<(), JsValue> {
        self.with(|w| {
            let _ = w.step_forward();
            Ok(())
        })
    }

    /// Show the previous frame, stopping at the first.
    #[wasm_bindgen(js_name = stepBackward)]
    pub fn step_backward(&self) -> Result<(), JsValue> {
        self.with(|w| {
            let _ = w.step_backward();
            Ok(())
        })
    }

    /// Displayed frame index.
    #[wasm_bindgen(js_name = currentFrame)]
    #[must_use]
    pub fn current_frame(&self) -> usize {
        self.inner.borrow().current_frame()
    }

    /// Number of frames.
    #[wasm_bindgen(js_name = totalFrames)]
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.inner.borrow().total_frames()
    }

    /// Whether playback is running.
    #[wasm_bindgen(js_name = isPlaying)]
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.inner.borrow().is_playing()
    }

    /// Start playback.
    pub fn play(&self) -> Result<(), JsValue> {
        self.with(|w| {
            let _ = w.start_animation();
            Ok(())
        })
    }

    /// Stop playback.
    pub fn stop(&self) -> Result<(), JsValue> {
        self.with(|w| {
            let _ = w.stop_animation();
            Ok(())
        })
    }

    /// Stop playback and return to the first frame.
    pub fn reset(&self) -> Result<(), JsValue> {
        self.with(|w| {
            let _ = w.reset_animation();
            Ok(())
        })
    }

    /// Change the playback interval.
    #[wasm_bindgen(js_name = setSpeed)]
    pub fn set_speed(&self, speed_ms: u32) -> Result<(), JsValue> {
        self.with(|w| w.set_animation_speed(speed_ms).map(|_| ()))
    }

    /// Change the loop mode (`forward`, `backward` or `pingpong`).
    #[wasm_bindgen(js_name = setLoopMode)]
    pub fn set_loop_mode(&self, mode: &str) -> Result<(), JsValue> {
        let mode = LoopMode::from_name(mode).ok_or_else(|| {
            JsValue::from_str(&format!("unknown loop mode '{mode}'"))
        })?;
        self.with(|w| {
            let _ = w.set_loop_mode(mode);
            Ok(())
        })
    }

    /// Redraw.
    pub fn render(&self) -> Result<(), JsValue> {
        self.with(|w| {
            let _ = w.render();
            Ok(())
        })
    }

    /// Fit the camera to the structure.
    pub fn center(&self) -> Result<(), JsValue> {
        self.with(|w| {
            let _ = w.center();
            Ok(())
        })
    }

    /// Call `callback(name, value)` after every parameter change, once the
    /// change has been applied.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: js_sys::Function) {
        self.notifier.listeners.borrow_mut().push(callback);
    }
}

impl WebMol3dViewer {
    /// Run `f` on the widget, then bring the browser interval in line and
    /// deliver the changes it made.
    fn with<R>(
        &self,
        f: impl FnOnce(&mut Mol3dViewer<ThreeDmolFactory>) -> Result<R, Mol3dError>,
    ) -> Result<R, JsValue> {
        let result = {
            let mut widget = self
                .inner
                .try_borrow_mut()
                .map_err(|_| JsValue::from_str("viewer is busy"))?;
            f(&mut widget)
        };
        self.sync_interval()?;
        self.notifier.deliver();
        result.map_err(|e| to_js_err(&e))
    }

    /// Arm, re-arm or cancel the browser interval so it matches the
    /// widget's live timer.
    fn sync_interval(&self) -> Result<(), JsValue> {
        let (live, speed_ms) = {
            let widget = self.inner.borrow();
            (widget.timer_id(), widget.params().speed_ms())
        };
        let mut slot = self.interval.borrow_mut();
        if slot.as_ref().map(|i| i.timer) == live {
            return Ok(());
        }
        let window =
            web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        if let Some(old) = slot.take() {
            old.clear(&window);
        }
        let Some(timer) = live else {
            return Ok(());
        };
        let handle = Rc::new(Cell::new(None));
        let callback = interval_callback(
            Rc::clone(&self.inner),
            self.notifier.clone(),
            timer,
            Rc::clone(&handle),
        );
        let id = window.set_interval_with_callback_and_timeout_and_arguments_0(
            &callback,
            speed_ms as i32,
        )?;
        handle.set(Some(id));
        *slot = Some(Interval { timer, handle });
        Ok(())
    }
}

/// Callback for one interval. Fires `timer`, delivers the resulting
/// changes, and clears its own interval once `timer` is no longer live.
///
/// The closure is handed to JS, which frees it after the interval is
/// cleared, so replacing the interval from inside a change callback never
/// drops a running closure.
fn interval_callback(
    inner: Shared,
    notifier: Notifier,
    timer: TimerId,
    handle: Rc<Cell<Option<i32>>>,
) -> js_sys::Function {
    let closure = Closure::wrap(Box::new(move || {
        let halted = match inner.try_borrow_mut() {
            Ok(mut widget) => {
                widget.fire_timer(timer).timer_id() != Some(timer)
            }
            Err(_) => false,
        };
        notifier.deliver();
        if halted {
            if let (Some(id), Some(window)) = (handle.take(), web_sys::window())
            {
                log::debug!("playback ended, clearing interval {id}");
                window.clear_interval_with_handle(id);
            }
        }
    }) as Box<dyn FnMut()>);
    closure.into_js_value().unchecked_into()
}

impl Drop for WebMol3dViewer {
    fn drop(&mut self) {
        if let (Some(interval), Some(window)) =
            (self.interval.get_mut().take(), web_sys::window())
        {
            interval.clear(&window);
        }
    }
}
