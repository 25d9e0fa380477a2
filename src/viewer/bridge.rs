use crate::error::Mol3dError;
use crate::labels::Label;
use crate::structure::Structure;
use crate::style::StyleSpec;

use super::handle::{AnimateOptions, ViewerConfig, ViewerFactory, ViewerHandle};

/// Owns the single external viewer handle and translates widget state into
/// viewer calls.
///
/// Until [`initialize`](Self::initialize) succeeds every projection is a
/// logged no-op; the widget replays its state once the handle exists.
pub struct ViewerBridge<F: ViewerFactory> {
    factory: F,
    handle: Option<F::Handle>,
    surface: Option<String>,
}

impl<F: ViewerFactory> ViewerBridge<F> {
    /// Bridge with no handle yet.
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            handle: None,
            surface: None,
        }
    }

    /// Whether a handle exists.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.handle.is_some()
    }

    /// Surface the handle was created on.
    #[must_use]
    pub fn surface(&self) -> Option<&str> {
        self.surface.as_deref()
    }

    /// The factory, for inspection.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Create the handle. Returns `false` (and does nothing) if one already
    /// exists.
    pub fn initialize(
        &mut self,
        surface: &str,
        config: &ViewerConfig,
    ) -> Result<bool, Mol3dError> {
        if let Some(existing) = &self.surface {
            log::debug!(
                "viewer already initialized on '{existing}', ignoring \
                 request for '{surface}'"
            );
            return Ok(false);
        }
        let handle = self.factory.create_viewer(surface, config)?;
        self.handle = Some(handle);
        self.surface = Some(surface.to_owned());
        log::info!("viewer created on '{surface}'");
        Ok(true)
    }

    fn handle_or_skip(&mut self, what: &str) -> Option<&mut F::Handle> {
        if self.handle.is_none() {
            log::debug!("{what}: no viewer yet, skipping");
        }
        self.handle.as_mut()
    }

    // ── Projections ──────────────────────────────────────────────────

    /// Replace all models with `structure`, fit the camera and render.
    ///
    /// A multi-frame XYZ payload is loaded as frames; other formats with
    /// several frames fall back to a single model.
    pub fn load_structure(
        &mut self,
        structure: &Structure,
        total_frames: usize,
    ) -> Result<(), Mol3dError> {
        let Some(handle) = self.handle_or_skip("load_structure") else {
            return Ok(());
        };
        handle.clear()?;
        if structure.is_empty() {
            return handle.render();
        }
        let format = structure.format.as_str();
        if total_frames > 1 && structure.format.supports_concatenated_frames()
        {
            handle.add_models_as_frames(&structure.text, format)?;
        } else {
            if total_frames > 1 {
                log::warn!(
                    "{}",
                    Mol3dError::UnsupportedFormat(format!(
                        "{format} has no multi-frame loader, showing the \
                         first of {total_frames} frames"
                    ))
                );
            }
            handle.add_model(&structure.text, format)?;
        }
        handle.zoom_to()?;
        handle.render()
    }

    /// Apply a resolved style to all atoms and render.
    pub fn apply_style(&mut self, style: &StyleSpec) -> Result<(), Mol3dError> {
        let Some(handle) = self.handle_or_skip("apply_style") else {
            return Ok(());
        };
        handle.set_style(&style.to_json())?;
        handle.render()
    }

    /// Replace all labels with `labels`, in order, and render.
    pub fn apply_labels<'a>(
        &mut self,
        labels: impl IntoIterator<Item = &'a Label>,
    ) -> Result<(), Mol3dError> {
        let Some(handle) = self.handle_or_skip("apply_labels") else {
            return Ok(());
        };
        handle.remove_all_labels()?;
        for label in labels {
            handle.add_label(&label.text, &label.options_json())?;
        }
        handle.render()
    }

    /// Change the background color and render.
    pub fn set_background(&mut self, color: &str) -> Result<(), Mol3dError> {
        let Some(handle) = self.handle_or_skip("set_background") else {
            return Ok(());
        };
        handle.set_background_color(color)?;
        handle.render()
    }

    /// Seek to frame `frame` of `total` and render.
    ///
    /// When the seek fails a plain render is still attempted, and the seek
    /// error is returned.
    pub fn jump_to_frame(
        &mut self,
        frame: usize,
        total: usize,
    ) -> Result<(), Mol3dError> {
        if frame >= total {
            return Err(Mol3dError::invalid(format!(
                "frame {frame} outside [0, {total})"
            )));
        }
        let handle = self.handle.as_mut().ok_or(Mol3dError::NotInitialized)?;
        match handle.set_frame(frame) {
            Ok(()) => handle.render(),
            Err(err) => {
                if let Err(render_err) = handle.render() {
                    log::debug!("render after failed seek: {render_err}");
                }
                Err(err)
            }
        }
    }

    /// Redraw.
    pub fn render(&mut self) -> Result<(), Mol3dError> {
        match self.handle_or_skip("render") {
            Some(handle) => handle.render(),
            None => Ok(()),
        }
    }

    /// Fit the camera to the loaded models and render.
    pub fn zoom_to(&mut self) -> Result<(), Mol3dError> {
        let Some(handle) = self.handle_or_skip("zoom_to") else {
            return Ok(());
        };
        handle.zoom_to()?;
        handle.render()
    }

    // ── Native playback ──────────────────────────────────────────────

    /// Start the viewer's own frame loop.
    pub fn start_native(
        &mut self,
        options: &AnimateOptions,
    ) -> Result<(), Mol3dError> {
        self.handle
            .as_mut()
            .ok_or(Mol3dError::NotInitialized)?
            .animate(options)
    }

    /// Stop the viewer's own frame loop.
    pub fn stop_native(&mut self) -> Result<(), Mol3dError> {
        match self.handle_or_skip("stop_native") {
            Some(handle) => handle.stop_animate(),
            None => Ok(()),
        }
    }

    /// Frame the viewer reports it is showing.
    pub fn viewer_frame(&self) -> Result<usize, Mol3dError> {
        self.handle
            .as_ref()
            .ok_or(Mol3dError::NotInitialized)?
            .get_frame()
    }
}
