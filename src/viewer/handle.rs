use serde::Serialize;
use serde_json::{json, Value};

use crate::animation::LoopMode;
use crate::error::Mol3dError;
use crate::options::{Options, ViewerOptions};

/// Construction-time configuration handed to [`ViewerFactory`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerConfig {
    /// Initial background color.
    pub background_color: String,
    /// Surface width in CSS pixels.
    pub width: u32,
    /// Surface height in CSS pixels.
    pub height: u32,
    /// Request antialiasing.
    pub antialias: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::from_options(&Options::default())
    }
}

impl ViewerConfig {
    /// Derive a config from the widget options.
    #[must_use]
    pub fn from_options(options: &Options) -> Self {
        let ViewerOptions {
            width,
            height,
            antialias,
            ..
        } = options.viewer;
        Self {
            background_color: options.display.background_color.clone(),
            width,
            height,
            antialias,
        }
    }

    /// CSS `(width, height)` the host surface is sized to before the
    /// viewer is created on it.
    #[must_use]
    pub fn css_size(&self) -> (String, String) {
        (format!("{}px", self.width), format!("{}px", self.height))
    }

    /// Config object for the viewer constructor.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "backgroundColor": self.background_color,
            "antialias": self.antialias,
        })
    }
}

/// Options for the viewer's own animation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimateOptions {
    /// Milliseconds between frames.
    pub interval_ms: u32,
    /// Traversal order.
    pub loop_mode: LoopMode,
    /// Number of repetitions; 0 loops until stopped.
    pub reps: u32,
}

impl AnimateOptions {
    /// Endless loop at `interval_ms`.
    #[must_use]
    pub fn looping(interval_ms: u32, loop_mode: LoopMode) -> Self {
        Self {
            interval_ms,
            loop_mode,
            reps: 0,
        }
    }

    /// Options object for the viewer's `animate(options)`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "loop": self.loop_mode.viewer_name(),
            "reps": self.reps,
            "interval": self.interval_ms,
        })
    }
}

/// One external viewer instance.
///
/// Implementations wrap a real rendering library; every call may fail with
/// [`Mol3dError::ExternalViewer`].
pub trait ViewerHandle {
    /// Add a single model.
    fn add_model(&mut self, text: &str, format: &str) -> Result<(), Mol3dError>;

    /// Add a concatenated payload as frames of one model.
    fn add_models_as_frames(
        &mut self,
        text: &str,
        format: &str,
    ) -> Result<(), Mol3dError>;

    /// Remove every model and label.
    fn clear(&mut self) -> Result<(), Mol3dError>;

    /// Apply a style map to all atoms.
    fn set_style(&mut self, style: &Value) -> Result<(), Mol3dError>;

    /// Change the background color.
    fn set_background_color(&mut self, color: &str) -> Result<(), Mol3dError>;

    /// Fit the camera to the loaded models.
    fn zoom_to(&mut self) -> Result<(), Mol3dError>;

    /// Redraw.
    fn render(&mut self) -> Result<(), Mol3dError>;

    /// Show frame `index`.
    fn set_frame(&mut self, index: usize) -> Result<(), Mol3dError>;

    /// Frame the viewer is currently showing.
    fn get_frame(&self) -> Result<usize, Mol3dError>;

    /// Add a text label.
    fn add_label(&mut self, text: &str, options: &Value)
        -> Result<(), Mol3dError>;

    /// Remove every label.
    fn remove_all_labels(&mut self) -> Result<(), Mol3dError>;

    /// Start the viewer's own frame loop.
    fn animate(&mut self, options: &AnimateOptions) -> Result<(), Mol3dError>;

    /// Stop the viewer's own frame loop.
    fn stop_animate(&mut self) -> Result<(), Mol3dError>;
}

/// Creates [`ViewerHandle`]s bound to a host surface.
pub trait ViewerFactory {
    /// Handle type produced.
    type Handle: ViewerHandle;

    /// Create a viewer on the surface named `surface`.
    fn create_viewer(
        &mut self,
        surface: &str,
        config: &ViewerConfig,
    ) -> Result<Self::Handle, Mol3dError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animate_options_use_viewer_loop_names() {
        let opts = AnimateOptions::looping(150, LoopMode::PingPong);
        assert_eq!(
            opts.to_json(),
            json!({"loop": "backAndForth", "reps": 0, "interval": 150})
        );
    }

    #[test]
    fn config_follows_options() {
        let mut options = Options::default();
        options.display.background_color = "black".into();
        options.viewer.width = 800;
        let config = ViewerConfig::from_options(&options);
        assert_eq!(config.background_color, "black");
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 400);
        assert_eq!(config.css_size(), ("800px".to_owned(), "400px".to_owned()));
        assert_eq!(
            config.to_json(),
            json!({"backgroundColor": "black", "antialias": true})
        );
    }
}
