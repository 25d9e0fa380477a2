use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Viewer", inline)]
#[serde(default)]
/// Rendering surface the viewer is created on.
pub struct ViewerOptions {
    /// Id of the host element the viewer attaches to.
    #[schemars(skip)]
    pub surface: String,
    /// Surface width in CSS pixels.
    #[schemars(title = "Width", range(min = 100, max = 4000))]
    pub width: u32,
    /// Surface height in CSS pixels.
    #[schemars(title = "Height", range(min = 100, max = 4000))]
    pub height: u32,
    /// Request antialiasing from the viewer.
    #[schemars(title = "Antialias")]
    pub antialias: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            surface: "viewer".into(),
            width: 600,
            height: 400,
            antialias: true,
        }
    }
}
