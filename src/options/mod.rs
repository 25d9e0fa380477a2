//! Centralized widget options with TOML preset support.
//!
//! All construction-time settings (display toggles, style geometry,
//! playback, label appearance, viewer surface) are consolidated here.
//! Options serialize to/from TOML so dashboards can ship presets, and expose
//! a JSON Schema for schema-driven host controls.

mod animation;
mod display;
mod labels;
mod style;
mod viewer;

use std::path::Path;

pub use animation::AnimationOptions;
pub use display::DisplayOptions;
pub use labels::LabelOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use style::StyleOptions;
pub use viewer::ViewerOptions;

use crate::error::Mol3dError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[animation]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Background and representation toggles.
    pub display: DisplayOptions,
    /// Representation geometry.
    pub style: StyleOptions,
    /// Playback parameters.
    pub animation: AnimationOptions,
    /// Automatic label appearance.
    pub labels: LabelOptions,
    /// Rendering surface.
    pub viewer: ViewerOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Parse options from TOML text. Missing fields use defaults.
    pub fn from_toml(content: &str) -> Result<Self, Mol3dError> {
        toml::from_str(content)
            .map_err(|e| Mol3dError::OptionsParse(e.to_string()))
    }

    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, Mol3dError> {
        let content = std::fs::read_to_string(path).map_err(Mol3dError::Io)?;
        Self::from_toml(&content)
    }

    /// Save options to a TOML file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), Mol3dError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Mol3dError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Mol3dError::Io)?;
        }
        std::fs::write(path, content).map_err(Mol3dError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}
