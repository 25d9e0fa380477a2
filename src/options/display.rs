use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::style::StyleFlags;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Display", inline)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
/// Background and representation toggles applied at construction.
pub struct DisplayOptions {
    /// Viewer background color (CSS name or `#rrggbb`).
    #[schemars(title = "Background")]
    pub background_color: String,
    /// Draw bonds as sticks.
    #[schemars(title = "Show Stick")]
    pub show_stick: bool,
    /// Draw atoms as spheres.
    #[schemars(title = "Show Sphere")]
    pub show_sphere: bool,
    /// Draw a secondary-structure cartoon.
    #[schemars(title = "Show Cartoon")]
    pub show_cartoon: bool,
    /// Draw a molecular surface.
    #[schemars(title = "Show Surface")]
    pub show_surface: bool,
    /// Draw bonds as lines.
    #[schemars(title = "Show Line")]
    pub show_line: bool,
    /// Label every atom of the loaded structure.
    #[schemars(title = "Atom Labels")]
    pub show_atom_labels: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            background_color: "white".into(),
            show_stick: true,
            show_sphere: true,
            show_cartoon: false,
            show_surface: false,
            show_line: false,
            show_atom_labels: false,
        }
    }
}

impl DisplayOptions {
    /// The representation toggles as a flag set.
    #[must_use]
    pub fn style_flags(&self) -> StyleFlags {
        StyleFlags {
            stick: self.show_stick,
            sphere: self.show_sphere,
            cartoon: self.show_cartoon,
            surface: self.show_surface,
            line: self.show_line,
        }
    }
}
