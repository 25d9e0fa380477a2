//! Text labels anchored to 3D positions.
//!
//! Labels are either added by the host one at a time or generated from the
//! atom sites of the loaded structure (see [`auto_labels`]). The viewer
//! receives them in insertion order after a full clear.

pub mod extract;

pub use extract::{atom_count, atom_sites, AtomSite, AtomSites};
use glam::Vec3;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// What text an automatic atom label shows.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum LabelText {
    /// 1-based atom index.
    #[default]
    Index,
    /// Element symbol.
    Element,
    /// Element symbol followed by the 1-based index (`C3`).
    ElementIndex,
}

impl LabelText {
    /// Text for the atom at 0-based `index`.
    #[must_use]
    pub fn format(self, index: usize, site: &AtomSite) -> String {
        match self {
            Self::Index => (index + 1).to_string(),
            Self::Element => site.element.clone(),
            Self::ElementIndex => format!("{}{}", site.element, index + 1),
        }
    }
}

/// Font and background attributes of a label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Label Style", inline)]
#[serde(default)]
pub struct LabelStyle {
    /// Font family.
    #[schemars(title = "Font")]
    pub font: String,
    /// Font size in points.
    #[schemars(title = "Font Size", range(min = 6, max = 48))]
    pub font_size: u32,
    /// Font color.
    #[schemars(title = "Font Color")]
    pub font_color: String,
    /// Font opacity in `[0, 1]`.
    #[schemars(title = "Font Opacity", range(min = 0.0, max = 1.0))]
    pub font_opacity: f64,
    /// Background color.
    #[schemars(title = "Background Color")]
    pub background_color: String,
    /// Background opacity in `[0, 1]`.
    #[schemars(title = "Background Opacity", range(min = 0.0, max = 1.0))]
    pub background_opacity: f64,
    /// Draw the label in front of all geometry.
    #[schemars(title = "In Front")]
    pub in_front: bool,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font: "arial".into(),
            font_size: 16,
            font_color: "blue".into(),
            font_opacity: 1.0,
            background_color: "white".into(),
            background_opacity: 0.0,
            in_front: true,
        }
    }
}

/// A text annotation at a 3D position.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// Displayed text.
    pub text: String,
    /// Anchor position in Å.
    pub position: Vec3,
    /// Appearance.
    pub style: LabelStyle,
}

impl Label {
    /// Label with the default style.
    #[must_use]
    pub fn new(text: impl Into<String>, position: Vec3) -> Self {
        Self {
            text: text.into(),
            position,
            style: LabelStyle::default(),
        }
    }

    /// Replace the style.
    #[must_use]
    pub fn with_style(mut self, style: LabelStyle) -> Self {
        self.style = style;
        self
    }

    /// Options object for the viewer's `addLabel(text, options)`.
    #[must_use]
    pub fn options_json(&self) -> Value {
        let s = &self.style;
        json!({
            "position": {
                "x": self.position.x,
                "y": self.position.y,
                "z": self.position.z,
            },
            "font": s.font,
            "fontSize": s.font_size,
            "fontColor": s.font_color,
            "fontOpacity": s.font_opacity,
            "backgroundColor": s.background_color,
            "backgroundOpacity": s.background_opacity,
            "inFront": s.in_front,
        })
    }
}

/// One label per atom site, in file order.
pub fn auto_labels<'a>(
    sites: impl Iterator<Item = AtomSite> + 'a,
    text: LabelText,
    style: &'a LabelStyle,
) -> impl Iterator<Item = Label> + 'a {
    sites.enumerate().map(move |(i, site)| Label {
        text: text.format(i, &site),
        position: site.position,
        style: style.clone(),
    })
}
