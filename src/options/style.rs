use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::style::{
    CartoonStyle, LineStyle, Representation, SphereStyle, StickStyle,
    StyleSpec, SurfaceStyle,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Style", inline)]
#[serde(default)]
/// Per-representation geometry used whenever a representation is enabled.
pub struct StyleOptions {
    /// Stick radius in Å.
    #[schemars(title = "Stick Radius", range(min = 0.02, max = 1.0), extend("step" = 0.01))]
    pub stick_radius: f64,
    /// Sphere radius in Å.
    #[schemars(title = "Sphere Radius", range(min = 0.05, max = 2.0), extend("step" = 0.05))]
    pub sphere_radius: f64,
    /// Sphere scale relative to the element radius; overrides the radius.
    #[schemars(skip)]
    pub sphere_scale: Option<f64>,
    /// Cartoon color scheme.
    #[schemars(skip)]
    pub cartoon_color: Option<String>,
    /// Surface opacity.
    #[schemars(title = "Surface Opacity", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub surface_opacity: f64,
    /// Line width in pixels.
    #[schemars(skip)]
    pub line_width: Option<f64>,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            stick_radius: 0.15,
            sphere_radius: 0.3,
            sphere_scale: None,
            cartoon_color: None,
            surface_opacity: 1.0,
            line_width: None,
        }
    }
}

impl StyleOptions {
    /// One option record per representation kind.
    #[must_use]
    pub fn template(&self) -> StyleSpec {
        let sphere = self.sphere_scale.map_or(
            SphereStyle {
                radius: Some(self.sphere_radius),
                scale: None,
            },
            |scale| SphereStyle {
                radius: None,
                scale: Some(scale),
            },
        );
        let surface_opacity =
            (self.surface_opacity < 1.0).then_some(self.surface_opacity);
        StyleSpec::new()
            .with(Representation::Stick(StickStyle {
                radius: self.stick_radius,
            }))
            .with(Representation::Sphere(sphere))
            .with(Representation::Cartoon(CartoonStyle {
                color: self.cartoon_color.clone(),
            }))
            .with(Representation::Surface(SurfaceStyle {
                opacity: surface_opacity,
            }))
            .with(Representation::Line(LineStyle {
                linewidth: self.line_width,
            }))
    }
}
