//! Representation styles: flag sets and the typed style records sent to the
//! viewer.
//!
//! The host toggles five independent flags. The active style is the union
//! of the enabled kinds, or stick + sphere when none is enabled. Each kind
//! carries its own option record, so a [`StyleSpec`] serializes to exactly
//! the `{"stick": {...}, "sphere": {...}}` map the viewer expects.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of molecular representation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RepresentationKind {
    /// Bonds drawn as cylinders.
    Stick,
    /// Atoms drawn as spheres.
    Sphere,
    /// Secondary-structure cartoon.
    Cartoon,
    /// Molecular surface.
    Surface,
    /// Bonds drawn as lines.
    Line,
}

impl RepresentationKind {
    /// All kinds in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Stick,
        Self::Sphere,
        Self::Cartoon,
        Self::Surface,
        Self::Line,
    ];

    /// Key used in the viewer's style map.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Stick => "stick",
            Self::Sphere => "sphere",
            Self::Cartoon => "cartoon",
            Self::Surface => "surface",
            Self::Line => "line",
        }
    }

    /// Kind for a style-map key, if known.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

/// Stick options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StickStyle {
    /// Cylinder radius in Å.
    pub radius: f64,
}

impl Default for StickStyle {
    fn default() -> Self {
        Self { radius: 0.15 }
    }
}

/// Sphere options. `scale` multiplies the van der Waals radius and takes
/// precedence over `radius` in the viewer when both are present.
///
/// Missing fields deserialize to `None` rather than to [`Default`], so
/// `{"scale": 0.12}` carries no radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SphereStyle {
    /// Fixed sphere radius in Å.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    /// Scale factor applied to the element radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

impl Default for SphereStyle {
    fn default() -> Self {
        Self {
            radius: Some(0.3),
            scale: None,
        }
    }
}

/// Cartoon options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CartoonStyle {
    /// Color name or `spectrum`; viewer default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Surface options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceStyle {
    /// Surface opacity in `[0, 1]`; viewer default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

/// Line options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineStyle {
    /// Line width in pixels; viewer default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linewidth: Option<f64>,
}

/// One representation with its typed options.
#[derive(Debug, Clone, PartialEq)]
pub enum Representation {
    /// Stick bonds.
    Stick(StickStyle),
    /// Atom spheres.
    Sphere(SphereStyle),
    /// Cartoon.
    Cartoon(CartoonStyle),
    /// Surface.
    Surface(SurfaceStyle),
    /// Line bonds.
    Line(LineStyle),
}

impl Representation {
    /// The kind of this representation.
    #[must_use]
    pub fn kind(&self) -> RepresentationKind {
        match self {
            Self::Stick(_) => RepresentationKind::Stick,
            Self::Sphere(_) => RepresentationKind::Sphere,
            Self::Cartoon(_) => RepresentationKind::Cartoon,
            Self::Surface(_) => RepresentationKind::Surface,
            Self::Line(_) => RepresentationKind::Line,
        }
    }

    /// Default options for a kind.
    #[must_use]
    pub fn default_for(kind: RepresentationKind) -> Self {
        match kind {
            RepresentationKind::Stick => Self::Stick(StickStyle::default()),
            RepresentationKind::Sphere => {
                Self::Sphere(SphereStyle::default())
            }
            RepresentationKind::Cartoon => {
                Self::Cartoon(CartoonStyle::default())
            }
            RepresentationKind::Surface => {
                Self::Surface(SurfaceStyle::default())
            }
            RepresentationKind::Line => Self::Line(LineStyle::default()),
        }
    }

    /// Parse the option record for `kind` from a JSON value. Unknown
    /// fields are ignored; a non-object value yields the defaults.
    fn from_json(kind: RepresentationKind, value: &Value) -> Self {
        fn record<T: serde::de::DeserializeOwned + Default>(v: &Value) -> T {
            serde_json::from_value(v.clone()).unwrap_or_default()
        }
        match kind {
            RepresentationKind::Stick => Self::Stick(record(value)),
            RepresentationKind::Sphere => Self::Sphere(record(value)),
            RepresentationKind::Cartoon => Self::Cartoon(record(value)),
            RepresentationKind::Surface => Self::Surface(record(value)),
            RepresentationKind::Line => Self::Line(record(value)),
        }
    }

    fn options_json(&self) -> Value {
        let result = match self {
            Self::Stick(s) => serde_json::to_value(s),
            Self::Sphere(s) => serde_json::to_value(s),
            Self::Cartoon(s) => serde_json::to_value(s),
            Self::Surface(s) => serde_json::to_value(s),
            Self::Line(s) => serde_json::to_value(s),
        };
        result.unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// The five host-facing representation toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct StyleFlags {
    /// Show sticks.
    pub stick: bool,
    /// Show spheres.
    pub sphere: bool,
    /// Show cartoon.
    pub cartoon: bool,
    /// Show surface.
    pub surface: bool,
    /// Show lines.
    pub line: bool,
}

impl Default for StyleFlags {
    fn default() -> Self {
        Self::fallback()
    }
}

impl StyleFlags {
    /// No representation enabled.
    #[must_use]
    pub fn none() -> Self {
        Self {
            stick: false,
            sphere: false,
            cartoon: false,
            surface: false,
            line: false,
        }
    }

    /// The stick + sphere pair used when nothing is enabled.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            stick: true,
            sphere: true,
            ..Self::none()
        }
    }

    /// Whether `kind` is enabled.
    #[must_use]
    pub fn contains(&self, kind: RepresentationKind) -> bool {
        match kind {
            RepresentationKind::Stick => self.stick,
            RepresentationKind::Sphere => self.sphere,
            RepresentationKind::Cartoon => self.cartoon,
            RepresentationKind::Surface => self.surface,
            RepresentationKind::Line => self.line,
        }
    }

    /// Enable or disable `kind`.
    pub fn set(&mut self, kind: RepresentationKind, on: bool) {
        match kind {
            RepresentationKind::Stick => self.stick = on,
            RepresentationKind::Sphere => self.sphere = on,
            RepresentationKind::Cartoon => self.cartoon = on,
            RepresentationKind::Surface => self.surface = on,
            RepresentationKind::Line => self.line = on,
        }
    }

    /// Whether no kind is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !RepresentationKind::ALL.iter().any(|k| self.contains(*k))
    }

    /// The kinds that will actually be drawn: the enabled ones, or the
    /// fallback pair when none is enabled.
    pub fn active_kinds(&self) -> impl Iterator<Item = RepresentationKind> {
        let flags = if self.is_empty() {
            Self::fallback()
        } else {
            *self
        };
        RepresentationKind::ALL
            .into_iter()
            .filter(move |k| flags.contains(*k))
    }
}

/// A set of representations, at most one per kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleSpec {
    reps: Vec<Representation>,
}

impl StyleSpec {
    /// Empty spec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, rep: Representation) -> Self {
        self.insert(rep);
        self
    }

    /// Insert `rep`, replacing any representation of the same kind.
    pub fn insert(&mut self, rep: Representation) {
        let kind = rep.kind();
        if let Some(slot) = self.reps.iter_mut().find(|r| r.kind() == kind) {
            *slot = rep;
        } else {
            self.reps.push(rep);
            self.reps.sort_by_key(Representation::kind);
        }
    }

    /// Representation of `kind`, if present.
    #[must_use]
    pub fn get(&self, kind: RepresentationKind) -> Option<&Representation> {
        self.reps.iter().find(|r| r.kind() == kind)
    }

    /// Representations in canonical kind order.
    pub fn iter(&self) -> impl Iterator<Item = &Representation> {
        self.reps.iter()
    }

    /// Whether no representation is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reps.is_empty()
    }

    /// Flags equal to the kinds present in this spec.
    #[must_use]
    pub fn flags(&self) -> StyleFlags {
        let mut flags = StyleFlags::none();
        for rep in &self.reps {
            flags.set(rep.kind(), true);
        }
        flags
    }

    /// Resolve `flags` against the per-kind option records of `template`.
    ///
    /// Kinds missing from the template use their defaults.
    #[must_use]
    pub fn resolve(flags: &StyleFlags, template: &Self) -> Self {
        let mut spec = Self::new();
        for kind in flags.active_kinds() {
            let rep = template
                .get(kind)
                .cloned()
                .unwrap_or_else(|| Representation::default_for(kind));
            spec.insert(rep);
        }
        spec
    }

    /// Parse a py3dmol-style style map such as
    /// `{"stick": {"radius": 0.2}, "sphere": {"scale": 0.3}}`.
    ///
    /// Unknown keys are ignored.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let mut spec = Self::new();
        let Some(map) = value.as_object() else {
            log::debug!("style map is not an object: {value}");
            return spec;
        };
        for (key, options) in map {
            match RepresentationKind::from_key(key) {
                Some(kind) => {
                    spec.insert(Representation::from_json(kind, options));
                }
                None => log::debug!("ignoring unknown style key '{key}'"),
            }
        }
        spec
    }

    /// The style map handed to the viewer.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .reps
            .iter()
            .map(|rep| (rep.kind().key().to_owned(), rep.options_json()))
            .collect();
        Value::Object(map)
    }
}
