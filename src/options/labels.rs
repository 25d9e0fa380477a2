use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::labels::{LabelStyle, LabelText};

#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[schemars(title = "Labels", inline)]
#[serde(default)]
/// Appearance of automatic atom labels.
pub struct LabelOptions {
    /// What each atom label shows.
    #[schemars(title = "Label Text")]
    pub text: LabelText,
    /// Font and background attributes.
    #[serde(flatten)]
    pub style: LabelStyle,
}
