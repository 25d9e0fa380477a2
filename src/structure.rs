//! Structure text, format tags, and multi-frame XYZ helpers.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

/// Molecular file format tag passed to the viewer's model loader.
///
/// The four named formats are understood by the label extractor; any other
/// tag is forwarded verbatim to the viewer (which may know it) and yields
/// no labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileFormat {
    /// XYZ: atom count, comment, `element x y z` lines.
    #[default]
    Xyz,
    /// Protein Data Bank fixed-column records.
    Pdb,
    /// MDL structure-data file.
    Sdf,
    /// MDL molfile.
    Mol,
    /// Any other format name, lowercased.
    Other(String),
}

impl FileFormat {
    /// The lowercase name the viewer expects.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Xyz => "xyz",
            Self::Pdb => "pdb",
            Self::Sdf => "sdf",
            Self::Mol => "mol",
            Self::Other(name) => name,
        }
    }

    /// Format from a file name's extension (`"water.XYZ"` → `Xyz`).
    ///
    /// Returns `None` when the name has no extension.
    #[must_use]
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (stem, ext) = filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(Self::from(ext))
    }

    /// Whether concatenated single-structure blocks of this format can be
    /// loaded as animation frames.
    #[must_use]
    pub fn supports_concatenated_frames(&self) -> bool {
        matches!(self, Self::Xyz)
    }
}

impl From<&str> for FileFormat {
    fn from(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "xyz" => Self::Xyz,
            "pdb" | "ent" => Self::Pdb,
            "sdf" | "sd" => Self::Sdf,
            "mol" => Self::Mol,
            _ => Self::Other(lower),
        }
    }
}

impl From<String> for FileFormat {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<FileFormat> for String {
    fn from(format: FileFormat) -> Self {
        format.as_str().to_owned()
    }
}

impl JsonSchema for FileFormat {
    fn schema_name() -> Cow<'static, str> {
        "FileFormat".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "string",
            "examples": ["xyz", "pdb", "sdf", "mol"]
        })
    }
}

impl FromStr for FileFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw structure text plus its format tag. Replaced wholesale on load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Structure {
    /// File contents as loaded (possibly several concatenated frames).
    pub text: String,
    /// Format of `text`.
    pub format: FileFormat,
}

impl Structure {
    /// Structure from text and format.
    #[must_use]
    pub fn new(text: impl Into<String>, format: FileFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    /// Whether there is anything to display.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Split a concatenated multi-frame XYZ text into per-frame slices.
///
/// A frame starts at a line holding only an integer atom count and spans
/// `count + 2` lines. Lines that do not start a frame are skipped, so
/// stray blank lines between frames are tolerated. A truncated trailing
/// frame is kept as-is.
#[must_use]
pub fn split_xyz_frames(text: &str) -> Vec<&str> {
    let starts = line_offsets(text);
    let mut frames = Vec::new();
    let mut i = 0;
    while i < starts.len() {
        let (start, line) = starts[i];
        let Ok(count) = line.trim().parse::<usize>() else {
            i += 1;
            continue;
        };
        let end_line = (i + count + 2).min(starts.len());
        let end = if end_line < starts.len() {
            starts[end_line].0
        } else {
            text.len()
        };
        frames.push(text[start..end].trim_end_matches(['\r', '\n']));
        i = end_line.max(i + 1);
    }
    frames
}

/// Number of frames in a concatenated XYZ text (at least 1 for non-empty
/// text that contains no recognizable frame header).
#[must_use]
pub fn count_xyz_frames(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }
    split_xyz_frames(text).len().max(1)
}

/// Join per-frame texts into one payload for multi-frame loading.
#[must_use]
pub fn join_frames<S: AsRef<str>>(frames: &[S]) -> String {
    let mut out = String::new();
    for frame in frames {
        let frame = frame.as_ref().trim_end_matches(['\r', '\n']);
        out.push_str(frame);
        out.push('\n');
    }
    out
}

/// `(byte offset, line)` for every line of `text`.
fn line_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n')
        .map(|raw| {
            let start = offset;
            offset += raw.len();
            (start, raw.trim_end_matches(['\r', '\n']))
        })
        .collect()
}
