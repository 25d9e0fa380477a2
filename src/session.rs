//! Per-session upload slots.
//!
//! A dashboard session keeps the files a user dropped (one per named slot,
//! e.g. "reactant" and "product") so they can be re-labelled or re-loaded
//! later without another upload.

use rustc_hash::FxHashMap;

use crate::error::Mol3dError;
use crate::labels::atom_count;
use crate::structure::FileFormat;
use crate::viewer::ViewerFactory;
use crate::widget::Mol3dViewer;

/// One uploaded structure file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Name the file was uploaded under.
    pub filename: String,
    /// Decoded contents.
    pub content: String,
    /// Format from the file extension.
    pub format: FileFormat,
    /// Atoms in the first frame, when the format is understood.
    pub atom_count: Option<usize>,
}

impl UploadedFile {
    /// Decode an upload. Invalid UTF-8 is replaced rather than rejected;
    /// a missing extension is treated as XYZ.
    #[must_use]
    pub fn from_bytes(filename: &str, bytes: &[u8]) -> Self {
        Self::from_text(filename, String::from_utf8_lossy(bytes).into_owned())
    }

    /// Wrap already-decoded text.
    #[must_use]
    pub fn from_text(filename: &str, content: String) -> Self {
        let format = FileFormat::from_filename(filename).unwrap_or_default();
        let atom_count = atom_count(&content, &format);
        Self {
            filename: filename.to_owned(),
            content,
            format,
            atom_count,
        }
    }
}

/// Named upload slots owned by one session.
#[derive(Debug, Default)]
pub struct Session {
    slots: FxHashMap<String, UploadedFile>,
}

impl Session {
    /// Empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `file` in `slot`, returning what was there.
    pub fn store(
        &mut self,
        slot: impl Into<String>,
        file: UploadedFile,
    ) -> Option<UploadedFile> {
        let slot = slot.into();
        log::info!(
            "{slot}: stored {} as {} ({} atoms)",
            file.filename,
            file.format,
            file.atom_count
                .map_or_else(|| "unknown".to_owned(), |n| n.to_string())
        );
        self.slots.insert(slot, file)
    }

    /// File in `slot`.
    #[must_use]
    pub fn get(&self, slot: &str) -> Option<&UploadedFile> {
        self.slots.get(slot)
    }

    /// Empty `slot`.
    pub fn remove(&mut self, slot: &str) -> Option<UploadedFile> {
        self.slots.remove(slot)
    }

    /// Occupied slot names, sorted.
    #[must_use]
    pub fn slots(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.slots.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Load the file in `slot` into `widget`.
    pub fn load_into<'w, F: ViewerFactory>(
        &self,
        slot: &str,
        widget: &'w mut Mol3dViewer<F>,
    ) -> Result<&'w mut Mol3dViewer<F>, Mol3dError> {
        let file = self
            .get(slot)
            .ok_or_else(|| Mol3dError::invalid(format!("slot '{slot}' is empty")))?;
        widget.load_model(file.content.clone(), file.format.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::RecordingFactory;

    const WATER: &str = "3\nWater\nO 0 0 0\nH 1 0 0\nH -1 0 0\n";

    #[test]
    fn upload_detects_format_and_atoms() {
        let file = UploadedFile::from_bytes("Water.XYZ", WATER.as_bytes());
        assert_eq!(file.format, FileFormat::Xyz);
        assert_eq!(file.atom_count, Some(3));
        assert_eq!(file.filename, "Water.XYZ");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut bytes = WATER.as_bytes().to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        let file = UploadedFile::from_bytes("w.xyz", &bytes);
        assert!(file.content.ends_with('\u{fffd}'));
        assert_eq!(file.atom_count, Some(3));
    }

    #[test]
    fn slots_replace_and_list() {
        let mut session = Session::new();
        let water = UploadedFile::from_text("w.xyz", WATER.to_owned());
        assert!(session.store("reactant", water.clone()).is_none());
        assert!(session.store("product", water.clone()).is_none());
        assert_eq!(session.store("reactant", water.clone()), Some(water));
        assert_eq!(session.slots(), ["product", "reactant"]);
        assert!(session.remove("product").is_some());
        assert_eq!(session.slots(), ["reactant"]);
    }

    #[test]
    fn load_into_widget() {
        let mut session = Session::new();
        let _ = session.store(
            "reactant",
            UploadedFile::from_text("w.xyz", WATER.to_owned()),
        );
        let mut widget = Mol3dViewer::new(RecordingFactory::default());
        let _ = session.load_into("reactant", &mut widget).unwrap();
        assert_eq!(widget.params().structure().text, WATER);
        assert!(matches!(
            session.load_into("product", &mut widget),
            Err(Mol3dError::InvalidParameter(_))
        ));
    }
}
