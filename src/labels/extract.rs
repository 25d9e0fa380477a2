//! Atom-site extraction from structure text.
//!
//! Only the coordinates and element symbol are read; everything else in
//! the file is the viewer's business. Column ranges are 0-indexed and
//! half-open.

use std::str::Lines;

use glam::Vec3;
use serde::Serialize;

use crate::structure::FileFormat;

/// PDB coordinate columns (x, y, z).
const PDB_X: std::ops::Range<usize> = 30..38;
const PDB_Y: std::ops::Range<usize> = 38..46;
const PDB_Z: std::ops::Range<usize> = 46..54;
/// PDB element symbol columns.
const PDB_ELEMENT: std::ops::Range<usize> = 76..78;
/// PDB atom name columns (element fallback).
const PDB_ATOM_NAME: std::ops::Range<usize> = 12..16;
/// Shortest PDB atom record that still holds all three coordinates.
const PDB_MIN_WIDTH: usize = 54;

/// MDL counts line index and atom block start.
const MDL_COUNTS_LINE: usize = 3;
const MDL_ATOM_BLOCK: usize = 4;
/// MDL fixed-width coordinate field width.
const MDL_COORD_WIDTH: usize = 10;
/// MDL element symbol columns (after the three coordinate fields).
const MDL_ELEMENT: std::ops::Range<usize> = 30..34;

/// One atom's element symbol and position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomSite {
    /// Element symbol as written in the file.
    pub element: String,
    /// Cartesian position in Å.
    pub position: Vec3,
}

impl AtomSite {
    /// Site from an element symbol and coordinates.
    #[must_use]
    pub fn new(element: impl Into<String>, x: f32, y: f32, z: f32) -> Self {
        Self {
            element: element.into(),
            position: Vec3::new(x, y, z),
        }
    }
}

/// Lazy, restartable iterator over the atom sites of a structure.
///
/// Cloning the iterator restarts nothing; clone it *before* consuming to
/// walk the sites again.
#[derive(Debug, Clone)]
pub struct AtomSites<'a> {
    inner: Inner<'a>,
}

#[derive(Debug, Clone)]
enum Inner<'a> {
    /// Remaining atom lines of an XYZ frame.
    Xyz { lines: Lines<'a>, remaining: usize },
    /// All lines of a PDB file.
    Pdb { lines: Lines<'a> },
    /// Remaining atom lines of an MDL atom block.
    Mdl { lines: Lines<'a>, remaining: usize },
    Empty,
}

impl Iterator for AtomSites<'_> {
    type Item = AtomSite;

    fn next(&mut self) -> Option<AtomSite> {
        match &mut self.inner {
            Inner::Xyz { lines, remaining } => {
                while *remaining > 0 {
                    *remaining -= 1;
                    let line = lines.next()?;
                    if let Some(site) = parse_xyz_atom(line) {
                        return Some(site);
                    }
                }
                None
            }
            Inner::Pdb { lines } => lines.find_map(parse_pdb_atom),
            Inner::Mdl { lines, remaining } => {
                while *remaining > 0 {
                    *remaining -= 1;
                    let line = lines.next()?;
                    if let Some(site) = parse_mdl_atom(line) {
                        return Some(site);
                    }
                }
                None
            }
            Inner::Empty => None,
        }
    }
}

/// Atom sites of `text` interpreted as `format`.
///
/// Formats the extractor does not understand yield an empty sequence.
/// Malformed atom lines are skipped. For multi-frame XYZ text only the
/// first frame is read.
#[must_use]
pub fn atom_sites<'a>(text: &'a str, format: &FileFormat) -> AtomSites<'a> {
    let inner = match format {
        FileFormat::Xyz => xyz_sites(text),
        FileFormat::Pdb => Inner::Pdb {
            lines: text.lines(),
        },
        FileFormat::Sdf | FileFormat::Mol => mdl_sites(text),
        FileFormat::Other(name) => {
            log::debug!("no label extraction for format '{name}'");
            Inner::Empty
        }
    };
    AtomSites { inner }
}

/// Number of atoms declared by (XYZ, MDL) or present in (PDB) `text`.
///
/// `None` for formats without a known atom count or an unreadable header.
#[must_use]
pub fn atom_count(text: &str, format: &FileFormat) -> Option<usize> {
    match format {
        FileFormat::Xyz => text
            .lines()
            .find(|line| !line.trim().is_empty())
            .and_then(|line| line.trim().parse().ok()),
        FileFormat::Pdb => Some(
            text.lines()
                .filter(|line| is_pdb_atom_record(line))
                .count(),
        ),
        FileFormat::Sdf | FileFormat::Mol => mdl_atom_count(text),
        FileFormat::Other(_) => None,
    }
}

fn xyz_sites(text: &str) -> Inner<'_> {
    let mut lines = text.lines();
    let Some(header) = lines.by_ref().find(|line| !line.trim().is_empty())
    else {
        return Inner::Empty;
    };
    let Ok(count) = header.trim().parse::<usize>() else {
        log::debug!("xyz header is not an atom count: '{header}'");
        return Inner::Empty;
    };
    // Comment line.
    let _ = lines.next();
    Inner::Xyz {
        lines,
        remaining: count,
    }
}

fn parse_xyz_atom(line: &str) -> Option<AtomSite> {
    let mut fields = line.split_whitespace();
    let element = fields.next()?;
    let x = fields.next()?.parse().ok()?;
    let y = fields.next()?.parse().ok()?;
    let z = fields.next()?.parse().ok()?;
    Some(AtomSite::new(element, x, y, z))
}

fn is_pdb_atom_record(line: &str) -> bool {
    line.starts_with("ATOM") || line.starts_with("HETATM")
}

fn parse_pdb_atom(line: &str) -> Option<AtomSite> {
    if !is_pdb_atom_record(line) || line.len() < PDB_MIN_WIDTH {
        return None;
    }
    let x = fixed_f32(line, PDB_X)?;
    let y = fixed_f32(line, PDB_Y)?;
    let z = fixed_f32(line, PDB_Z)?;
    let element = pdb_element(line)?;
    Some(AtomSite::new(element, x, y, z))
}

/// Element from columns 76–78, else the first letter of the atom name.
fn pdb_element(line: &str) -> Option<String> {
    if let Some(symbol) = line.get(PDB_ELEMENT).map(str::trim) {
        if !symbol.is_empty() {
            return Some(symbol.to_owned());
        }
    }
    line.get(PDB_ATOM_NAME)?
        .chars()
        .find(char::is_ascii_alphabetic)
        .map(String::from)
}

fn mdl_atom_count(text: &str) -> Option<usize> {
    let counts = text.lines().nth(MDL_COUNTS_LINE)?;
    let field = counts.get(0..3).unwrap_or(counts);
    field.trim().parse().ok()
}

fn mdl_sites(text: &str) -> Inner<'_> {
    let Some(count) = mdl_atom_count(text) else {
        log::debug!("MDL counts line missing or unreadable");
        return Inner::Empty;
    };
    let mut lines = text.lines();
    for _ in 0..MDL_ATOM_BLOCK {
        if lines.next().is_none() {
            return Inner::Empty;
        }
    }
    Inner::Mdl {
        lines,
        remaining: count,
    }
}

fn parse_mdl_atom(line: &str) -> Option<AtomSite> {
    let w = MDL_COORD_WIDTH;
    let x = fixed_f32(line, 0..w)?;
    let y = fixed_f32(line, w..2 * w)?;
    let z = fixed_f32(line, 2 * w..3 * w)?;
    let symbol = line
        .get(MDL_ELEMENT)
        .or_else(|| line.get(MDL_ELEMENT.start..))?
        .trim();
    if symbol.is_empty() {
        return None;
    }
    Some(AtomSite::new(symbol, x, y, z))
}

/// Parse a fixed-width decimal field.
fn fixed_f32(line: &str, range: std::ops::Range<usize>) -> Option<f32> {
    line.get(range)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATER: &str = "3\nWater\nO 0 0 0\nH 1 0 0\nH -1 0 0";

    const CAFFEINE_PDB: &str = "\
ATOM      1  N   CAF     1      -0.744   1.329   0.000  1.00  0.00           N
ATOM      2  C   CAF     1       0.558   1.875   0.000  1.00  0.00           C
HETATM    3 FE   HEM     2       1.657   1.080   0.000  1.00  0.00          FE
REMARK short line
ATOM      4  CA  GLY     3       1.657  -0.287   0.000";

    const METHANE_SDF: &str = "\
methane
  sketch

  2  1  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    0.6290    0.6290    0.6290 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
M  END
$$$$";

    #[test]
    fn water_xyz_yields_three_sites() {
        let sites: Vec<_> = atom_sites(WATER, &FileFormat::Xyz).collect();
        assert_eq!(
            sites,
            vec![
                AtomSite::new("O", 0.0, 0.0, 0.0),
                AtomSite::new("H", 1.0, 0.0, 0.0),
                AtomSite::new("H", -1.0, 0.0, 0.0),
            ]
        );
    }

    #[test]
    fn xyz_skips_malformed_lines_within_the_count() {
        let text = "\n\n3\ncomment\nO 0 0 0\nH 1 oops 0\nH 1\nC 9 9 9";
        let sites: Vec<_> = atom_sites(text, &FileFormat::Xyz).collect();
        assert_eq!(sites, vec![AtomSite::new("O", 0.0, 0.0, 0.0)]);
    }

    #[test]
    fn xyz_reads_only_the_first_frame() {
        let text = format!("{WATER}\n{WATER}");
        assert_eq!(atom_sites(&text, &FileFormat::Xyz).count(), 3);
    }

    #[test]
    fn pdb_reads_fixed_columns_and_element() {
        let sites: Vec<_> =
            atom_sites(CAFFEINE_PDB, &FileFormat::Pdb).collect();
        assert_eq!(sites.len(), 4);
        assert_eq!(sites[0], AtomSite::new("N", -0.744, 1.329, 0.0));
        assert_eq!(sites[2].element, "FE");
        // No element columns: fall back to the atom name.
        assert_eq!(sites[3], AtomSite::new("C", 1.657, -0.287, 0.0));
    }

    #[test]
    fn pdb_skips_short_records() {
        let text = "ATOM      1  N   CAF     1      -0.744   1.329";
        assert_eq!(atom_sites(text, &FileFormat::Pdb).count(), 0);
    }

    #[test]
    fn sdf_reads_atom_block() {
        let sites: Vec<_> = atom_sites(METHANE_SDF, &FileFormat::Sdf).collect();
        assert_eq!(
            sites,
            vec![
                AtomSite::new("C", 0.0, 0.0, 0.0),
                AtomSite::new("H", 0.629, 0.629, 0.629),
            ]
        );
        assert_eq!(atom_sites(METHANE_SDF, &FileFormat::Mol).count(), 2);
    }

    #[test]
    fn unknown_format_is_empty() {
        let format = FileFormat::from("cif");
        assert_eq!(atom_sites("data_1abc", &format).count(), 0);
        assert_eq!(atom_count("data_1abc", &format), None);
    }

    #[test]
    fn iterator_is_restartable_by_clone() {
        let sites = atom_sites(WATER, &FileFormat::Xyz);
        let again = sites.clone();
        assert_eq!(sites.count(), 3);
        assert_eq!(again.count(), 3);
    }

    #[test]
    fn atom_counts_per_format() {
        assert_eq!(atom_count(WATER, &FileFormat::Xyz), Some(3));
        assert_eq!(atom_count(CAFFEINE_PDB, &FileFormat::Pdb), Some(4));
        assert_eq!(atom_count(METHANE_SDF, &FileFormat::Sdf), Some(2));
        assert_eq!(atom_count("", &FileFormat::Xyz), None);
    }
}
