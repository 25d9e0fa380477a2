// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (clippy default thresholds)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Core of an embeddable 3Dmol.js molecular viewer widget.
//!
//! The widget keeps a set of observable parameters (structure, style,
//! labels, frame, playback) and projects every change onto one external
//! viewer. Trajectories play back through a timer-driven state machine that
//! never echoes a frame the viewer reported back to it.
//!
//! # Key entry points
//!
//! - [`widget::Mol3dViewer`] - the chainable host-facing widget
//! - [`params::ParamStore`] - observable parameters with change origins
//! - [`viewer::ViewerHandle`] / [`viewer::ViewerFactory`] - the external
//!   viewer seam, with [`viewer::RecordingFactory`] as an in-memory double
//! - [`labels`] - atom-site extraction for XYZ, PDB and SDF/MOL text
//! - [`animation::AnimationSynchronizer`] - playback state machine
//! - [`options::Options`] - TOML presets and JSON schema
//!
//! # Architecture
//!
//! Host calls mutate the [`params::ParamStore`], which notifies observers
//! synchronously and returns the changes it made. The widget turns each
//! change batch into viewer calls through [`viewer::ViewerBridge`]. Time is
//! driven by the host: either [`widget::Mol3dViewer::tick`] from a render
//! loop or [`widget::Mol3dViewer::fire_timer`] from a browser interval. The
//! `web` feature binds the seam to `$3Dmol` through wasm-bindgen.

pub mod animation;
pub mod error;
pub mod labels;
pub mod options;
pub mod params;
pub mod session;
pub mod structure;
pub mod style;
pub mod viewer;
#[cfg(feature = "web")]
pub mod web;
pub mod widget;

pub use animation::{LoopMode, PlaybackState, PlaybackStrategy, TimerId};
pub use error::Mol3dError;
pub use labels::{atom_count, atom_sites, auto_labels, AtomSite, Label, LabelStyle, LabelText};
pub use options::Options;
pub use params::{ChangeQueue, Origin, Param, ParamChange, ParamStore};
pub use session::{Session, UploadedFile};
pub use structure::{
    count_xyz_frames, join_frames, split_xyz_frames, FileFormat, Structure,
};
pub use style::{Representation, RepresentationKind, StyleFlags, StyleSpec};
pub use viewer::{
    RecordingFactory, ViewerBridge, ViewerCall, ViewerConfig, ViewerFactory,
    ViewerHandle,
};
pub use widget::{Mol3dViewer, Mol3dViewerBuilder};
