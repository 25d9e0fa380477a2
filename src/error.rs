//! Crate-level error types.

use std::fmt;

/// Errors produced by the mol3d crate.
#[derive(Debug)]
pub enum Mol3dError {
    /// Out-of-bounds numeric input (frame index, frame count, speed).
    InvalidParameter(String),
    /// Requested operation is not supported for this structure format.
    UnsupportedFormat(String),
    /// The external viewer handle reported a failure.
    ExternalViewer(String),
    /// No viewer handle exists yet (`initialize` has not been called).
    NotInitialized,
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Generic I/O failure.
    Io(std::io::Error),
}

impl Mol3dError {
    /// Shorthand for an [`InvalidParameter`](Self::InvalidParameter) error.
    #[must_use]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Shorthand for an [`ExternalViewer`](Self::ExternalViewer) error.
    #[must_use]
    pub fn viewer(msg: impl Into<String>) -> Self {
        Self::ExternalViewer(msg.into())
    }
}

impl fmt::Display for Mol3dError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter(msg) => {
                write!(f, "invalid parameter: {msg}")
            }
            Self::UnsupportedFormat(msg) => {
                write!(f, "unsupported format: {msg}")
            }
            Self::ExternalViewer(msg) => write!(f, "viewer error: {msg}"),
            Self::NotInitialized => {
                write!(f, "viewer handle has not been initialized")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Mol3dError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Mol3dError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
