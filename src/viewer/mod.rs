//! The external viewer seam.
//!
//! [`ViewerHandle`] and [`ViewerFactory`] abstract the rendering library;
//! [`ViewerBridge`] owns the single handle and projects widget state onto
//! it. [`RecordingFactory`] is an in-memory implementation that logs calls.

mod bridge;
mod handle;
mod recording;

pub use bridge::ViewerBridge;
pub use handle::{AnimateOptions, ViewerConfig, ViewerFactory, ViewerHandle};
pub use recording::{RecordingFactory, RecordingViewer, ViewerCall};
