//! In-memory viewer that records every call.
//!
//! Used as the test double throughout the crate and by the CLI's headless
//! `play` command. Factory and handles share one call log, so a clone of
//! the factory kept outside the widget can inspect what the widget did.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use super::handle::{AnimateOptions, ViewerConfig, ViewerFactory, ViewerHandle};
use crate::error::Mol3dError;

/// One recorded viewer call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum ViewerCall {
    /// Viewer created.
    Create {
        /// Host surface id.
        surface: String,
        /// Initial background color.
        background_color: String,
    },
    /// Single model added.
    AddModel {
        /// Format tag.
        format: String,
        /// Payload size.
        bytes: usize,
    },
    /// Multi-frame model added.
    AddModelsAsFrames {
        /// Format tag.
        format: String,
        /// Payload size.
        bytes: usize,
    },
    /// Models and labels removed.
    Clear,
    /// Style applied.
    SetStyle {
        /// Style map.
        style: Value,
    },
    /// Background changed.
    SetBackgroundColor {
        /// New color.
        color: String,
    },
    /// Camera fitted.
    ZoomTo,
    /// Redraw.
    Render,
    /// Successful seek.
    SetFrame {
        /// Frame shown.
        index: usize,
    },
    /// Label added.
    AddLabel {
        /// Label text.
        text: String,
    },
    /// Labels removed.
    RemoveAllLabels,
    /// Native loop started.
    Animate {
        /// Loop options.
        options: Value,
    },
    /// Native loop stopped.
    StopAnimate,
}

#[derive(Debug, Default)]
struct Shared {
    calls: Vec<ViewerCall>,
    created: usize,
    frame: usize,
    animating: bool,
    fail_seeks: bool,
}

/// Factory producing [`RecordingViewer`]s that share one call log.
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    shared: Rc<RefCell<Shared>>,
}

impl RecordingFactory {
    /// Snapshot of every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ViewerCall> {
        self.shared.borrow().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.shared.borrow_mut().calls.clear();
    }

    /// Indices of every successful seek, in order.
    #[must_use]
    pub fn frames_shown(&self) -> Vec<usize> {
        self.shared
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                ViewerCall::SetFrame { index } => Some(*index),
                _ => None,
            })
            .collect()
    }

    /// Number of handles created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.shared.borrow().created
    }

    /// Make every subsequent seek fail.
    pub fn fail_seeks(&self, fail: bool) {
        self.shared.borrow_mut().fail_seeks = fail;
    }

    /// Frame the viewer claims to show, as if its own loop had moved.
    pub fn set_viewer_frame(&self, frame: usize) {
        self.shared.borrow_mut().frame = frame;
    }

    /// Whether the native loop is running.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.shared.borrow().animating
    }
}

impl ViewerFactory for RecordingFactory {
    type Handle = RecordingViewer;

    fn create_viewer(
        &mut self,
        surface: &str,
        config: &ViewerConfig,
    ) -> Result<RecordingViewer, Mol3dError> {
        let mut shared = self.shared.borrow_mut();
        shared.created += 1;
        shared.calls.push(ViewerCall::Create {
            surface: surface.to_owned(),
            background_color: config.background_color.clone(),
        });
        Ok(RecordingViewer {
            shared: Rc::clone(&self.shared),
        })
    }
}

/// Handle produced by [`RecordingFactory`].
#[derive(Debug)]
pub struct RecordingViewer {
    shared: Rc<RefCell<Shared>>,
}

impl RecordingViewer {
    fn push(&self, call: ViewerCall) {
        self.shared.borrow_mut().calls.push(call);
    }
}

impl ViewerHandle for RecordingViewer {
    fn add_model(&mut self, text: &str, format: &str) -> Result<(), Mol3dError> {
        self.shared.borrow_mut().frame = 0;
        self.push(ViewerCall::AddModel {
            format: format.to_owned(),
            bytes: text.len(),
        });
        Ok(())
    }

    fn add_models_as_frames(
        &mut self,
        text: &str,
        format: &str,
    ) -> Result<(), Mol3dError> {
        self.shared.borrow_mut().frame = 0;
        self.push(ViewerCall::AddModelsAsFrames {
            format: format.to_owned(),
            bytes: text.len(),
        });
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Mol3dError> {
        self.push(ViewerCall::Clear);
        Ok(())
    }

    fn set_style(&mut self, style: &Value) -> Result<(), Mol3dError> {
        self.push(ViewerCall::SetStyle {
            style: style.clone(),
        });
        Ok(())
    }

    fn set_background_color(&mut self, color: &str) -> Result<(), Mol3dError> {
        self.push(ViewerCall::SetBackgroundColor {
            color: color.to_owned(),
        });
        Ok(())
    }

    fn zoom_to(&mut self) -> Result<(), Mol3dError> {
        self.push(ViewerCall::ZoomTo);
        Ok(())
    }

    fn render(&mut self) -> Result<(), Mol3dError> {
        self.push(ViewerCall::Render);
        Ok(())
    }

    fn set_frame(&mut self, index: usize) -> Result<(), Mol3dError> {
        let mut shared = self.shared.borrow_mut();
        if shared.fail_seeks {
            return Err(Mol3dError::viewer(format!("cannot show frame {index}")));
        }
        shared.frame = index;
        shared.calls.push(ViewerCall::SetFrame { index });
        Ok(())
    }

    fn get_frame(&self) -> Result<usize, Mol3dError> {
        Ok(self.shared.borrow().frame)
    }

    fn add_label(
        &mut self,
        text: &str,
        _options: &Value,
    ) -> Result<(), Mol3dError> {
        self.push(ViewerCall::AddLabel {
            text: text.to_owned(),
        });
        Ok(())
    }

    fn remove_all_labels(&mut self) -> Result<(), Mol3dError> {
        self.push(ViewerCall::RemoveAllLabels);
        Ok(())
    }

    fn animate(&mut self, options: &AnimateOptions) -> Result<(), Mol3dError> {
        self.shared.borrow_mut().animating = true;
        self.push(ViewerCall::Animate {
            options: options.to_json(),
        });
        Ok(())
    }

    fn stop_animate(&mut self) -> Result<(), Mol3dError> {
        self.shared.borrow_mut().animating = false;
        self.push(ViewerCall::StopAnimate);
        Ok(())
    }
}
