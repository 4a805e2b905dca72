use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::codec::GrayImage;
use crate::model::action::{ActionDescriptor, ActionKind};
use crate::resolve::target::{ElementHandle, ResolvedTarget};

/// Retry classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Timeouts and connection resets, worth retrying.
    Transient,
    /// Invalid action or element gone; retrying cannot help.
    Permanent,
}

/// Failure reported by the device-action backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub class: ErrorClass,
    pub message: String,
}

impl BackendError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self { class: ErrorClass::Transient, message: message.into() }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self { class: ErrorClass::Permanent, message: message.into() }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            ErrorClass::Transient => "transient",
            ErrorClass::Permanent => "permanent",
        };
        write!(f, "backend error ({}): {}", class, self.message)
    }
}

impl Error for BackendError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwipeDirection {
    Left,
    Right,
}

/// Primitive command the device backend can perform, derived from a resolved
/// target plus the original action intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceCommand {
    TapElement(ElementHandle),
    LongPressElement(ElementHandle),
    TapPoint { x: u32, y: u32 },
    InputText { target: ElementHandle, text: String },
    InputAtPoint { x: u32, y: u32, text: String },
    Scroll(ScrollDirection),
    Swipe(SwipeDirection),
    Back,
}

impl DeviceCommand {
    /// Combine an action intent with its resolved target. Gestures need no
    /// target; element/coordinate actions embed theirs. Returns `None` for
    /// the combinations the resolver is specified to reject (e.g. input
    /// resolved to a bare coordinate without text).
    pub fn from_resolution(action: &ActionDescriptor, target: Option<&ResolvedTarget>) -> Option<Self> {
        match action.kind {
            ActionKind::Back => return Some(DeviceCommand::Back),
            ActionKind::ScrollUp => return Some(DeviceCommand::Scroll(ScrollDirection::Up)),
            ActionKind::ScrollDown => return Some(DeviceCommand::Scroll(ScrollDirection::Down)),
            ActionKind::SwipeLeft => return Some(DeviceCommand::Swipe(SwipeDirection::Left)),
            ActionKind::SwipeRight => return Some(DeviceCommand::Swipe(SwipeDirection::Right)),
            ActionKind::Tap | ActionKind::Input | ActionKind::LongPress => {}
        }

        match target? {
            ResolvedTarget::Element { handle, .. } => match action.kind {
                ActionKind::Tap => Some(DeviceCommand::TapElement(handle.clone())),
                ActionKind::LongPress => Some(DeviceCommand::LongPressElement(handle.clone())),
                ActionKind::Input => Some(DeviceCommand::InputText {
                    target: handle.clone(),
                    text: action.input_text.clone().unwrap_or_default(),
                }),
                _ => None,
            },
            ResolvedTarget::Coordinate { x, y, .. } => match action.kind {
                ActionKind::Tap | ActionKind::LongPress => {
                    Some(DeviceCommand::TapPoint { x: *x, y: *y })
                }
                ActionKind::Input => Some(DeviceCommand::InputAtPoint {
                    x: *x,
                    y: *y,
                    text: action.input_text.clone().unwrap_or_default(),
                }),
                _ => None,
            },
            ResolvedTarget::Unresolvable(_) => None,
        }
    }
}

/// The device-action backend: performs primitive commands against a real or
/// simulated device. Error classification drives the retry policy.
pub trait DeviceBackend {
    /// Establish the backend connection. Default: nothing to do.
    fn connect(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Launch (or foreground) the application under crawl. Default: nothing
    /// to do.
    fn launch_app(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn execute(&mut self, command: &DeviceCommand) -> Result<(), BackendError>;
}

/// Failure to capture the current screen.
#[derive(Debug)]
pub struct CaptureError {
    pub message: String,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "screen capture failed: {}", self.message)
    }
}

impl Error for CaptureError {}

/// Raw screen observation: the serialized UI tree plus a screenshot.
#[derive(Debug, Clone)]
pub struct RawScreen {
    pub ui_tree_json: String,
    pub image: GrayImage,
}

/// Source of screen observations (screenshot + UI tree capture).
pub trait ScreenSource {
    fn capture(&mut self) -> Result<RawScreen, CaptureError>;
}
