use serde::{Deserialize, Serialize};

/// The action vocabulary the oracle may propose and the device can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Tap,
    Input,
    ScrollUp,
    ScrollDown,
    SwipeLeft,
    SwipeRight,
    Back,
    LongPress,
}

impl ActionKind {
    /// Whether this action acts on a specific element (and therefore needs
    /// resolution). Gestures and `back` address the whole screen.
    pub fn needs_target(&self) -> bool {
        matches!(self, ActionKind::Tap | ActionKind::Input | ActionKind::LongPress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Tap => "tap",
            ActionKind::Input => "input",
            ActionKind::ScrollUp => "scroll_up",
            ActionKind::ScrollDown => "scroll_down",
            ActionKind::SwipeLeft => "swipe_left",
            ActionKind::SwipeRight => "swipe_right",
            ActionKind::Back => "back",
            ActionKind::LongPress => "long_press",
        }
    }
}

/// Axis-aligned rectangle in absolute screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Center point. Inverted corners are tolerated and swapped.
    pub fn center(&self) -> (f64, f64) {
        let (x1, x2) = if self.x1 <= self.x2 { (self.x1, self.x2) } else { (self.x2, self.x1) };
        let (y1, y2) = if self.y1 <= self.y2 { (self.y1, self.y2) } else { (self.y2, self.y1) };
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }
}

/// An abstract action intent: produced by the oracle, possibly rewritten by
/// the loop guard, consumed by the resolver.
///
/// `target_identifier` is a single opaque string: a resource id, an
/// accessibility label, or visible text; the resolver decides which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub kind: ActionKind,
    #[serde(default)]
    pub target_identifier: Option<String>,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub input_text: Option<String>,
}

impl ActionDescriptor {
    pub fn gesture(kind: ActionKind) -> Self {
        Self {
            kind,
            target_identifier: None,
            bounding_box: None,
            input_text: None,
        }
    }

    pub fn tap(identifier: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Tap,
            target_identifier: Some(identifier.into()),
            bounding_box: None,
            input_text: None,
        }
    }

    pub fn input(identifier: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Input,
            target_identifier: Some(identifier.into()),
            bounding_box: None,
            input_text: Some(text.into()),
        }
    }

    /// The repeat key the loop guard tracks: kind plus identifier.
    pub fn repeat_key(&self) -> (ActionKind, Option<String>) {
        (self.kind, self.target_identifier.clone())
    }

    /// Short human-readable description for logs and transition records.
    pub fn describe(&self) -> String {
        match (&self.target_identifier, &self.input_text) {
            (Some(target), Some(text)) => {
                format!("{} '{}' <- \"{}\"", self.kind.as_str(), target, text)
            }
            (Some(target), None) => format!("{} '{}'", self.kind.as_str(), target),
            (None, _) => self.kind.as_str().to_string(),
        }
    }
}
