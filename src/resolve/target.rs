use serde::{Deserialize, Serialize};

use crate::model::action::BoundingBox;
use crate::model::ui_tree::UiNode;

/// Which resolution strategy produced a match, in chain priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    ExactId,
    IdContains,
    ExactLabel,
    TextContains,
    LabelContains,
    ClassContains,
    FuzzyText,
}

/// A matched element, detached from the tree it came from. Carries enough
/// for the device backend to address it; computed fresh per step, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Index in the depth-first flattening of the tree.
    pub index: usize,
    pub resource_id: Option<String>,
    pub class: Option<String>,
    pub text: Option<String>,
    pub content_desc: Option<String>,
    pub bounds: Option<BoundingBox>,
}

impl ElementHandle {
    pub fn from_node(index: usize, node: &UiNode) -> Self {
        Self {
            index,
            resource_id: node.resource_id.clone(),
            class: node.class.clone(),
            text: node.text.clone(),
            content_desc: node.content_desc.clone(),
            bounds: node.bounds,
        }
    }
}

/// Where a fallback coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSource {
    BoxCenter,
    SnappedBoxCenter,
}

/// Why resolution produced no executable target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnresolvableReason {
    /// No strategy matched and no usable bounding box was available.
    NoMatch,
    /// An element matched but an input action requires it to be editable.
    NotEditable,
    /// The bounding-box center lies outside the safe margin and the
    /// edge-handling policy is `Reject`.
    OutOfBounds,
    /// The action needs a target but carried neither identifier nor box.
    NoTarget,
}

impl UnresolvableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnresolvableReason::NoMatch => "no_match",
            UnresolvableReason::NotEditable => "not_editable",
            UnresolvableReason::OutOfBounds => "out_of_bounds",
            UnresolvableReason::NoTarget => "no_target",
        }
    }
}

/// Outcome of resolving an action intent against the current UI tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolvedTarget {
    Element {
        strategy: MatchStrategy,
        handle: ElementHandle,
    },
    Coordinate {
        x: u32,
        y: u32,
        source: CoordinateSource,
    },
    Unresolvable(UnresolvableReason),
}

impl ResolvedTarget {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, ResolvedTarget::Unresolvable(_))
    }
}
