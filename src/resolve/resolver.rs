use serde::{Deserialize, Serialize};

use crate::model::action::{ActionDescriptor, ActionKind, BoundingBox};
use crate::model::ui_tree::{ScreenGeometry, UiNode};
use crate::resolve::target::{
    CoordinateSource, ElementHandle, MatchStrategy, ResolvedTarget, UnresolvableReason,
};

/// What to do with a bounding-box center that falls outside the safe margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeHandling {
    /// Snap to the nearest in-bounds point.
    Snap,
    /// Refuse the coordinate fallback.
    Reject,
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Enables the cheap resource-id "contains" strategy.
    pub cheap_matching: bool,
    /// Enables the expensive fuzzy text strategy at the end of the chain.
    pub expensive_matching: bool,
    /// Tap the bounding-box center when no element strategy matches.
    pub coordinate_fallback: bool,
    /// Fraction of each screen dimension kept as a no-tap margin.
    pub margin_ratio: f64,
    pub edge_handling: EdgeHandling,
    /// Per-strategy cap on candidate nodes examined.
    pub max_strategy_candidates: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cheap_matching: true,
            expensive_matching: false,
            coordinate_fallback: true,
            margin_ratio: 0.05,
            edge_handling: EdgeHandling::Snap,
            max_strategy_candidates: 256,
        }
    }
}

/// Maps an abstract action intent to a concrete element or coordinate.
///
/// The chain is an ordered list of pure matchers folded until the first hit;
/// a miss in one strategy never aborts the chain (no control flow through
/// errors).
pub struct ActionResolver {
    cfg: ResolverConfig,
}

type Matcher = fn(&str, &UiNode) -> bool;

impl ActionResolver {
    pub fn new(cfg: ResolverConfig) -> Self {
        Self { cfg }
    }

    pub fn resolve(
        &self,
        action: &ActionDescriptor,
        tree: &UiNode,
        geometry: ScreenGeometry,
    ) -> ResolvedTarget {
        debug_assert!(action.kind.needs_target(), "gestures are not resolved");

        if action.target_identifier.is_none() && action.bounding_box.is_none() {
            return ResolvedTarget::Unresolvable(UnresolvableReason::NoTarget);
        }

        if let Some(identifier) = action.target_identifier.as_deref() {
            if let Some((strategy, index, node)) = self.run_chain(identifier, tree) {
                // Input is only valid against editable elements. A match that
                // fails this check is a validation failure, not a matching
                // failure, so the coordinate fallback does not apply.
                if action.kind == ActionKind::Input && !node.editable {
                    return ResolvedTarget::Unresolvable(UnresolvableReason::NotEditable);
                }
                return ResolvedTarget::Element {
                    strategy,
                    handle: ElementHandle::from_node(index, node),
                };
            }
        }

        if self.cfg.coordinate_fallback {
            if let Some(bbox) = action.bounding_box {
                return self.coordinate_from_box(bbox, geometry);
            }
        }

        ResolvedTarget::Unresolvable(UnresolvableReason::NoMatch)
    }

    /// Fold over the strategy chain, stopping at the first match.
    fn run_chain<'a>(
        &self,
        identifier: &str,
        tree: &'a UiNode,
    ) -> Option<(MatchStrategy, usize, &'a UiNode)> {
        let nodes = tree.flatten();

        let chain: [(MatchStrategy, bool, Matcher); 7] = [
            (MatchStrategy::ExactId, true, match_exact_id),
            (MatchStrategy::IdContains, self.cfg.cheap_matching, match_id_contains),
            (MatchStrategy::ExactLabel, true, match_exact_label),
            (MatchStrategy::TextContains, true, match_text_contains),
            (MatchStrategy::LabelContains, true, match_label_contains),
            (MatchStrategy::ClassContains, true, match_class_contains),
            (MatchStrategy::FuzzyText, self.cfg.expensive_matching, match_fuzzy_text),
        ];

        for (strategy, enabled, matcher) in chain {
            if !enabled {
                continue;
            }
            let hit = nodes
                .iter()
                .enumerate()
                .take(self.cfg.max_strategy_candidates)
                .find(|(_, node)| node.enabled && matcher(identifier, node));
            if let Some((index, node)) = hit {
                return Some((strategy, index, node));
            }
        }
        None
    }

    fn coordinate_from_box(&self, bbox: BoundingBox, geometry: ScreenGeometry) -> ResolvedTarget {
        let (cx, cy) = bbox.center();
        let (w, h) = (geometry.width as f64, geometry.height as f64);

        let min_x = self.cfg.margin_ratio * w;
        let max_x = (1.0 - self.cfg.margin_ratio) * w;
        let min_y = self.cfg.margin_ratio * h;
        let max_y = (1.0 - self.cfg.margin_ratio) * h;

        let in_bounds = (min_x..=max_x).contains(&cx) && (min_y..=max_y).contains(&cy);
        if in_bounds {
            return ResolvedTarget::Coordinate {
                x: cx as u32,
                y: cy as u32,
                source: CoordinateSource::BoxCenter,
            };
        }

        match self.cfg.edge_handling {
            EdgeHandling::Snap => ResolvedTarget::Coordinate {
                x: cx.clamp(min_x, max_x) as u32,
                y: cy.clamp(min_y, max_y) as u32,
                source: CoordinateSource::SnappedBoxCenter,
            },
            EdgeHandling::Reject => ResolvedTarget::Unresolvable(UnresolvableReason::OutOfBounds),
        }
    }
}

// ============================================================================
// Strategy matchers
// ============================================================================

fn match_exact_id(identifier: &str, node: &UiNode) -> bool {
    node.resource_id.as_deref() == Some(identifier)
}

fn match_id_contains(identifier: &str, node: &UiNode) -> bool {
    node.resource_id
        .as_deref()
        .is_some_and(|id| id.contains(identifier))
}

fn match_exact_label(identifier: &str, node: &UiNode) -> bool {
    node.content_desc.as_deref() == Some(identifier)
}

fn match_text_contains(identifier: &str, node: &UiNode) -> bool {
    contains_ci(node.text.as_deref(), identifier)
}

fn match_label_contains(identifier: &str, node: &UiNode) -> bool {
    contains_ci(node.content_desc.as_deref(), identifier)
}

fn match_class_contains(identifier: &str, node: &UiNode) -> bool {
    contains_ci(node.class.as_deref(), identifier)
}

/// All identifier tokens present somewhere in the node text, any order.
fn match_fuzzy_text(identifier: &str, node: &UiNode) -> bool {
    let Some(text) = node.text.as_deref() else {
        return false;
    };
    let haystack = text.to_lowercase();
    let mut tokens = identifier.split_whitespace().peekable();
    if tokens.peek().is_none() {
        return false;
    }
    tokens.all(|token| haystack.contains(&token.to_lowercase()))
}

fn contains_ci(value: Option<&str>, needle: &str) -> bool {
    value.is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase()))
}
