use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::action::ActionKind;

/// Arena index of a deduplicated screen. Stable for the lifetime of a run;
/// transitions reference ids, never live screen objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenId(pub usize);

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// A deduplicated screen as known to the store.
///
/// `visit_count` is mutated only by the store; everything else is fixed at
/// first encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenState {
    pub id: ScreenId,
    pub composite_hash: String,
    pub structural_hash: String,
    pub perceptual_hash: u64,
    pub visit_count: u32,
    pub first_seen_step: u64,
}

/// How a crawl step ended. One of these is attached to every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutcome {
    Success { screen_changed: bool },
    OracleFailed { message: String },
    MappingFailed { reason: String },
    ExecutionFailed { message: String },
    BackendUnavailable,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success { .. })
    }
}

/// One recorded crawl step: which screen it started from, where it landed
/// (if anywhere stable), and what was attempted. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub from: ScreenId,
    pub to: Option<ScreenId>,
    pub action_kind: Option<ActionKind>,
    pub action: String,
    pub step: u64,
    pub timestamp_ms: u128,
    pub outcome: StepOutcome,
}
