use std::collections::{HashMap, VecDeque};

use crate::model::action::{ActionDescriptor, ActionKind};
use crate::model::screen::ScreenId;

/// How many attempted actions are remembered per screen.
const HISTORY_LEN: usize = 12;

#[derive(Debug, Clone)]
pub struct LoopGuardConfig {
    /// Identical (kind, target) proposals tolerated per screen before the
    /// guard substitutes a fallback action.
    pub max_same_action_repeat: u32,
    /// Consecutive no-effect steps tolerated before the fallback sequence
    /// takes over entirely.
    pub max_consecutive_no_op: u32,
    /// Length of the forced fallback burst once no-op tolerance is exceeded.
    pub max_fallback_burst: u32,
    /// Cyclic sequence of deterministic escape actions.
    pub fallback_sequence: Vec<ActionKind>,
}

impl Default for LoopGuardConfig {
    fn default() -> Self {
        Self {
            max_same_action_repeat: 3,
            max_consecutive_no_op: 3,
            max_fallback_burst: 3,
            fallback_sequence: vec![ActionKind::Back, ActionKind::ScrollDown, ActionKind::ScrollUp],
        }
    }
}

/// Why the guard rewrote a proposal, if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    PassedThrough,
    RepeatSubstituted,
    ForcedFallback,
}

/// Detects repetitive behavior and overrides the oracle with a deterministic
/// fallback sequence. Pure policy over counters: given the same recorded
/// history it always produces the same output.
pub struct LoopGuard {
    cfg: LoopGuardConfig,
    history: HashMap<ScreenId, VecDeque<(ActionKind, Option<String>)>>,
    consecutive_no_op: u32,
    forced_remaining: u32,
    fallback_index: usize,
}

impl LoopGuard {
    pub fn new(cfg: LoopGuardConfig) -> Self {
        Self {
            cfg,
            history: HashMap::new(),
            consecutive_no_op: 0,
            forced_remaining: 0,
            fallback_index: 0,
        }
    }

    /// Inspect a proposed action for the given screen; return it unchanged or
    /// substitute the next fallback action.
    pub fn guard(&mut self, screen: ScreenId, proposed: ActionDescriptor) -> ActionDescriptor {
        self.guard_with_verdict(screen, proposed).0
    }

    pub fn guard_with_verdict(
        &mut self,
        screen: ScreenId,
        proposed: ActionDescriptor,
    ) -> (ActionDescriptor, GuardVerdict) {
        if self.forced_remaining > 0 {
            self.forced_remaining -= 1;
            return (self.next_fallback(), GuardVerdict::ForcedFallback);
        }

        if self.consecutive_no_op >= self.cfg.max_consecutive_no_op {
            // Enter a fallback burst; this call consumes the first slot.
            self.forced_remaining = self.cfg.max_fallback_burst.saturating_sub(1);
            return (self.next_fallback(), GuardVerdict::ForcedFallback);
        }

        let key = proposed.repeat_key();
        let repeats = self
            .history
            .get(&screen)
            .map(|h| h.iter().filter(|k| **k == key).count() as u32)
            .unwrap_or(0);

        if repeats >= self.cfg.max_same_action_repeat {
            return (self.next_fallback(), GuardVerdict::RepeatSubstituted);
        }

        (proposed, GuardVerdict::PassedThrough)
    }

    /// Record an action that was actually attempted from a screen.
    pub fn record_action(&mut self, screen: ScreenId, action: &ActionDescriptor) {
        let history = self.history.entry(screen).or_default();
        if history.len() == HISTORY_LEN {
            history.pop_front();
        }
        history.push_back(action.repeat_key());
    }

    /// Record whether the attempted action changed screen identity. An
    /// effective transition resets the no-op counter and the fallback cursor.
    pub fn record_outcome(&mut self, effective: bool) {
        if effective {
            self.consecutive_no_op = 0;
            self.forced_remaining = 0;
            self.fallback_index = 0;
        } else {
            self.consecutive_no_op += 1;
        }
    }

    pub fn consecutive_no_op(&self) -> u32 {
        self.consecutive_no_op
    }

    fn next_fallback(&mut self) -> ActionDescriptor {
        // The sequence is validated non-empty at config build time; guard
        // against an empty list anyway by falling back to `back`.
        let kind = self
            .cfg
            .fallback_sequence
            .get(self.fallback_index % self.cfg.fallback_sequence.len().max(1))
            .copied()
            .unwrap_or(ActionKind::Back);
        self.fallback_index += 1;
        ActionDescriptor::gesture(kind)
    }
}
