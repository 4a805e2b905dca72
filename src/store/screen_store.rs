use std::collections::HashMap;

use crate::hash::codec::{composite_hash, hash_distance};
use crate::model::screen::{ScreenId, ScreenState};

/// Result of identifying the current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identified {
    pub id: ScreenId,
    pub is_new: bool,
    pub visit_count: u32,
}

/// Deduplicating screen registry for one crawl session.
///
/// Screens live in a flat arena indexed by `ScreenId`; a primary map keyed by
/// composite hash gives the exact-match fast path, and a secondary index by
/// structural hash bounds the fuzzy scan to same-structure states only.
pub struct ScreenStore {
    states: Vec<ScreenState>,
    by_composite: HashMap<String, ScreenId>,
    by_structural: HashMap<String, Vec<ScreenId>>,
    similarity_threshold: u32,
}

impl ScreenStore {
    pub fn new(similarity_threshold: u32) -> Self {
        Self {
            states: Vec::new(),
            by_composite: HashMap::new(),
            by_structural: HashMap::new(),
            similarity_threshold,
        }
    }

    /// Identify the current screen and count the visit.
    ///
    /// Identity rule, in order:
    /// 1. exact composite-hash hit;
    /// 2. among states with the same structural hash, first whose perceptual
    ///    hash is within the similarity threshold (merge, first match wins;
    ///    visual jitter must not fragment one logical screen into many);
    /// 3. otherwise a new state with `visit_count = 1`.
    ///
    /// Never fails.
    pub fn identify(&mut self, structural: &str, perceptual: u64, step: u64) -> Identified {
        self.identify_inner(structural, perceptual, step, true)
    }

    /// Same identity rule as `identify`, but re-encounters do not increment
    /// the visit count. Used for the post-action re-identification so one
    /// physical visit is counted once per step.
    pub fn observe(&mut self, structural: &str, perceptual: u64, step: u64) -> Identified {
        self.identify_inner(structural, perceptual, step, false)
    }

    fn identify_inner(
        &mut self,
        structural: &str,
        perceptual: u64,
        step: u64,
        count_visit: bool,
    ) -> Identified {
        let composite = composite_hash(structural, perceptual);

        if let Some(&id) = self.by_composite.get(&composite) {
            return self.revisit(id, count_visit);
        }

        if let Some(candidates) = self.by_structural.get(structural) {
            let similar = candidates.iter().copied().find(|&id| {
                hash_distance(perceptual, self.states[id.0].perceptual_hash)
                    <= self.similarity_threshold
            });
            if let Some(id) = similar {
                return self.revisit(id, count_visit);
            }
        }

        let id = self.insert(structural, perceptual, composite, step, 1);
        Identified {
            id,
            is_new: true,
            visit_count: 1,
        }
    }

    fn revisit(&mut self, id: ScreenId, count_visit: bool) -> Identified {
        if count_visit {
            self.states[id.0].visit_count += 1;
        }
        Identified {
            id,
            is_new: false,
            visit_count: self.states[id.0].visit_count,
        }
    }

    fn insert(
        &mut self,
        structural: &str,
        perceptual: u64,
        composite: String,
        step: u64,
        visit_count: u32,
    ) -> ScreenId {
        let id = ScreenId(self.states.len());
        self.states.push(ScreenState {
            id,
            composite_hash: composite.clone(),
            structural_hash: structural.to_string(),
            perceptual_hash: perceptual,
            visit_count,
            first_seen_step: step,
        });
        self.by_composite.insert(composite, id);
        self.by_structural
            .entry(structural.to_string())
            .or_default()
            .push(id);
        id
    }

    /// Bootstrap the store from externally persisted screens (resume of an
    /// existing run). Seeded screens keep their recorded visit counts; a
    /// seed matching an already-known screen is ignored.
    pub fn seed(&mut self, screens: impl IntoIterator<Item = (String, u64, u32)>) {
        for (structural, perceptual, visit_count) in screens {
            let composite = composite_hash(&structural, perceptual);
            if self.by_composite.contains_key(&composite) {
                continue;
            }
            self.insert(&structural, perceptual, composite, 0, visit_count);
        }
    }

    pub fn get(&self, id: ScreenId) -> &ScreenState {
        &self.states[id.0]
    }

    pub fn visit_count(&self, id: ScreenId) -> u32 {
        self.states[id.0].visit_count
    }

    /// Number of unique screens discovered so far.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[ScreenState] {
        &self.states
    }
}
