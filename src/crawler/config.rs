use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::guard::loop_guard::LoopGuardConfig;
use crate::model::action::ActionKind;
use crate::resilience::executor::RetryPolicy;
use crate::resolve::resolver::{EdgeHandling, ResolverConfig};

/// Whether the crawl budget is counted in steps or wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlMode {
    Steps,
    Time,
}

/// All tuning knobs of the engine, assembled once and passed immutably into
/// each component constructor. Nothing reads ambient global state, so tests
/// can vary thresholds per case.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub crawl_mode: CrawlMode,
    pub max_steps: u64,
    pub max_duration: Duration,

    /// Perceptual-hash distance within which two same-structure screens are
    /// considered the same logical screen.
    pub similarity_threshold: u32,

    pub max_same_action_repeat: u32,
    pub max_consecutive_no_op: u32,
    pub max_fallback_burst: u32,
    pub fallback_sequence: Vec<ActionKind>,

    pub max_ai_failures: u32,
    pub max_mapping_failures: u32,
    pub max_execution_failures: u32,

    pub cheap_matching: bool,
    pub expensive_matching: bool,
    pub coordinate_fallback: bool,
    pub margin_ratio: f64,
    pub edge_handling: EdgeHandling,
    pub max_strategy_candidates: usize,

    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
    pub failure_threshold: u32,
    pub reset_timeout: Duration,

    /// Settle time after each executed action before re-capturing.
    pub wait_after_action: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            crawl_mode: CrawlMode::Steps,
            max_steps: 100,
            max_duration: Duration::from_secs(600),

            similarity_threshold: 5,

            max_same_action_repeat: 3,
            max_consecutive_no_op: 3,
            max_fallback_burst: 3,
            fallback_sequence: vec![ActionKind::Back, ActionKind::ScrollDown, ActionKind::ScrollUp],

            max_ai_failures: 3,
            max_mapping_failures: 3,
            max_execution_failures: 3,

            cheap_matching: true,
            expensive_matching: false,
            coordinate_fallback: true,
            margin_ratio: 0.05,
            edge_handling: EdgeHandling::Snap,
            max_strategy_candidates: 256,

            max_retries: 3,
            base_delay: Duration::from_millis(250),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),

            wait_after_action: Duration::from_millis(100),
        }
    }
}

impl CrawlerConfig {
    pub fn loop_guard(&self) -> LoopGuardConfig {
        LoopGuardConfig {
            max_same_action_repeat: self.max_same_action_repeat,
            max_consecutive_no_op: self.max_consecutive_no_op,
            max_fallback_burst: self.max_fallback_burst,
            fallback_sequence: if self.fallback_sequence.is_empty() {
                vec![ActionKind::Back]
            } else {
                self.fallback_sequence.clone()
            },
        }
    }

    pub fn resolver(&self) -> ResolverConfig {
        ResolverConfig {
            cheap_matching: self.cheap_matching,
            expensive_matching: self.expensive_matching,
            coordinate_fallback: self.coordinate_fallback,
            margin_ratio: self.margin_ratio,
            edge_handling: self.edge_handling,
            max_strategy_candidates: self.max_strategy_candidates,
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.base_delay,
            multiplier: self.backoff_multiplier,
            max_delay: self.max_delay,
        }
    }
}
