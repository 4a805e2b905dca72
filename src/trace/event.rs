use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::model::screen::{ScreenId, Transition};
use crate::crawler::session::{Lifecycle, TerminationReason};

/// One line of the JSONL crawl log. Screen discoveries and transitions are
/// the events external persistence consumes; lifecycle events are for
/// observability.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrawlEvent {
    ScreenDiscovered {
        timestamp_ms: u128,
        id: ScreenId,
        composite_hash: String,
        first_seen_step: u64,
    },
    TransitionRecorded {
        #[serde(flatten)]
        transition: Transition,
    },
    LifecycleChanged {
        timestamp_ms: u128,
        from: Lifecycle,
        to: Lifecycle,
    },
    RunFinished {
        timestamp_ms: u128,
        reason: TerminationReason,
        steps: u64,
        unique_screens: usize,
    },
}

pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
