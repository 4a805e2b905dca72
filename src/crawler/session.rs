use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::crawler::config::{CrawlMode, CrawlerConfig};

/// Crawl lifecycle. `Paused` is reachable only from `Crawling` and returns
/// only to `Crawling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    Initializing,
    Connecting,
    LaunchingApp,
    Crawling,
    Paused,
    Finalizing,
    Completed,
    Failed,
}

/// Why a session left the `Crawling` state. Reported with the final status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    MaxStepsReached,
    MaxDurationReached,
    MaxAiFailures,
    MaxMappingFailures,
    MaxExecutionFailures,
    StopRequested,
    ConnectFailed,
    LaunchFailed,
}

impl TerminationReason {
    /// Whether this reason ends the session as `Failed` rather than
    /// `Completed`.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TerminationReason::MaxAiFailures
                | TerminationReason::MaxMappingFailures
                | TerminationReason::MaxExecutionFailures
                | TerminationReason::ConnectFailed
                | TerminationReason::LaunchFailed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::MaxStepsReached => "max_steps_reached",
            TerminationReason::MaxDurationReached => "max_duration_reached",
            TerminationReason::MaxAiFailures => "max_ai_failures",
            TerminationReason::MaxMappingFailures => "max_mapping_failures",
            TerminationReason::MaxExecutionFailures => "max_execution_failures",
            TerminationReason::StopRequested => "stop_requested",
            TerminationReason::ConnectFailed => "connect_failed",
            TerminationReason::LaunchFailed => "launch_failed",
        }
    }
}

/// External pause/stop signals, shared with whoever supervises the crawl.
/// Checked at step boundaries and between retry attempts.
#[derive(Default)]
pub struct CrawlControl {
    pause: AtomicBool,
    stop: AtomicBool,
}

impl CrawlControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn request_pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
    }

    pub fn request_resume(&self) {
        self.pause.store(false, Ordering::SeqCst);
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn pause_requested(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn interrupted(&self) -> bool {
        self.pause_requested() || self.stop_requested()
    }
}

/// Per-session mutable state: lifecycle, step counter and the three
/// independent consecutive-failure counters.
pub struct CrawlSession {
    pub lifecycle: Lifecycle,
    pub step_count: u64,
    pub started: Instant,
    pub ai_failures: u32,
    pub mapping_failures: u32,
    pub execution_failures: u32,
    pub termination: Option<TerminationReason>,
}

impl CrawlSession {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Initializing,
            step_count: 0,
            started: Instant::now(),
            ai_failures: 0,
            mapping_failures: 0,
            execution_failures: 0,
            termination: None,
        }
    }

    pub fn record_ai_failure(&mut self) {
        self.ai_failures += 1;
    }

    pub fn record_ai_success(&mut self) {
        self.ai_failures = 0;
    }

    pub fn record_mapping_failure(&mut self) {
        self.mapping_failures += 1;
    }

    pub fn record_mapping_success(&mut self) {
        self.mapping_failures = 0;
    }

    pub fn record_execution_failure(&mut self) {
        self.execution_failures += 1;
    }

    pub fn record_execution_success(&mut self) {
        self.execution_failures = 0;
    }

    /// Evaluate the termination conditions in specified order; first match
    /// wins. Called after every step.
    pub fn check_termination(
        &self,
        cfg: &CrawlerConfig,
        control: &CrawlControl,
        now: Instant,
    ) -> Option<TerminationReason> {
        if cfg.crawl_mode == CrawlMode::Steps && self.step_count >= cfg.max_steps {
            return Some(TerminationReason::MaxStepsReached);
        }
        if cfg.crawl_mode == CrawlMode::Time
            && now.duration_since(self.started) >= cfg.max_duration
        {
            return Some(TerminationReason::MaxDurationReached);
        }
        if self.ai_failures >= cfg.max_ai_failures {
            return Some(TerminationReason::MaxAiFailures);
        }
        if self.mapping_failures >= cfg.max_mapping_failures {
            return Some(TerminationReason::MaxMappingFailures);
        }
        if self.execution_failures >= cfg.max_execution_failures {
            return Some(TerminationReason::MaxExecutionFailures);
        }
        if control.stop_requested() {
            return Some(TerminationReason::StopRequested);
        }
        None
    }
}

impl Default for CrawlSession {
    fn default() -> Self {
        Self::new()
    }
}
