use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation; calls pass through.
    Closed,
    /// Failing fast; no backend call is attempted.
    Open,
    /// Cooldown elapsed; exactly one probe call is allowed.
    HalfOpen,
}

/// Circuit breaker around the device-backend connection.
///
/// One instance per connection. Time is injected as `Instant` arguments so
/// state transitions are testable without a real clock. Within one session
/// calls are serialized; sharing a connection across sessions requires
/// external locking around this state.
pub struct CircuitBreaker {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            failure_threshold,
            reset_timeout,
        }
    }

    /// Whether a call may proceed right now. Moves `Open -> HalfOpen` once
    /// the reset timeout has elapsed; the half-open probe is the single call
    /// made between this returning `true` and the next `record_*`.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed_enough = self
                    .opened_at
                    .is_some_and(|at| now.duration_since(at) >= self.reset_timeout);
                if elapsed_enough {
                    self.state = BreakerState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call: closes the breaker and clears the failure
    /// streak.
    pub fn record_success(&mut self) {
        self.state = BreakerState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
    }

    /// Record a failed call. A half-open probe failure reopens immediately;
    /// in closed state the breaker opens once the streak reaches the
    /// threshold.
    pub fn record_failure(&mut self, now: Instant) {
        self.consecutive_failures += 1;
        match self.state {
            BreakerState::HalfOpen => {
                self.state = BreakerState::Open;
                self.opened_at = Some(now);
            }
            BreakerState::Closed => {
                if self.consecutive_failures >= self.failure_threshold {
                    self.state = BreakerState::Open;
                    self.opened_at = Some(now);
                }
            }
            BreakerState::Open => {
                // Shouldn't be reached (open calls fail fast), but keep the
                // opened_at fresh if it is.
                self.opened_at = Some(now);
            }
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
