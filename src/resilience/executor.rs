use std::error::Error;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use crate::backend::device::{BackendError, DeviceBackend, DeviceCommand, ErrorClass};
use crate::crawler::session::CrawlControl;
use crate::resilience::breaker::CircuitBreaker;

/// Exponential backoff schedule for transient backend failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (so `max_retries + 1` attempts total).
    pub max_retries: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after attempt number `attempt` (0-based):
    /// `base * multiplier^attempt`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let delay = self.base_delay.mul_f64(factor.max(0.0));
        delay.min(self.max_delay)
    }
}

/// Failure of one executed command after the resilience layer is done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Circuit is open; the backend was not called.
    CircuitOpen,
    /// A pause/stop signal arrived between retry attempts.
    Cancelled,
    /// Permanent backend failure; not retried.
    Permanent(BackendError),
    /// Transient failures persisted through every retry.
    RetriesExhausted(BackendError),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::CircuitOpen => write!(f, "backend unavailable: circuit open"),
            ExecutionError::Cancelled => write!(f, "execution cancelled by control signal"),
            ExecutionError::Permanent(e) => write!(f, "permanent failure: {}", e),
            ExecutionError::RetriesExhausted(e) => write!(f, "retries exhausted: {}", e),
        }
    }
}

impl Error for ExecutionError {}

/// Retry + circuit breaker around the device backend.
///
/// The breaker wraps the retrying client: one executed command contributes a
/// single success or failure sample, however many attempts it took. The
/// control signal is re-checked between attempts so cancellation latency is
/// bounded by one backoff interval.
pub struct ResilientExecutor {
    backend: Box<dyn DeviceBackend>,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl ResilientExecutor {
    pub fn new(backend: Box<dyn DeviceBackend>, breaker: CircuitBreaker, retry: RetryPolicy) -> Self {
        Self { backend, breaker, retry }
    }

    pub fn connect(&mut self) -> Result<(), BackendError> {
        self.backend.connect()
    }

    pub fn launch_app(&mut self) -> Result<(), BackendError> {
        self.backend.launch_app()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn execute(
        &mut self,
        command: &DeviceCommand,
        control: &CrawlControl,
    ) -> Result<(), ExecutionError> {
        if !self.breaker.try_acquire(Instant::now()) {
            return Err(ExecutionError::CircuitOpen);
        }

        let mut attempt = 0u32;
        loop {
            match self.backend.execute(command) {
                Ok(()) => {
                    self.breaker.record_success();
                    return Ok(());
                }
                Err(err) if err.class == ErrorClass::Permanent => {
                    self.breaker.record_failure(Instant::now());
                    return Err(ExecutionError::Permanent(err));
                }
                Err(err) => {
                    if attempt >= self.retry.max_retries {
                        self.breaker.record_failure(Instant::now());
                        return Err(ExecutionError::RetriesExhausted(err));
                    }
                    thread::sleep(self.retry.delay_for(attempt));
                    if control.interrupted() {
                        // Not a backend failure; the breaker is untouched.
                        return Err(ExecutionError::Cancelled);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
