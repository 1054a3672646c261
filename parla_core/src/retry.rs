//! Failure accounting for refilling the question queue.
//!
//! The session loop reports every failed refill here and gets back what to
//! do next: wait and retry, or escalate once the consecutive-failure budget
//! is spent. Waiting goes through [`Sleeper`] so tests never block.

use crate::config::SessionConfig;
use std::time::Duration;

/// Why a refill attempt failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The provider answered with no usable questions
    EmptyBatch,
    /// The provider call returned an error
    ProviderError,
}

/// What the session should do after a failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureAction {
    /// Wait this long, then retry the same refill
    Retry(Duration),
    /// Budget exhausted: fall back to local questions or give up
    Escalate,
}

/// Consecutive-failure counter with a fixed delay per failure kind
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_failures: u32,
    empty_batch_delay: Duration,
    error_delay: Duration,
    consecutive_failures: u32,
}

impl RetryPolicy {
    pub fn new(max_failures: u32, empty_batch_delay: Duration, error_delay: Duration) -> Self {
        Self {
            max_failures: max_failures.max(1),
            empty_batch_delay,
            error_delay,
            consecutive_failures: 0,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.max_failures,
            config.empty_batch_backoff(),
            config.error_backoff(),
        )
    }

    /// Count a failure and decide the next step
    pub fn record_failure(&mut self, kind: FailureKind) -> FailureAction {
        self.consecutive_failures += 1;

        if self.consecutive_failures >= self.max_failures {
            return FailureAction::Escalate;
        }

        let delay = match kind {
            FailureKind::EmptyBatch => self.empty_batch_delay,
            FailureKind::ProviderError => self.error_delay,
        };
        FailureAction::Retry(delay)
    }

    /// Any successful refill (or a fallback) clears the counter
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

/// Blocking wait used for backoff
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested waits instead of sleeping
#[derive(Clone, Debug, Default)]
pub struct RecordingSleeper {
    pub waits: Vec<Duration>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.waits.push(duration);
    }
}
