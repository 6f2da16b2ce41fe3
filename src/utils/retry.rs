//! Bounded retry for network operations
//!
//! A retry loop is a small state machine: every attempt either succeeds,
//! fails permanently, exhausts the budget, or schedules the next attempt.
//! [`RetryPolicy::transition`] is that machine; [`with_retry`] drives it.
//! Source fetches and URL probes hold different policies.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::{ProbeError, SourceError};

/// Errors that know whether another attempt may help
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for SourceError {
    fn is_retryable(&self) -> bool {
        SourceError::is_retryable(self)
    }
}

impl Retryable for ProbeError {
    fn is_retryable(&self) -> bool {
        matches!(self, ProbeError::Timeout { .. } | ProbeError::Unreachable { .. })
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add up to 25% jitter to delays
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Where a retry loop stands after an attempt
#[derive(Debug, PartialEq)]
pub enum RetryState<T, E> {
    /// The given attempt (1-based) should run next
    Attempting(u32),
    Succeeded(T),
    /// No further attempt will be made; carries the last error
    Exhausted(E),
}

impl RetryPolicy {
    /// Single attempt, no backoff
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Next state after `attempt` produced `outcome`
    pub fn transition<T, E: Retryable>(
        &self,
        attempt: u32,
        outcome: Result<T, E>,
    ) -> RetryState<T, E> {
        match outcome {
            Ok(value) => RetryState::Succeeded(value),
            Err(err) if !err.is_retryable() => RetryState::Exhausted(err),
            Err(err) if attempt >= self.max_attempts => RetryState::Exhausted(err),
            Err(_) => RetryState::Attempting(attempt + 1),
        }
    }

    /// Delay to wait before running `attempt` (no delay before the first)
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let exponent = (attempt - 2) as i32;
        let exponential =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let delay_ms = exponential.min(self.max_delay.as_millis() as f64) as u64;

        if self.jitter {
            Duration::from_millis(delay_ms + jitter_ms(delay_ms / 4))
        } else {
            Duration::from_millis(delay_ms)
        }
    }
}

/// Pseudo-random value in `0..=max` taken from the system clock
fn jitter_ms(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    (nanos % (max as u128 + 1)) as u64
}

/// Run `operation` until it succeeds or the policy gives up
///
/// Attempts are strictly sequential. The closure receives the 1-based
/// attempt number. Only failures that lead to another attempt are logged
/// at `warn`; the final error is left to the caller.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: Retryable + Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut state = RetryState::Attempting(1);

    loop {
        state = match state {
            RetryState::Attempting(attempt) => {
                let delay = policy.delay_before(attempt);
                if !delay.is_zero() {
                    debug!(
                        operation = operation_name,
                        attempt,
                        "Retrying in {:?}", delay
                    );
                    sleep(delay).await;
                }

                let outcome = operation(attempt).await;
                let failure = outcome.as_ref().err().map(|err| err.to_string());
                let next = policy.transition(attempt, outcome);

                match (&next, failure) {
                    (RetryState::Attempting(_), Some(err)) => warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = policy.max_attempts,
                        "Attempt failed, will retry: {}", err
                    ),
                    (RetryState::Exhausted(_), Some(err)) => debug!(
                        operation = operation_name,
                        attempt,
                        "Giving up: {}", err
                    ),
                    (RetryState::Succeeded(_), _) if attempt > 1 => debug!(
                        operation = operation_name,
                        "Succeeded on attempt {}/{}", attempt, policy.max_attempts
                    ),
                    _ => {}
                }
                next
            }
            RetryState::Succeeded(value) => return Ok(value),
            RetryState::Exhausted(err) => return Err(err),
        };
    }
}
