//! Bounded retry with pluggable classification
//!
//! The executor runs an attempt-aware operation, asks a [`RetryPolicy`] what
//! to do with each failure, and sleeps according to a [`BackoffStrategy`]
//! between attempts. The policy is consulted before the budget check so a
//! terminal failure always surfaces as [`RetryError::NonRetryable`] with its
//! original error, even on the last attempt.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::time::saturating_millis;

/// Errors produced by a retry run
#[derive(Debug, Clone, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    #[error("all {attempts} attempts failed, last error: {last}")]
    AttemptsExhausted { attempts: u32, last: E },

    /// The policy classified the failure as terminal
    #[error("attempt {attempts} failed with non-retryable error: {source}")]
    NonRetryable { attempts: u32, source: E },

    /// The retry configuration is unusable
    #[error("invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl<E> RetryError<E> {
    /// Number of attempts that were made.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::AttemptsExhausted { attempts, .. } | Self::NonRetryable { attempts, .. } => {
                *attempts
            }
            Self::InvalidConfiguration { .. } => 0,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Result of a retry run plus bookkeeping.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub attempts: u32,
    /// Sum of the backoff sleeps, excluding time spent inside the operation.
    pub total_delay: Duration,
}

/// Decides whether a failed attempt should be retried.
pub trait RetryPolicy<E> {
    /// `attempt` is the 1-based number of the attempt that just failed.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the configured backoff delay
    Retry,
    /// Retry after a caller-provided delay
    RetryAfter(Duration),
    /// Surface the error now
    Stop,
}

/// Delay schedule between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// `initial_delay * multiplier^retry`, capped at `max_delay`
    Exponential { initial_delay: Duration, multiplier: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Delay before retry number `retry` (0-based, so `0` is the wait
    /// between the first and second attempt).
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        match self {
            Self::Exponential { initial_delay, multiplier, max_delay } => {
                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let delay_ms = initial_delay.as_millis() as f64 * multiplier.powi(exponent);
                let capped = delay_ms.min(max_delay.as_millis() as f64);
                Duration::from_millis(capped as u64)
            }
        }
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(1000),
                multiplier: 2.0,
                max_delay: Duration::from_millis(8000),
            },
        }
    }
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<(), RetryError<()>> {
        if self.max_attempts == 0 {
            return Err(RetryError::InvalidConfiguration {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }

        if let BackoffStrategy::Exponential { initial_delay, multiplier, max_delay } = &self.backoff
        {
            if *multiplier < 1.0 {
                return Err(RetryError::InvalidConfiguration {
                    message: "exponential multiplier must be at least 1".to_string(),
                });
            }
            if max_delay < initial_delay {
                return Err(RetryError::InvalidConfiguration {
                    message: "max_delay must not be shorter than initial_delay".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Builder for [`RetryConfig`]
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, multiplier, max_delay };
        self
    }

    pub fn build(self) -> Result<RetryConfig, RetryError<()>> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Details handed to the retry hook before each backoff sleep.
#[derive(Debug)]
pub struct RetryNotice<'a, E> {
    /// Attempt that just failed (1-based)
    pub failed_attempt: u32,
    pub max_attempts: u32,
    pub delay: Duration,
    pub error: &'a E,
}

/// Runs operations under a [`RetryConfig`] and [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    /// Run `operation` until it succeeds, the policy stops, or the budget
    /// runs out. The operation receives the 1-based attempt number, and
    /// `on_retry` is called before every backoff sleep.
    pub async fn execute_with_hook<F, Fut, T, E, H>(
        &self,
        mut operation: F,
        mut on_retry: H,
    ) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: FnMut(RetryNotice<'_, E>),
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut total_delay = Duration::ZERO;
        let mut attempt = 1;

        loop {
            debug!(attempt, max_attempts, "executing attempt");

            let error = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retries");
                    }
                    return RetryOutcome { result: Ok(value), attempts: attempt, total_delay };
                }
                Err(error) => error,
            };

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(attempt, error = %error, "policy stopped retrying");
                    return RetryOutcome {
                        result: Err(RetryError::NonRetryable { attempts: attempt, source: error }),
                        attempts: attempt,
                        total_delay,
                    };
                }
                RetryDecision::Retry => self.config.backoff.calculate_delay(attempt - 1),
                RetryDecision::RetryAfter(delay) => delay,
            };

            if attempt >= max_attempts {
                warn!(attempts = attempt, error = %error, "retry budget exhausted");
                return RetryOutcome {
                    result: Err(RetryError::AttemptsExhausted { attempts: attempt, last: error }),
                    attempts: attempt,
                    total_delay,
                };
            }

            warn!(
                attempt,
                max_attempts,
                delay_ms = saturating_millis(delay),
                error = %error,
                "attempt failed, retrying"
            );
            on_retry(RetryNotice { failed_attempt: attempt, max_attempts, delay, error: &error });

            tokio::time::sleep(delay).await;
            total_delay += delay;
            attempt += 1;
        }
    }
}
