//! Bounded polling on a fixed interval
//!
//! Every wait in RoomLink that depends on something outside the process
//! (a mount point gaining layout, an external script defining its entry
//! point) goes through [`poll_until`]. The attempt ceiling turns "still
//! waiting" into [`PollError::TimedOut`], and an optional
//! [`CancellationToken`] lets the caller abandon the wait without leaving a
//! timer behind.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Interval and ceiling for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self { interval, max_attempts }
    }

    /// Upper bound on the time spent waiting between checks.
    pub fn ceiling(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts.saturating_sub(1))
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval: Duration::from_millis(50), max_attempts: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("condition not met after {attempts} checks ({elapsed:?})")]
    TimedOut { attempts: u32, elapsed: Duration },

    #[error("polling cancelled after {attempts} checks")]
    Cancelled { attempts: u32 },
}

/// Check `condition` immediately and then once per interval until it returns
/// `true`. Returns the 1-based number of the check that succeeded.
///
/// # Errors
/// [`PollError::TimedOut`] once `max_attempts` checks have failed, or
/// [`PollError::Cancelled`] if `cancel` fires first.
pub async fn poll_until<F, Fut>(
    config: &PollConfig,
    cancel: Option<&CancellationToken>,
    mut condition: F,
) -> Result<u32, PollError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    let started = Instant::now();
    let max_attempts = config.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(PollError::Cancelled { attempts: attempt - 1 });
        }

        if condition(attempt).await {
            trace!(attempt, "poll condition satisfied");
            return Ok(attempt);
        }

        if attempt == max_attempts {
            break;
        }

        match cancel {
            Some(token) => {
                tokio::select! {
                    () = token.cancelled() => {
                        return Err(PollError::Cancelled { attempts: attempt });
                    }
                    () = tokio::time::sleep(config.interval) => {}
                }
            }
            None => tokio::time::sleep(config.interval).await,
        }
    }

    Err(PollError::TimedOut { attempts: max_attempts, elapsed: started.elapsed() })
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
