//! Resilience patterns for transient failures
//!
//! Only bounded retry lives here. The executor is generic over the error
//! type and delegates the retry/stop decision to a [`RetryPolicy`], so
//! domain crates keep their own classification rules and reuse the backoff
//! bookkeeping.

pub mod retry;

pub use retry::{
    BackoffStrategy, RetryConfig, RetryConfigBuilder, RetryDecision, RetryError,
    RetryExecutor, RetryNotice, RetryOutcome, RetryPolicy, RetryResult,
};
