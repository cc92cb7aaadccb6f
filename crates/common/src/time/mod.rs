//! Time utilities
//!
//! - **[`poll`]**: bounded, cancellable polling on a fixed interval

pub mod poll;

pub use poll::{poll_until, saturating_millis, PollConfig, PollError};
