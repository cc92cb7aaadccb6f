//! Status board for the loading overlay and error panel

use roomlink_domain::constants::{STEP_FAILED, STEP_JOINED, STEP_JOINING, STEP_LEAVING};
use roomlink_domain::StatusSnapshot;
use tokio::sync::watch;

/// Latest [`StatusSnapshot`], queryable and watchable.
///
/// Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    tx: watch::Sender<StatusSnapshot>,
}

impl StatusBoard {
    /// Idle board whose retry label counts up to `max_retries`.
    pub fn new(max_retries: u32) -> Self {
        let (tx, _rx) = watch::channel(StatusSnapshot::idle(max_retries));
        Self { tx }
    }

    /// Copy of the current status.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }

    /// Receiver that sees every later update.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }

    /// Start a new run: clear any previous error and show `step`.
    pub fn begin(&self, step: &str) {
        self.tx.send_modify(|s| {
            *s = StatusSnapshot { is_loading: true, ..StatusSnapshot::idle(s.max_retries) };
            s.current_step = step.to_string();
        });
    }

    /// Replace the step label only.
    pub fn step(&self, step: &str) {
        self.tx.send_modify(|s| s.current_step = step.to_string());
    }

    /// A join call is in progress.
    pub fn joining(&self) {
        self.tx.send_modify(|s| {
            s.is_joining = true;
            s.current_step = STEP_JOINING.to_string();
        });
    }

    /// Transient "retrying (n/m)" update; `retry` is 1-based.
    pub fn retrying(&self, retry: u32) {
        self.tx.send_modify(|s| {
            s.retry_count = retry;
            s.is_joining = false;
            s.current_step = format!("Retrying ({retry}/{})", s.max_retries);
        });
    }

    /// Terminal success; clears any error and the retry count.
    pub fn joined(&self) {
        self.tx.send_modify(|s| {
            s.is_loading = false;
            s.is_joining = false;
            s.is_joined = true;
            s.has_error = false;
            s.error_message = None;
            s.retry_count = 0;
            s.current_step = STEP_JOINED.to_string();
        });
    }

    /// Terminal failure with the user-facing `message`.
    pub fn failed(&self, message: &str) {
        self.tx.send_modify(|s| {
            s.is_loading = false;
            s.is_joining = false;
            s.is_joined = false;
            s.has_error = true;
            s.error_message = Some(message.to_string());
            s.current_step = STEP_FAILED.to_string();
        });
    }

    /// Teardown has started.
    pub fn leaving(&self) {
        self.step(STEP_LEAVING);
    }

    /// Back to idle, keeping `max_retries`.
    pub fn reset(&self) {
        self.tx.send_modify(|s| *s = StatusSnapshot::idle(s.max_retries));
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(roomlink_domain::constants::DEFAULT_MAX_RETRIES)
    }
}
