//! Exit/cleanup coordinator
//!
//! Single guarded entry point for every way a meeting view can go away.
//! Host-side listeners (leave button, visibility change, unload, unmount,
//! navigation) push [`ExitTrigger`]s into the sender from
//! [`ExitCoordinator::trigger_sender`]; the first one to arrive tears the
//! session down and later ones are dropped until the next successful join.
//!
//! ## Arming
//! The coordinator reads arming off the [`SessionManager`]: it is armed while
//! a session is joined and that join has not been torn down yet. Every
//! successful join re-arms it, so hosts never arm by hand.
//!
//! ## Trigger handling
//! - `PageUnload` starts cleanup without awaiting it.
//! - `VisibilityHidden` only counts while a session is joined.
//! - Everything else always tears down, including a join run still in
//!   flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use roomlink_domain::ExitTrigger;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::session::SessionManager;
use crate::status::StatusBoard;

const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// `fired_at` value meaning no teardown is recorded
const NOT_FIRED: u64 = 0;

/// Listener loop lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("exit listener already running")]
    AlreadyRunning,

    #[error("exit listener not running")]
    NotRunning,

    #[error("exit listener task failed: {0}")]
    TaskFailed(String),

    #[error("exit listener did not stop within {0:?}")]
    StopTimeout(Duration),
}

/// Exactly-once teardown for one [`SessionManager`].
pub struct ExitCoordinator {
    guard: Arc<ExitGuard>,
    tx: mpsc::UnboundedSender<ExitTrigger>,
    rx: Option<mpsc::UnboundedReceiver<ExitTrigger>>,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<mpsc::UnboundedReceiver<ExitTrigger>>>,
    stop_timeout: Duration,
}

/// State shared between the coordinator and its listener task.
struct ExitGuard {
    manager: SessionManager,
    status: Option<StatusBoard>,
    /// `join_count + 1` of the join the last teardown ended
    fired_at: AtomicU64,
}

impl ExitCoordinator {
    /// Coordinator over `manager` with the listener loop stopped.
    pub fn new(manager: SessionManager) -> Self {
        Self::build(manager, None)
    }

    /// Also report "Leaving" and reset `status` around teardown.
    pub fn with_status(self, status: StatusBoard) -> Self {
        let mut rebuilt = Self::build(self.guard.manager.clone(), Some(status));
        rebuilt.stop_timeout = self.stop_timeout;
        rebuilt
    }

    /// How long [`stop`](Self::stop) waits for the listener task.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    fn build(manager: SessionManager, status: Option<StatusBoard>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            guard: Arc::new(ExitGuard {
                manager,
                status,
                fired_at: AtomicU64::new(NOT_FIRED),
            }),
            tx,
            rx: Some(rx),
            cancellation: CancellationToken::new(),
            task_handle: None,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// Clear the fired guard so the next trigger tears down again.
    ///
    /// A successful join does this on its own; this is only needed to force
    /// another teardown of the same join.
    pub fn arm(&self) {
        self.guard.fired_at.store(NOT_FIRED, Ordering::SeqCst);
        debug!("exit triggers re-armed");
    }

    /// Whether a joined session is waiting for its teardown.
    pub fn is_armed(&self) -> bool {
        self.guard.manager.is_joined() && !self.has_fired()
    }

    /// Whether a trigger already tore down the current join.
    pub fn has_fired(&self) -> bool {
        self.guard.fired_at.load(Ordering::SeqCst) == self.guard.current_mark()
    }

    /// Sender for host-side listeners. Sending never blocks, so it is safe
    /// from an unload handler.
    pub fn trigger_sender(&self) -> mpsc::UnboundedSender<ExitTrigger> {
        self.tx.clone()
    }

    /// Handle `trigger` directly. Returns `true` if this call ran (or, for
    /// unload, started) cleanup.
    pub async fn fire(&self, trigger: ExitTrigger) -> bool {
        self.guard.fire(trigger).await
    }

    /// Start the listener loop that feeds queued triggers into [`fire`](Self::fire).
    ///
    /// # Errors
    /// `CoordinatorError::AlreadyRunning` if the loop is already running.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<(), CoordinatorError> {
        if self.is_running() {
            return Err(CoordinatorError::AlreadyRunning);
        }
        let Some(rx) = self.rx.take() else {
            return Err(CoordinatorError::AlreadyRunning);
        };

        self.cancellation = CancellationToken::new();
        let guard = Arc::clone(&self.guard);
        let cancel = self.cancellation.clone();
        self.task_handle = Some(tokio::spawn(Self::listen(guard, rx, cancel)));

        info!("exit listener started");
        Ok(())
    }

    /// Stop the listener loop. Triggers sent while stopped stay queued.
    ///
    /// # Errors
    /// `NotRunning`, or `StopTimeout`/`TaskFailed` if the task does not
    /// finish cleanly.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), CoordinatorError> {
        let Some(handle) = self.task_handle.take() else {
            return Err(CoordinatorError::NotRunning);
        };

        self.cancellation.cancel();
        let result = match tokio::time::timeout(self.stop_timeout, handle).await {
            Ok(Ok(rx)) => {
                self.rx = Some(rx);
                info!("exit listener stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "exit listener task failed");
                Err(CoordinatorError::TaskFailed(e.to_string()))
            }
            Err(_) => {
                warn!("exit listener did not stop in time");
                Err(CoordinatorError::StopTimeout(self.stop_timeout))
            }
        };
        self.cancellation = CancellationToken::new();
        result
    }

    /// Whether the listener loop is running.
    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    async fn listen(
        guard: Arc<ExitGuard>,
        mut rx: mpsc::UnboundedReceiver<ExitTrigger>,
        cancel: CancellationToken,
    ) -> mpsc::UnboundedReceiver<ExitTrigger> {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("exit listener cancelled");
                    break;
                }
                trigger = rx.recv() => {
                    let Some(trigger) = trigger else { break };
                    guard.fire(trigger).await;
                }
            }
        }
        rx
    }
}

impl ExitGuard {
    fn current_mark(&self) -> u64 {
        self.manager.join_count() + 1
    }

    #[instrument(skip_all, fields(trigger = %trigger))]
    async fn fire(&self, trigger: ExitTrigger) -> bool {
        if trigger.requires_joined() && !self.manager.is_joined() {
            debug!("trigger ignored; no joined session");
            return false;
        }
        let mark = self.current_mark();
        if self.fired_at.swap(mark, Ordering::SeqCst) == mark {
            debug!("teardown already triggered");
            return false;
        }

        if trigger.is_unload() {
            info!("page unloading; starting best-effort cleanup");
            self.manager.cleanup_detached();
            return true;
        }

        info!("tearing down session");
        if let Some(status) = &self.status {
            status.leaving();
        }
        self.manager.cleanup().await;
        if let Some(status) = &self.status {
            status.reset();
        }
        true
    }
}

impl Drop for ExitCoordinator {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("exit coordinator dropped while running; cancelling listener");
            self.cancellation.cancel();
        }
    }
}
