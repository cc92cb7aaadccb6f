//! Container readiness prober
//!
//! Waits for the mount point to exist, be displayed and visible, and have a
//! non-zero box. Timeouts are reported, never retried here; callers restart
//! the whole probe if they want another go.

use std::sync::Arc;

use roomlink_common::{poll_until, saturating_millis, PollConfig, PollError};
use roomlink_domain::{ContainerId, ContainerReadiness, ProbeConfig, SessionError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::ports::MountSurface;

/// Polls a mount point until it can host the provider client.
pub struct ContainerProber {
    surface: Arc<dyn MountSurface>,
    poll: PollConfig,
}

impl ContainerProber {
    /// Prober checking `surface` on the schedule in `config`.
    pub fn new(surface: Arc<dyn MountSurface>, config: &ProbeConfig) -> Self {
        Self { surface, poll: PollConfig::new(config.check_interval(), config.max_attempts) }
    }

    /// Check interval and attempt ceiling in use.
    pub fn poll_config(&self) -> PollConfig {
        self.poll
    }

    /// Probe until ready or out of attempts.
    ///
    /// # Errors
    /// `SessionError::ContainerTimeout` after `max_attempts` failed checks.
    pub async fn probe(&self, container: &ContainerId) -> Result<ContainerReadiness, SessionError> {
        self.run(container, None).await
    }

    /// Same as [`probe`](Self::probe), abandoned with
    /// `SessionError::Cancelled` when `cancel` fires.
    pub async fn probe_with_cancel(
        &self,
        container: &ContainerId,
        cancel: CancellationToken,
    ) -> Result<ContainerReadiness, SessionError> {
        self.run(container, Some(&cancel)).await
    }

    #[instrument(skip_all, fields(container = %container, max_attempts = self.poll.max_attempts))]
    async fn run(
        &self,
        container: &ContainerId,
        cancel: Option<&CancellationToken>,
    ) -> Result<ContainerReadiness, SessionError> {
        let surface = &self.surface;
        let outcome = poll_until(&self.poll, cancel, |attempt| async move {
            let ready = surface.inspect(container).await.is_some_and(|layout| layout.is_ready());
            if !ready {
                debug!(attempt, "container not ready");
            }
            ready
        })
        .await;

        match outcome {
            Ok(attempts) => {
                debug!(attempts, "container ready");
                Ok(ContainerReadiness {
                    container: container.clone(),
                    attempts,
                    max_attempts: self.poll.max_attempts,
                    check_interval: self.poll.interval,
                })
            }
            Err(PollError::TimedOut { attempts, elapsed }) => {
                warn!(
                    attempts,
                    elapsed_ms = saturating_millis(elapsed),
                    "container readiness timed out"
                );
                Err(SessionError::ContainerTimeout { container: container.to_string(), attempts })
            }
            Err(PollError::Cancelled { attempts }) => {
                debug!(attempts, "container probe cancelled");
                Err(SessionError::Cancelled)
            }
        }
    }
}
