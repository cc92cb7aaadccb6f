//! Join orchestrator
//!
//! Sequences one join run:
//!
//! 1. validate the meeting number
//! 2. probe the container and load the SDK (once per run)
//! 3. per attempt: initialize if needed, fetch fresh credentials, join
//!
//! Failures go through [`JoinRetryPolicy`]: terminal categories stop the run
//! at once, retryable ones back off and try again until the budget is spent.
//! A session conflict tears the stale client down before the next attempt.
//!
//! A run belongs to the teardown epoch it started in. Once an exit trigger
//! cleans the session up, the run stops at its next step with
//! `SessionError::Cancelled` instead of creating a new client.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use roomlink_common::{
    saturating_millis, ErrorClassification, RetryConfig, RetryDecision, RetryError,
    RetryExecutor, RetryNotice, RetryPolicy,
};
use roomlink_domain::constants::{
    STEP_FETCHING_CREDENTIALS, STEP_INITIALIZING, STEP_LOADING_SDK, STEP_WAITING_FOR_CONTAINER,
};
use roomlink_domain::{
    CredentialError, Credentials, ErrorCategory, JoinAttempt, JoinOutcome, JoinRequest,
    JoinTarget, MeetingNumber, RecoveryAction, RetrySettings, SessionError, SessionId,
};
use tracing::{info, instrument, warn};

use crate::loader::SdkLoader;
use crate::ports::{CredentialIssuer, NoopObserver, SessionObserver};
use crate::readiness::ContainerProber;
use crate::session::SessionManager;
use crate::status::StatusBoard;

type SharedJoin = Shared<BoxFuture<'static, Result<JoinOutcome, SessionError>>>;

/// Retry policy for join attempts.
///
/// Retries whatever [`SessionError`] classifies as retryable. With
/// `max_conflict_retries` set, session conflicts beyond that count stop the
/// run even if budget remains.
#[derive(Debug, Default)]
pub struct JoinRetryPolicy {
    max_conflict_retries: Option<u32>,
    conflicts: AtomicU32,
}

impl JoinRetryPolicy {
    /// `None` retries conflicts for as long as the attempt budget lasts.
    pub fn new(max_conflict_retries: Option<u32>) -> Self {
        Self { max_conflict_retries, conflicts: AtomicU32::new(0) }
    }

    /// Session conflicts counted so far.
    pub fn conflicts_seen(&self) -> u32 {
        self.conflicts.load(Ordering::SeqCst)
    }
}

impl RetryPolicy<SessionError> for JoinRetryPolicy {
    fn should_retry(&self, error: &SessionError, _attempt: u32) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::Stop;
        }

        if error.category() == Some(ErrorCategory::SessionConflict) {
            let seen = self.conflicts.fetch_add(1, Ordering::SeqCst) + 1;
            if self.max_conflict_retries.is_some_and(|limit| seen > limit) {
                warn!(conflicts = seen, "session conflict persists; giving up");
                return RetryDecision::Stop;
            }
        }

        RetryDecision::Retry
    }
}

/// Build the executor configuration from the retry settings.
///
/// # Errors
/// `SessionError::Config` when the settings describe an unusable schedule.
pub fn retry_config(settings: &RetrySettings) -> Result<RetryConfig, SessionError> {
    RetryConfig::builder()
        .max_attempts(settings.max_attempts())
        .exponential_backoff(
            settings.base_delay(),
            settings.backoff_multiplier,
            settings.max_delay(),
        )
        .build()
        .map_err(|e| match e {
            RetryError::InvalidConfiguration { message } => SessionError::Config(message),
            other => SessionError::Config(format!(
                "retry settings rejected after {} attempts",
                other.attempts()
            )),
        })
}

/// Drives probe → load → initialize → credentials → join with retries.
pub struct JoinOrchestrator {
    manager: SessionManager,
    prober: Arc<ContainerProber>,
    loader: Arc<SdkLoader>,
    issuer: Arc<dyn CredentialIssuer>,
    observer: Arc<dyn SessionObserver>,
    status: StatusBoard,
    settings: RetrySettings,
    in_flight: Arc<Mutex<Option<SharedJoin>>>,
    last_target: Mutex<Option<JoinTarget>>,
}

impl JoinOrchestrator {
    /// Orchestrator with default retry settings, a private status board and
    /// no observer.
    pub fn new(
        manager: SessionManager,
        prober: Arc<ContainerProber>,
        loader: Arc<SdkLoader>,
        issuer: Arc<dyn CredentialIssuer>,
    ) -> Self {
        let settings = RetrySettings::default();
        Self {
            manager,
            prober,
            loader,
            issuer,
            observer: Arc::new(NoopObserver),
            status: StatusBoard::new(settings.max_retries),
            settings,
            in_flight: Arc::new(Mutex::new(None)),
            last_target: Mutex::new(None),
        }
    }

    /// Replace the retry settings. Also resets the status board to the new
    /// retry ceiling, so call it before [`with_status`](Self::with_status).
    pub fn with_settings(mut self, settings: RetrySettings) -> Self {
        self.status = StatusBoard::new(settings.max_retries);
        self.settings = settings;
        self
    }

    /// Publish progress on `status` instead of a private board.
    pub fn with_status(mut self, status: StatusBoard) -> Self {
        self.status = status;
        self
    }

    /// Receives `on_error` for failed runs.
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Board the runs publish progress on.
    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    /// The session manager this orchestrator drives.
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Active retry settings.
    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.in_flight.lock().is_some()
    }

    /// Join `target`, retrying retryable failures with backoff.
    ///
    /// A call made while another run is in flight does not start a second
    /// run; it resolves with the in-flight run's result.
    ///
    /// # Errors
    /// The terminal `SessionError`, or `RetriesExhausted` naming the number
    /// of attempts when the budget ran out.
    pub async fn join_with_retry(&self, target: JoinTarget) -> Result<JoinOutcome, SessionError> {
        let future = {
            let mut slot = self.in_flight.lock();
            if let Some(running) = slot.as_ref() {
                info!(meeting_number = %target.meeting_number, "join already in flight");
                running.clone()
            } else {
                *self.last_target.lock() = Some(target.clone());
                let run = JoinRun {
                    manager: self.manager.clone(),
                    prober: Arc::clone(&self.prober),
                    loader: Arc::clone(&self.loader),
                    issuer: Arc::clone(&self.issuer),
                    observer: Arc::clone(&self.observer),
                    status: self.status.clone(),
                    settings: self.settings.clone(),
                    target,
                    epoch: self.manager.teardown_epoch(),
                    reconnect: AtomicBool::new(false),
                    attempts: Mutex::new(Vec::new()),
                };
                let slot_handle = Arc::clone(&self.in_flight);
                let future = async move {
                    let result = run.execute().await;
                    *slot_handle.lock() = None;
                    result
                }
                .boxed()
                .shared();
                *slot = Some(future.clone());
                future
            }
        };

        future.await
    }

    /// Run the last target again (the manual retry on an error panel).
    ///
    /// # Errors
    /// `SessionError::NothingToRetry` if no run was ever started, otherwise
    /// as [`join_with_retry`](Self::join_with_retry).
    pub async fn retry_last(&self) -> Result<JoinOutcome, SessionError> {
        let target = self.last_target.lock().clone().ok_or(SessionError::NothingToRetry)?;
        self.join_with_retry(target).await
    }
}

/// State owned by one orchestration run.
struct JoinRun {
    manager: SessionManager,
    prober: Arc<ContainerProber>,
    loader: Arc<SdkLoader>,
    issuer: Arc<dyn CredentialIssuer>,
    observer: Arc<dyn SessionObserver>,
    status: StatusBoard,
    settings: RetrySettings,
    target: JoinTarget,
    /// Teardown epoch the run started in
    epoch: u64,
    reconnect: AtomicBool,
    attempts: Mutex<Vec<JoinAttempt>>,
}

impl JoinRun {
    #[instrument(skip_all, fields(
        meeting_number = %self.target.meeting_number,
        role = %self.target.role,
        container = %self.target.container,
    ))]
    async fn execute(self) -> Result<JoinOutcome, SessionError> {
        match self.run().await {
            Ok(outcome) => {
                self.status.joined();
                info!(
                    session_id = %outcome.session_id,
                    attempts = outcome.attempt_count(),
                    "meeting joined"
                );
                Ok(outcome)
            }
            Err(SessionError::Cancelled) => {
                info!("join run cancelled by session teardown");
                Err(SessionError::Cancelled)
            }
            Err(err) => {
                let message = err.user_message();
                warn!(error = %err, category = ?err.category(), "join run failed");
                self.status.failed(&message);
                self.observer.on_error(&message);
                Err(err)
            }
        }
    }

    async fn run(&self) -> Result<JoinOutcome, SessionError> {
        let meeting_number = MeetingNumber::parse(&self.target.meeting_number)?;
        let config = retry_config(&self.settings)?;

        self.status.begin(STEP_WAITING_FOR_CONTAINER);
        self.prober.probe(&self.target.container).await?;

        self.status.step(STEP_LOADING_SDK);
        self.loader.load().await?;

        let executor =
            RetryExecutor::new(config, JoinRetryPolicy::new(self.settings.max_conflict_retries));
        let outcome = executor
            .execute_with_hook(
                |attempt| self.attempt(attempt, &meeting_number),
                |notice| self.on_retry(&notice),
            )
            .await;

        match outcome.result {
            Ok(session_id) => Ok(JoinOutcome {
                session_id,
                meeting_number,
                attempts: std::mem::take(&mut *self.attempts.lock()),
            }),
            Err(RetryError::AttemptsExhausted { attempts, last }) => {
                Err(SessionError::RetriesExhausted { attempts, last: Box::new(last) })
            }
            Err(RetryError::NonRetryable { attempts, source }) if source.is_retryable() => {
                // stopped by the conflict limit
                Err(SessionError::RetriesExhausted { attempts, last: Box::new(source) })
            }
            Err(RetryError::NonRetryable { source, .. }) => Err(source),
            Err(RetryError::InvalidConfiguration { message }) => Err(SessionError::Config(message)),
        }
    }

    async fn attempt(
        &self,
        attempt: u32,
        meeting_number: &MeetingNumber,
    ) -> Result<SessionId, SessionError> {
        self.ensure_current()?;
        if self.reconnect.swap(false, Ordering::SeqCst) {
            info!(attempt, "tearing down stale session before retrying");
            self.manager.recycle().await;
        }

        self.attempts.lock().push(JoinAttempt {
            meeting_number: meeting_number.clone(),
            role: self.target.role,
            attempt_number: attempt,
            started_at: Utc::now(),
            credentials_expire_at: None,
        });

        self.status.step(STEP_INITIALIZING);
        let session_id =
            self.manager.initialize_within(&self.target.container, self.epoch).await?;

        self.status.step(STEP_FETCHING_CREDENTIALS);
        let credentials = self.fetch_credentials(meeting_number).await?;
        if let Some(record) = self.attempts.lock().last_mut() {
            record.credentials_expire_at = Some(credentials.expires_at());
        }

        self.status.joining();
        let request = JoinRequest::from_target(&self.target, credentials);
        match self.manager.join_within(request, self.epoch).await {
            // a teardown that queued behind the join has released it again
            Ok(()) => self.ensure_current().map(|()| session_id),
            Err(_) if self.ensure_current().is_err() => Err(SessionError::Cancelled),
            Err(err) => {
                if err.recovery_action() == RecoveryAction::Reconnect {
                    self.reconnect.store(true, Ordering::SeqCst);
                }
                Err(err)
            }
        }
    }

    fn ensure_current(&self) -> Result<(), SessionError> {
        if self.manager.teardown_epoch() == self.epoch {
            Ok(())
        } else {
            Err(SessionError::Cancelled)
        }
    }

    /// Fresh credentials for this attempt; an already-expired bundle is
    /// fetched again once.
    async fn fetch_credentials(
        &self,
        meeting_number: &MeetingNumber,
    ) -> Result<Credentials, SessionError> {
        let credentials = self.issuer.issue(meeting_number, self.target.role).await?;
        if !credentials.is_expired() {
            return Ok(credentials);
        }

        warn!("issued credentials already expired; requesting new ones");
        let credentials = self.issuer.issue(meeting_number, self.target.role).await?;
        if credentials.is_expired() {
            return Err(CredentialError::Expired.into());
        }
        Ok(credentials)
    }

    fn on_retry(&self, notice: &RetryNotice<'_, SessionError>) {
        warn!(
            attempt = notice.failed_attempt,
            max_attempts = notice.max_attempts,
            delay_ms = saturating_millis(notice.delay),
            category = ?notice.error.category(),
            error = %notice.error,
            "join attempt failed; retrying"
        );
        self.status.retrying(notice.failed_attempt);
    }
}
