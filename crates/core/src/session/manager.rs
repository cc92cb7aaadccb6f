//! Client session manager
//!
//! Owns the single provider client and serializes every operation on it.
//!
//! ## Concurrency
//! - `gate` (async mutex) admits one initialize/join/leave/cleanup at a time,
//!   so cleanup always waits for an in-flight operation before releasing the
//!   client.
//! - `inner` (sync mutex) holds the state and handle; it is never held
//!   across an `.await`.
//! - Concurrent `initialize` calls for the same container share one
//!   [`Shared`] future and observe the same result.
//! - `cleaning` short-circuits re-entrant cleanup.
//!
//! ## Teardown epoch
//! Every external `cleanup` bumps the epoch before it waits for the gate.
//! Work started under an older epoch (see [`initialize_within`] and
//! [`join_within`]) is refused with `SessionError::Cancelled` once it gets
//! the gate, so a teardown always wins over an operation it overlapped.
//!
//! [`initialize_within`]: SessionManager::initialize_within
//! [`join_within`]: SessionManager::join_within

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use roomlink_domain::{
    ContainerId, JoinConfig, JoinRequest, MeetingNumber, ProviderError, SessionError, SessionId,
    SessionState, TimeoutConfig,
};
use tracing::{debug, info, instrument, warn};

use crate::classifier;
use crate::ports::{MountSurface, NoopObserver, ProviderClient, ProviderSdk, SessionObserver};

type SharedInit = Shared<BoxFuture<'static, Result<SessionId, SessionError>>>;

/// Handle to the process-wide provider client.
///
/// Cheap to clone; every clone drives the same client.
#[derive(Clone)]
pub struct SessionManager {
    core: Arc<ManagerCore>,
}

struct ManagerCore {
    sdk: Arc<dyn ProviderSdk>,
    surface: Arc<dyn MountSurface>,
    observer: RwLock<Arc<dyn SessionObserver>>,
    timeouts: TimeoutConfig,
    gate: tokio::sync::Mutex<()>,
    inner: Mutex<Inner>,
    cleaning: AtomicBool,
    teardown_epoch: AtomicU64,
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    handle: Option<ClientHandle>,
    pending_init: Option<PendingInit>,
    next_generation: u64,
    joins: u64,
}

struct ClientHandle {
    client: Arc<dyn ProviderClient>,
    container: ContainerId,
    session_id: SessionId,
    meeting: Option<MeetingNumber>,
}

struct PendingInit {
    container: ContainerId,
    generation: u64,
    future: SharedInit,
}

impl SessionManager {
    /// Create a manager with no client. Nothing touches the provider until
    /// [`initialize`](Self::initialize).
    pub fn new(
        sdk: Arc<dyn ProviderSdk>,
        surface: Arc<dyn MountSurface>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            core: Arc::new(ManagerCore {
                sdk,
                surface,
                observer: RwLock::new(Arc::new(NoopObserver)),
                timeouts,
                gate: tokio::sync::Mutex::new(()),
                inner: Mutex::new(Inner::default()),
                cleaning: AtomicBool::new(false),
                teardown_epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Route lifecycle callbacks to `observer`.
    pub fn with_observer(self, observer: Arc<dyn SessionObserver>) -> Self {
        *self.core.observer.write() = observer;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.core.inner.lock().state
    }

    /// Whether the client is in a meeting right now.
    pub fn is_joined(&self) -> bool {
        self.state() == SessionState::Joined
    }

    /// Id of the bound client, `None` while uninitialized.
    pub fn session_id(&self) -> Option<SessionId> {
        self.core.inner.lock().handle.as_ref().map(|h| h.session_id)
    }

    /// Container the client is bound to.
    pub fn container(&self) -> Option<ContainerId> {
        self.core.inner.lock().handle.as_ref().map(|h| h.container.clone())
    }

    /// Normalized number of the meeting currently joined.
    pub fn meeting_number(&self) -> Option<MeetingNumber> {
        self.core.inner.lock().handle.as_ref().and_then(|h| h.meeting.clone())
    }

    /// Number of successful joins so far. Increases by one per join.
    pub fn join_count(&self) -> u64 {
        self.core.inner.lock().joins
    }

    /// Number of external teardowns requested so far.
    pub fn teardown_epoch(&self) -> u64 {
        self.core.teardown_epoch.load(Ordering::SeqCst)
    }

    /// Create a client bound to `container`.
    ///
    /// Returns the existing session when a client is already bound to the
    /// same container. A client bound to a different container is cleaned up
    /// first.
    ///
    /// # Errors
    /// `SessionError::InitializationFailure` when the provider refuses or
    /// times out; the manager is back in `Uninitialized` afterwards.
    pub async fn initialize(&self, container: &ContainerId) -> Result<SessionId, SessionError> {
        self.initialize_guarded(container, None).await
    }

    /// [`initialize`](Self::initialize), refused with `Cancelled` once a
    /// teardown newer than `epoch` has been requested.
    pub(crate) async fn initialize_within(
        &self,
        container: &ContainerId,
        epoch: u64,
    ) -> Result<SessionId, SessionError> {
        self.initialize_guarded(container, Some(epoch)).await
    }

    async fn initialize_guarded(
        &self,
        container: &ContainerId,
        epoch: Option<u64>,
    ) -> Result<SessionId, SessionError> {
        self.core.check_epoch(epoch)?;
        let future = {
            let mut inner = self.core.inner.lock();
            if let Some(handle) = inner.handle.as_ref().filter(|h| h.container == *container) {
                return Ok(handle.session_id);
            }

            match inner.pending_init.as_ref().filter(|p| p.container == *container) {
                Some(pending) => {
                    debug!(container = %container, "joining in-flight initialization");
                    pending.future.clone()
                }
                None => {
                    inner.next_generation += 1;
                    let generation = inner.next_generation;
                    let core = Arc::clone(&self.core);
                    let target = container.clone();
                    let future = async move { core.run_initialize(target, generation, epoch).await }
                        .boxed()
                        .shared();
                    inner.pending_init = Some(PendingInit {
                        container: container.clone(),
                        generation,
                        future: future.clone(),
                    });
                    future
                }
            }
        };

        future.await
    }

    /// Join a meeting with the initialized client.
    ///
    /// A manager that is already `Joined` leaves the current meeting first.
    ///
    /// # Errors
    /// - `InvalidMeetingNumber` / `MissingHostToken` before any provider call
    /// - `NotReady` without an initialized client
    /// - a classified `SessionError::Join` when the provider rejects the join;
    ///   the client stays `Ready`
    pub async fn join(&self, request: JoinRequest) -> Result<(), SessionError> {
        self.join_guarded(request, None).await
    }

    /// [`join`](Self::join), refused with `Cancelled` once a teardown newer
    /// than `epoch` has been requested.
    pub(crate) async fn join_within(
        &self,
        request: JoinRequest,
        epoch: u64,
    ) -> Result<(), SessionError> {
        self.join_guarded(request, Some(epoch)).await
    }

    async fn join_guarded(
        &self,
        request: JoinRequest,
        epoch: Option<u64>,
    ) -> Result<(), SessionError> {
        let meeting_number = MeetingNumber::parse(&request.meeting_number)?;
        if request.role.is_host() && request.credentials.zak_token.is_none() {
            return Err(SessionError::MissingHostToken);
        }

        let config = JoinConfig {
            meeting_number,
            credentials: request.credentials,
            identity: request.identity,
            role: request.role,
            password: request.password,
        };

        let _gate = self.core.gate.lock().await;
        self.core.check_epoch(epoch)?;
        self.core.join_locked(config).await
    }

    /// Leave the current meeting. Provider errors are logged, never returned.
    ///
    /// Unlike [`cleanup`](Self::cleanup) this keeps the client, so it does
    /// not cancel work in flight.
    pub async fn leave(&self) {
        let _gate = self.core.gate.lock().await;
        self.core.leave_locked().await;
    }

    /// Leave (if joined), destroy the client and clear the container.
    ///
    /// Idempotent. Runs to completion even if the caller stops waiting; a
    /// call made while another cleanup is running returns immediately.
    /// Bumps the teardown epoch, which cancels any join run in flight.
    pub async fn cleanup(&self) {
        self.core.teardown_epoch.fetch_add(1, Ordering::SeqCst);
        self.await_cleanup().await;
    }

    /// Start cleanup without waiting for it (page unload path).
    pub fn cleanup_detached(&self) {
        self.core.teardown_epoch.fetch_add(1, Ordering::SeqCst);
        drop(self.spawn_cleanup());
    }

    /// Tear the client down for a reconnect. Leaves the epoch alone, so the
    /// run asking for it keeps going.
    pub(crate) async fn recycle(&self) {
        self.await_cleanup().await;
    }

    async fn await_cleanup(&self) {
        if let Some(task) = self.spawn_cleanup() {
            if let Err(e) = task.await {
                warn!(error = %e, "cleanup task failed");
            }
        }
    }

    fn spawn_cleanup(&self) -> Option<tokio::task::JoinHandle<()>> {
        if self.core.cleaning.swap(true, Ordering::SeqCst) {
            debug!("cleanup already in progress");
            return None;
        }

        // Dropping our clone of an abandoned init releases the gate it may hold.
        let abandoned = self.core.inner.lock().pending_init.take();
        drop(abandoned);

        let core = Arc::clone(&self.core);
        Some(tokio::spawn(async move {
            {
                let _gate = core.gate.lock().await;
                core.cleanup_locked().await;
            }
            core.cleaning.store(false, Ordering::SeqCst);
        }))
    }
}

impl ManagerCore {
    fn observer(&self) -> Arc<dyn SessionObserver> {
        Arc::clone(&self.observer.read())
    }

    fn set_state(&self, state: SessionState) {
        self.inner.lock().state = state;
    }

    fn check_epoch(&self, expected: Option<u64>) -> Result<(), SessionError> {
        match expected {
            Some(epoch) if epoch != self.teardown_epoch.load(Ordering::SeqCst) => {
                debug!(epoch, "teardown requested since this operation started");
                Err(SessionError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    async fn run_initialize(
        self: Arc<Self>,
        container: ContainerId,
        generation: u64,
        epoch: Option<u64>,
    ) -> Result<SessionId, SessionError> {
        let result = {
            let _gate = self.gate.lock().await;
            match self.check_epoch(epoch) {
                Ok(()) => self.initialize_locked(&container).await,
                Err(e) => Err(e),
            }
        };

        let mut inner = self.inner.lock();
        if inner.pending_init.as_ref().is_some_and(|p| p.generation == generation) {
            inner.pending_init = None;
        }
        result
    }

    #[instrument(skip_all, fields(container = %container))]
    async fn initialize_locked(&self, container: &ContainerId) -> Result<SessionId, SessionError> {
        let bound = {
            let inner = self.inner.lock();
            inner.handle.as_ref().map(|h| (h.container.clone(), h.session_id))
        };
        match bound {
            Some((current, session_id)) if current == *container => return Ok(session_id),
            Some((current, _)) => {
                info!(previous = %current, "client bound to another container; cleaning up first");
                self.cleanup_locked().await;
            }
            None => {}
        }

        self.set_state(SessionState::Initializing);
        self.surface.clear(container).await;

        let limit = self.timeouts.operation();
        let client = match bounded(limit, "create client", self.sdk.create_client()).await {
            Ok(client) => client,
            Err(e) => {
                self.set_state(SessionState::Uninitialized);
                warn!(error = %e, "provider client could not be created");
                return Err(SessionError::InitializationFailure(e.to_string()));
            }
        };

        if let Err(e) = bounded(limit, "init", client.init(container)).await {
            warn!(error = %e, "provider client init failed");
            if let Err(destroy_err) =
                bounded(self.timeouts.teardown(), "destroy", client.destroy()).await
            {
                warn!(error = %destroy_err, "destroy after failed init also failed");
            }
            self.set_state(SessionState::Uninitialized);
            return Err(SessionError::InitializationFailure(e.to_string()));
        }

        let session_id = SessionId::new();
        {
            let mut inner = self.inner.lock();
            inner.handle = Some(ClientHandle {
                client,
                container: container.clone(),
                session_id,
                meeting: None,
            });
            inner.state = SessionState::Ready;
        }
        info!(session_id = %session_id, "provider client ready");
        self.observer().on_ready();

        Ok(session_id)
    }

    #[instrument(skip(self, config), fields(meeting_number = %config.meeting_number, role = %config.role))]
    async fn join_locked(&self, config: JoinConfig) -> Result<(), SessionError> {
        if self.inner.lock().state == SessionState::Joined {
            info!("already in a meeting; leaving before joining again");
            self.leave_locked().await;
        }

        let (client, session_id) = {
            let mut inner = self.inner.lock();
            let Some(handle) = inner.handle.as_ref().filter(|_| inner.state == SessionState::Ready)
            else {
                return Err(SessionError::NotReady);
            };
            let pair = (Arc::clone(&handle.client), handle.session_id);
            inner.state = SessionState::Joining;
            pair
        };

        match bounded(self.timeouts.operation(), "join", client.join(&config)).await {
            Ok(()) => {
                {
                    let mut inner = self.inner.lock();
                    inner.state = SessionState::Joined;
                    inner.joins += 1;
                    if let Some(handle) = inner.handle.as_mut() {
                        handle.meeting = Some(config.meeting_number.clone());
                    }
                }
                info!(session_id = %session_id, "joined meeting");
                self.observer().on_joined();
                Ok(())
            }
            Err(e) => {
                self.set_state(SessionState::Ready);
                let err = classifier::join_error(&e);
                warn!(session_id = %session_id, code = ?e.code, error = %err, "join rejected");
                Err(err)
            }
        }
    }

    async fn leave_locked(&self) {
        let client = {
            let inner = self.inner.lock();
            if inner.state != SessionState::Joined {
                debug!(state = %inner.state, "leave ignored; not in a meeting");
                return;
            }
            inner.handle.as_ref().map(|h| Arc::clone(&h.client))
        };

        if let Some(client) = client {
            if let Err(e) = bounded(self.timeouts.teardown(), "leave", client.leave()).await {
                warn!(error = %e, "provider leave failed; continuing");
            }
        }

        {
            let mut inner = self.inner.lock();
            inner.state = SessionState::Ready;
            if let Some(handle) = inner.handle.as_mut() {
                handle.meeting = None;
            }
        }
        info!("left meeting");
        self.observer().on_left();
    }

    #[instrument(skip(self))]
    async fn cleanup_locked(&self) {
        let (previous, handle) = {
            let mut inner = self.inner.lock();
            let previous = inner.state;
            inner.state = SessionState::Cleaning;
            (previous, inner.handle.take())
        };

        if let Some(handle) = handle {
            let teardown = self.timeouts.teardown();
            if previous == SessionState::Joined {
                if let Err(e) = bounded(teardown, "leave", handle.client.leave()).await {
                    warn!(error = %e, "provider leave failed during cleanup");
                }
                self.observer().on_left();
            }
            if let Err(e) = bounded(teardown, "destroy", handle.client.destroy()).await {
                warn!(error = %e, "provider destroy failed during cleanup");
            }
            self.surface.clear(&handle.container).await;
            info!(session_id = %handle.session_id, "session cleaned up");
        } else {
            debug!(state = %previous, "cleanup with no client");
        }

        self.set_state(SessionState::Uninitialized);
    }
}

/// Run a provider call under a deadline; a timeout becomes a provider error.
async fn bounded<T>(
    limit: Duration,
    operation: &str,
    call: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::reason(format!(
            "{operation} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use async_trait::async_trait;
    use roomlink_domain::{ContainerLayout, Credentials, ErrorCategory, Role, UserIdentity};

    use super::*;

    #[derive(Default)]
    struct Counts {
        init: AtomicU32,
        join: AtomicU32,
        leave: AtomicU32,
        destroy: AtomicU32,
    }

    struct FakeClient {
        counts: Arc<Counts>,
        join_error: Option<ProviderError>,
        init_delay: Duration,
    }

    #[async_trait]
    impl ProviderClient for FakeClient {
        async fn init(&self, _container: &ContainerId) -> Result<(), ProviderError> {
            tokio::time::sleep(self.init_delay).await;
            self.counts.init.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn join(&self, _config: &JoinConfig) -> Result<(), ProviderError> {
            self.counts.join.fetch_add(1, Ordering::SeqCst);
            self.join_error.clone().map_or(Ok(()), Err)
        }

        async fn leave(&self) -> Result<(), ProviderError> {
            self.counts.leave.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::reason("leave is flaky"))
        }

        async fn destroy(&self) -> Result<(), ProviderError> {
            self.counts.destroy.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeSdk {
        counts: Arc<Counts>,
        join_error: Option<ProviderError>,
    }

    #[async_trait]
    impl ProviderSdk for FakeSdk {
        async fn create_client(&self) -> Result<Arc<dyn ProviderClient>, ProviderError> {
            Ok(Arc::new(FakeClient {
                counts: Arc::clone(&self.counts),
                join_error: self.join_error.clone(),
                init_delay: Duration::from_millis(10),
            }))
        }
    }

    struct NullSurface;

    #[async_trait]
    impl MountSurface for NullSurface {
        async fn inspect(&self, _container: &ContainerId) -> Option<ContainerLayout> {
            Some(ContainerLayout::shown(1.0, 1.0))
        }

        async fn clear(&self, _container: &ContainerId) {}
    }

    fn manager(join_error: Option<ProviderError>) -> (SessionManager, Arc<Counts>) {
        let counts = Arc::new(Counts::default());
        let sdk = Arc::new(FakeSdk { counts: Arc::clone(&counts), join_error });
        (SessionManager::new(sdk, Arc::new(NullSurface), TimeoutConfig::default()), counts)
    }

    fn request(meeting_number: &str) -> JoinRequest {
        JoinRequest {
            meeting_number: meeting_number.into(),
            credentials: Credentials::new("key", "sig", 3600),
            identity: UserIdentity::new("Ada"),
            role: Role::Attendee,
            password: None,
        }
    }

    /// Validates a full initialize → join → cleanup cycle.
    ///
    /// Assertions:
    /// - Confirms the state after each step.
    /// - Confirms a swallowed leave error still ends in `Uninitialized`.
    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_cycle() {
        let (manager, counts) = manager(None);
        let container = ContainerId::new("root");

        manager.initialize(&container).await.unwrap();
        assert_eq!(manager.state(), SessionState::Ready);

        manager.join(request("123 456 7890")).await.unwrap();
        assert!(manager.is_joined());
        assert_eq!(manager.meeting_number().unwrap().as_str(), "1234567890");

        manager.cleanup().await;
        assert_eq!(manager.state(), SessionState::Uninitialized);
        assert_eq!(counts.leave.load(Ordering::SeqCst), 1);
        assert_eq!(counts.destroy.load(Ordering::SeqCst), 1);
        assert!(manager.session_id().is_none());
    }

    /// Validates local rejection before any provider call.
    ///
    /// Assertions:
    /// - Ensures a short meeting number is rejected without joining.
    /// - Ensures a host join without a ZAK token is rejected.
    #[tokio::test(start_paused = true)]
    async fn test_join_validates_locally() {
        let (manager, counts) = manager(None);
        manager.initialize(&ContainerId::new("root")).await.unwrap();

        let err = manager.join(request("12345")).await.unwrap_err();
        assert_eq!(err, SessionError::InvalidMeetingNumber("12345".into()));

        let host = JoinRequest { role: Role::Host, ..request("1234567890") };
        assert_eq!(manager.join(host).await.unwrap_err(), SessionError::MissingHostToken);

        assert_eq!(counts.join.load(Ordering::SeqCst), 0);
    }

    /// Validates join failure handling.
    ///
    /// Assertions:
    /// - Ensures the provider code is classified.
    /// - Ensures the client stays `Ready`.
    #[tokio::test(start_paused = true)]
    async fn test_join_failure_keeps_client_ready() {
        let (manager, _) = manager(Some(ProviderError::code(3003)));
        manager.initialize(&ContainerId::new("root")).await.unwrap();

        let err = manager.join(request("1234567890")).await.unwrap_err();
        assert_eq!(err.category(), Some(ErrorCategory::MeetingLocked));
        assert_eq!(manager.state(), SessionState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_without_client_is_not_ready() {
        let (manager, _) = manager(None);
        assert_eq!(manager.join(request("1234567890")).await.unwrap_err(), SessionError::NotReady);
    }

    /// Validates re-joining while already joined.
    ///
    /// Assertions:
    /// - Confirms the current meeting is left before the second join.
    #[tokio::test(start_paused = true)]
    async fn test_join_while_joined_leaves_first() {
        let (manager, counts) = manager(None);
        manager.initialize(&ContainerId::new("root")).await.unwrap();
        manager.join(request("1234567890")).await.unwrap();
        manager.join(request("09876543210")).await.unwrap();

        assert_eq!(counts.leave.load(Ordering::SeqCst), 1);
        assert_eq!(counts.join.load(Ordering::SeqCst), 2);
        assert_eq!(manager.meeting_number().unwrap().as_str(), "09876543210");
    }

    /// Validates switching containers.
    ///
    /// Assertions:
    /// - Ensures the old client is destroyed before the new one is bound.
    #[tokio::test(start_paused = true)]
    async fn test_initialize_other_container_cleans_up() {
        let (manager, counts) = manager(None);
        let first = manager.initialize(&ContainerId::new("a")).await.unwrap();
        let second = manager.initialize(&ContainerId::new("b")).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(counts.destroy.load(Ordering::SeqCst), 1);
        assert_eq!(counts.init.load(Ordering::SeqCst), 2);
        assert_eq!(manager.container().unwrap().as_str(), "b");
    }

    /// Validates that a teardown refuses work started before it.
    ///
    /// Assertions:
    /// - Ensures `initialize_within` and `join_within` with a stale epoch
    ///   return `Cancelled` without reaching the provider.
    /// - Ensures a reconnect recycle leaves the epoch alone.
    /// - Confirms `join_count` only moves on a successful join.
    #[tokio::test(start_paused = true)]
    async fn test_teardown_epoch_cancels_stale_operations() {
        let (manager, counts) = manager(None);
        let container = ContainerId::new("root");
        let stale = manager.teardown_epoch();

        manager.cleanup().await;
        assert_eq!(manager.teardown_epoch(), stale + 1);
        let err = manager.initialize_within(&container, stale).await.unwrap_err();
        assert_eq!(err, SessionError::Cancelled);
        assert_eq!(counts.init.load(Ordering::SeqCst), 0);

        let current = manager.teardown_epoch();
        manager.initialize_within(&container, current).await.unwrap();
        manager.join_within(request("1234567890"), current).await.unwrap();
        assert_eq!(manager.join_count(), 1);

        manager.recycle().await;
        assert_eq!(manager.teardown_epoch(), current);
        manager.initialize_within(&container, current).await.unwrap();

        manager.cleanup().await;
        let err = manager.join_within(request("1234567890"), current).await.unwrap_err();
        assert_eq!(err, SessionError::Cancelled);
        assert_eq!(counts.join.load(Ordering::SeqCst), 1);
        assert_eq!(manager.join_count(), 1);
    }
}
