//! Integration tests for `SessionManager`
//!
//! Covers the invariants that keep the single provider client safe:
//! idempotent cleanup, deduplicated initialization, and cleanup ordering
//! against in-flight operations.

mod support;

use std::sync::Arc;
use std::time::Duration;

use roomlink_core::SessionManager;
use roomlink_domain::{
    ContainerId, Credentials, JoinRequest, ProviderError, Role, SessionError, SessionState,
    TimeoutConfig, UserIdentity,
};
use support::{FakeProvider, FakeSurface, RecordingObserver, CONTAINER};

fn manager(provider: FakeProvider) -> (SessionManager, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let manager =
        SessionManager::new(Arc::new(provider), Arc::new(FakeSurface::present()), TimeoutConfig::default())
            .with_observer(observer.clone());
    (manager, observer)
}

fn request() -> JoinRequest {
    JoinRequest {
        meeting_number: "1234567890".into(),
        credentials: Credentials::new("sdk-key", "signature-1", 3600),
        identity: UserIdentity::new("Ada Lovelace").with_email("ada@example.com"),
        role: Role::Attendee,
        password: None,
    }
}

/// Validates idempotent cleanup across every state sequence.
///
/// # Test Steps
/// 1. Initialize and join
/// 2. Call `cleanup()` five times, sequentially and concurrently
/// 3. Assert one leave/destroy pair and an `Uninitialized` manager
#[tokio::test(start_paused = true)]
async fn test_cleanup_is_idempotent() {
    let provider = FakeProvider::new();
    let calls = provider.calls();
    let (manager, observer) = manager(provider);
    let container = ContainerId::new(CONTAINER);

    manager.initialize(&container).await.unwrap();
    manager.join(request()).await.unwrap();

    tokio::join!(manager.cleanup(), manager.cleanup(), manager.cleanup());
    manager.cleanup().await;
    manager.cleanup().await;

    assert_eq!(calls.leaves(), 1);
    assert_eq!(calls.destroys(), 1);
    assert_eq!(observer.left_count(), 1);
    assert_eq!(manager.state(), SessionState::Uninitialized);
}

/// Validates cleanup from states without a client.
///
/// # Test Steps
/// 1. Call `cleanup()` on a fresh manager
/// 2. Initialize, then clean up twice
/// 3. Assert no leave (never joined) and exactly one destroy
#[tokio::test(start_paused = true)]
async fn test_cleanup_from_ready_and_uninitialized() {
    let provider = FakeProvider::new();
    let calls = provider.calls();
    let (manager, observer) = manager(provider);

    manager.cleanup().await;
    assert_eq!(calls.destroys(), 0);

    manager.initialize(&ContainerId::new(CONTAINER)).await.unwrap();
    manager.cleanup().await;
    manager.cleanup().await;

    assert_eq!(calls.leaves(), 0);
    assert_eq!(calls.destroys(), 1);
    assert_eq!(observer.left_count(), 0);
    assert_eq!(manager.state(), SessionState::Uninitialized);
}

/// Validates that concurrent initialization is deduplicated.
///
/// # Test Steps
/// 1. Start two `initialize()` calls for the same container while init takes 200ms
/// 2. Assert one provider `init` call
/// 3. Assert both callers got the same session id
#[tokio::test(start_paused = true)]
async fn test_concurrent_initialize_shares_result() {
    let provider = FakeProvider::new().with_init_delay(Duration::from_millis(200));
    let calls = provider.calls();
    let (manager, observer) = manager(provider);
    let container = ContainerId::new(CONTAINER);

    let (first, second) = tokio::join!(manager.initialize(&container), manager.initialize(&container));

    assert_eq!(calls.inits(), 1);
    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(observer.ready_count(), 1);
    assert_eq!(manager.state(), SessionState::Ready);
}

/// Validates that concurrent initialization failures are shared too.
///
/// # Test Steps
/// 1. Make provider `init` fail
/// 2. Run two concurrent `initialize()` calls
/// 3. Assert one init, the same error for both, and an `Uninitialized` manager
#[tokio::test(start_paused = true)]
async fn test_concurrent_initialize_shares_failure() {
    let provider = FakeProvider::new()
        .with_init_delay(Duration::from_millis(50))
        .with_init_error(ProviderError::code(9001).with_reason("duplicate init"));
    let calls = provider.calls();
    let (manager, _) = manager(provider);
    let container = ContainerId::new(CONTAINER);

    let (first, second) = tokio::join!(manager.initialize(&container), manager.initialize(&container));

    assert_eq!(calls.inits(), 1);
    assert_eq!(first, second);
    assert!(matches!(first, Err(SessionError::InitializationFailure(_))));
    assert_eq!(calls.destroys(), 1);
    assert_eq!(manager.state(), SessionState::Uninitialized);
}

/// Validates that a repeated initialize on a bound container is free.
///
/// # Test Steps
/// 1. Initialize once
/// 2. Initialize the same container again
/// 3. Assert the same session id and no second provider init
#[tokio::test(start_paused = true)]
async fn test_initialize_same_container_reuses_session() {
    let provider = FakeProvider::new();
    let calls = provider.calls();
    let (manager, _) = manager(provider);
    let container = ContainerId::new(CONTAINER);

    let first = manager.initialize(&container).await.unwrap();
    let second = manager.initialize(&container).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.inits(), 1);
}

/// Validates that cleanup waits for an in-flight initialization.
///
/// # Test Steps
/// 1. Start `initialize()` with a 500ms provider init
/// 2. Request cleanup 100ms later
/// 3. Assert the client that init produced is destroyed and the manager ends `Uninitialized`
#[tokio::test(start_paused = true)]
async fn test_cleanup_waits_for_in_flight_initialize() {
    let provider = FakeProvider::new().with_init_delay(Duration::from_millis(500));
    let calls = provider.calls();
    let (manager, _) = manager(provider);

    let init_manager = manager.clone();
    let init = tokio::spawn(async move {
        init_manager.initialize(&ContainerId::new(CONTAINER)).await
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    manager.cleanup().await;

    assert!(init.await.unwrap().is_ok());
    assert_eq!(calls.inits(), 1);
    assert_eq!(calls.destroys(), 1);
    assert_eq!(manager.state(), SessionState::Uninitialized);
    assert!(manager.session_id().is_none());
}

/// Validates the detached cleanup used on page unload.
///
/// # Test Steps
/// 1. Initialize and join
/// 2. Call `cleanup_detached()` and yield to the runtime
/// 3. Assert one leave/destroy pair
#[tokio::test(start_paused = true)]
async fn test_cleanup_detached_runs_in_background() {
    let provider = FakeProvider::new();
    let calls = provider.calls();
    let (manager, _) = manager(provider);

    manager.initialize(&ContainerId::new(CONTAINER)).await.unwrap();
    manager.join(request()).await.unwrap();

    manager.cleanup_detached();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(calls.leaves(), 1);
    assert_eq!(calls.destroys(), 1);
    assert_eq!(manager.state(), SessionState::Uninitialized);
}

/// Validates leave semantics.
///
/// # Test Steps
/// 1. Leave without joining (no provider call)
/// 2. Join, then leave
/// 3. Assert one leave, a `Ready` client and one `on_left`
#[tokio::test(start_paused = true)]
async fn test_leave_returns_to_ready() {
    let provider = FakeProvider::new();
    let calls = provider.calls();
    let (manager, observer) = manager(provider);

    manager.initialize(&ContainerId::new(CONTAINER)).await.unwrap();
    manager.leave().await;
    assert_eq!(calls.leaves(), 0);

    manager.join(request()).await.unwrap();
    manager.leave().await;

    assert_eq!(calls.leaves(), 1);
    assert_eq!(observer.left_count(), 1);
    assert_eq!(manager.state(), SessionState::Ready);
    assert!(manager.meeting_number().is_none());
}

/// Validates host joins.
///
/// # Test Steps
/// 1. Join as host with a ZAK token
/// 2. Assert the join reached the provider
#[tokio::test(start_paused = true)]
async fn test_host_join_with_zak_token() {
    let provider = FakeProvider::new();
    let calls = provider.calls();
    let (manager, _) = manager(provider);
    manager.initialize(&ContainerId::new(CONTAINER)).await.unwrap();

    let mut host = request();
    host.role = Role::Host;
    host.credentials = host.credentials.with_zak_token("zak");
    manager.join(host).await.unwrap();

    assert_eq!(calls.joins(), 1);
    assert!(manager.is_joined());
}
