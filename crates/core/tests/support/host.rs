//! Host-side fakes: mount surface, SDK assets, credential issuer, observer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use roomlink_core::{CredentialIssuer, MountSurface, SdkAssets, SessionObserver};
use roomlink_domain::{
    ContainerId, ContainerLayout, CredentialError, Credentials, MeetingNumber, ProviderError, Role,
};
use tokio::time::Instant;

/// Mount point that shows up with a usable layout at a fixed time.
pub struct FakeSurface {
    appears_at: Instant,
    pub clears: AtomicU32,
}

impl FakeSurface {
    pub fn present() -> Self {
        Self::appearing_after(Duration::ZERO)
    }

    pub fn appearing_after(delay: Duration) -> Self {
        Self { appears_at: Instant::now() + delay, clears: AtomicU32::new(0) }
    }
}

#[async_trait]
impl MountSurface for FakeSurface {
    async fn inspect(&self, _container: &ContainerId) -> Option<ContainerLayout> {
        (Instant::now() >= self.appears_at).then(|| ContainerLayout::shown(1280.0, 720.0))
    }

    async fn clear(&self, _container: &ContainerId) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// SDK assets that are available immediately.
pub struct InstantAssets;

#[async_trait]
impl SdkAssets for InstantAssets {
    async fn ensure_globals(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn load_stylesheet(&self, _url: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn load_script(&self, _url: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn entry_point_ready(&self) -> bool {
        true
    }
}

/// Issuer that mints a distinct signature per call (`signature-1`,
/// `signature-2`, ...), optionally failing or expiring specific calls.
#[derive(Default)]
pub struct ScriptedIssuer {
    calls: AtomicU32,
    failures: Mutex<VecDeque<Option<CredentialError>>>,
    expired_calls: Mutex<Vec<u32>>,
    zak_token: Option<String>,
    pub requests: Mutex<Vec<(String, Role)>>,
}

impl ScriptedIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-call outcomes in order: `Some(err)` fails that call, `None` issues.
    pub fn with_outcomes(self, outcomes: Vec<Option<CredentialError>>) -> Self {
        self.failures.lock().extend(outcomes);
        self
    }

    /// Issue already-expired credentials on the given 1-based calls.
    pub fn expiring_on(self, calls: Vec<u32>) -> Self {
        *self.expired_calls.lock() = calls;
        self
    }

    pub fn with_zak_token(mut self, token: &str) -> Self {
        self.zak_token = Some(token.to_string());
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialIssuer for ScriptedIssuer {
    async fn issue(
        &self,
        meeting_number: &MeetingNumber,
        role: Role,
    ) -> Result<Credentials, CredentialError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push((meeting_number.to_string(), role));

        if let Some(Some(err)) = self.failures.lock().pop_front() {
            return Err(err);
        }

        let lifetime = if self.expired_calls.lock().contains(&call) { 0 } else { 7200 };
        let credentials = Credentials::new("sdk-key", format!("signature-{call}"), lifetime);
        Ok(match &self.zak_token {
            Some(token) => credentials.with_zak_token(token.clone()),
            None => credentials,
        })
    }
}

/// Observer that counts callbacks.
#[derive(Default)]
pub struct RecordingObserver {
    pub ready: AtomicU32,
    pub joined: AtomicU32,
    pub left: AtomicU32,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn joined_count(&self) -> u32 {
        self.joined.load(Ordering::SeqCst)
    }

    pub fn left_count(&self) -> u32 {
        self.left.load(Ordering::SeqCst)
    }

    pub fn ready_count(&self) -> u32 {
        self.ready.load(Ordering::SeqCst)
    }
}

impl SessionObserver for RecordingObserver {
    fn on_ready(&self) {
        self.ready.fetch_add(1, Ordering::SeqCst);
    }

    fn on_joined(&self) {
        self.joined.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }

    fn on_left(&self) {
        self.left.fetch_add(1, Ordering::SeqCst);
    }
}
