//! Port interfaces for the session lifecycle
//!
//! These traits define the boundary between the lifecycle components and
//! the host environment (document, provider SDK, credential backend).
//! Every provider-facing call reports failure as a [`ProviderError`].

use std::sync::Arc;

use async_trait::async_trait;
use roomlink_domain::{
    ContainerId, ContainerLayout, CredentialError, Credentials, JoinConfig, MeetingNumber,
    ProviderError, Role,
};

/// Read-only layout queries plus the one mutation the provider needs.
#[async_trait]
pub trait MountSurface: Send + Sync {
    /// Current layout of the container, `None` when it is not in the document.
    async fn inspect(&self, container: &ContainerId) -> Option<ContainerLayout>;

    /// Remove everything inside the container.
    async fn clear(&self, container: &ContainerId);
}

/// Runtime assets the provider SDK needs before it can be used.
#[async_trait]
pub trait SdkAssets: Send + Sync {
    /// Install globals the SDK expects to find.
    async fn ensure_globals(&self) -> Result<(), ProviderError>;

    /// Load one stylesheet. Failures are logged by the loader, not fatal.
    async fn load_stylesheet(&self, url: &str) -> Result<(), ProviderError>;

    /// Fetch and evaluate the SDK script.
    async fn load_script(&self, url: &str) -> Result<(), ProviderError>;

    /// Whether the SDK's global entry point is defined yet.
    async fn entry_point_ready(&self) -> bool;
}

/// Factory for provider clients, usable once the SDK is loaded.
#[async_trait]
pub trait ProviderSdk: Send + Sync {
    /// Create a fresh, unbound client.
    async fn create_client(&self) -> Result<Arc<dyn ProviderClient>, ProviderError>;
}

/// One provider client instance.
///
/// Only [`crate::SessionManager`] holds these.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Bind the client to an (empty) container.
    async fn init(&self, container: &ContainerId) -> Result<(), ProviderError>;

    /// Enter the meeting described by `config`.
    async fn join(&self, config: &JoinConfig) -> Result<(), ProviderError>;

    /// Leave the current meeting, keeping the client.
    async fn leave(&self) -> Result<(), ProviderError>;

    /// Release the client. It is not used again afterwards.
    async fn destroy(&self) -> Result<(), ProviderError>;
}

/// Issues signed join credentials for a meeting.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// Fresh credentials for one join attempt.
    async fn issue(
        &self,
        meeting_number: &MeetingNumber,
        role: Role,
    ) -> Result<Credentials, CredentialError>;
}

/// Lifecycle callbacks for the presentation layer.
pub trait SessionObserver: Send + Sync {
    /// A client was initialized.
    fn on_ready(&self) {}

    /// A join succeeded.
    fn on_joined(&self) {}

    /// Called with the classified, user-facing message.
    fn on_error(&self, _message: &str) {}

    /// The meeting was left, or the session torn down.
    fn on_left(&self) {}
}

/// Observer that ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
