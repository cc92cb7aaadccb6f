//! Shared fakes for `roomlink-core` integration tests.
//!
//! Every port has a counting fake so tests assert on how often the provider
//! and the credential issuer were actually called.

#![allow(dead_code)]

pub mod host;
pub mod provider;

use std::sync::Arc;

use roomlink_core::{
    ContainerProber, ExitCoordinator, JoinOrchestrator, SdkLoader, SessionManager, StatusBoard,
};
use roomlink_domain::{
    JoinTarget, LoaderConfig, ProbeConfig, RetrySettings, Role, TimeoutConfig, UserIdentity,
};

pub use host::{FakeSurface, InstantAssets, RecordingObserver, ScriptedIssuer};
pub use provider::{FakeProvider, ProviderCalls};

pub const CONTAINER: &str = "meeting-root";

/// Fully wired lifecycle over fakes.
pub struct Harness {
    pub calls: Arc<ProviderCalls>,
    pub issuer: Arc<ScriptedIssuer>,
    pub observer: Arc<RecordingObserver>,
    pub surface: Arc<FakeSurface>,
    pub manager: SessionManager,
    pub orchestrator: JoinOrchestrator,
    pub status: StatusBoard,
}

impl Harness {
    pub fn new(provider: FakeProvider, surface: FakeSurface, issuer: ScriptedIssuer) -> Self {
        Self::with_settings(provider, surface, issuer, RetrySettings::default())
    }

    pub fn with_settings(
        provider: FakeProvider,
        surface: FakeSurface,
        issuer: ScriptedIssuer,
        settings: RetrySettings,
    ) -> Self {
        let calls = provider.calls();
        let observer = Arc::new(RecordingObserver::default());
        let surface = Arc::new(surface);
        let issuer = Arc::new(issuer);
        let status = StatusBoard::new(settings.max_retries);

        let manager = SessionManager::new(
            Arc::new(provider),
            surface.clone(),
            TimeoutConfig::default(),
        )
        .with_observer(observer.clone());
        let prober = Arc::new(ContainerProber::new(surface.clone(), &ProbeConfig::default()));
        let loader = Arc::new(SdkLoader::new(Arc::new(InstantAssets), LoaderConfig::default()));
        let orchestrator = JoinOrchestrator::new(manager.clone(), prober, loader, issuer.clone())
            .with_settings(settings)
            .with_status(status.clone())
            .with_observer(observer.clone());

        Self { calls, issuer, observer, surface, manager, orchestrator, status }
    }

    pub fn exit_coordinator(&self) -> ExitCoordinator {
        ExitCoordinator::new(self.manager.clone()).with_status(self.status.clone())
    }
}

pub fn target(meeting_number: &str) -> JoinTarget {
    JoinTarget::new(meeting_number, Role::Attendee, UserIdentity::new("Ada Lovelace"), CONTAINER)
}
