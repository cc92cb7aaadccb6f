//! # RoomLink Core
//!
//! Session lifecycle for an embedded meeting client.
//!
//! This crate contains:
//! - Port traits for the host environment (`ports`)
//! - Container readiness prober and SDK loader
//! - The session manager that owns the single provider client
//! - Join orchestration with classified retries
//! - Exit/cleanup coordination and the status board
//!
//! ## Architecture Principles
//! - Depends on `roomlink-common` and `roomlink-domain` only
//! - No HTTP or document access; everything external goes through a port
//! - Time-dependent logic runs on tokio's clock, so tests can pause it

pub mod classifier;
pub mod exit;
pub mod loader;
pub mod orchestrator;
pub mod ports;
pub mod readiness;
pub mod session;
pub mod status;

pub use classifier::{classify, CODE_TABLE};
pub use exit::{CoordinatorError, ExitCoordinator};
pub use loader::SdkLoader;
pub use orchestrator::{retry_config, JoinOrchestrator, JoinRetryPolicy};
pub use ports::{
    CredentialIssuer, MountSurface, NoopObserver, ProviderClient, ProviderSdk, SdkAssets,
    SessionObserver,
};
pub use readiness::ContainerProber;
pub use session::SessionManager;
pub use status::StatusBoard;
