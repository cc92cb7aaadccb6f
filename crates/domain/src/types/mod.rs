//! Domain types and models

pub mod container;
pub mod credentials;
pub mod join;
pub mod meeting;
pub mod session;

pub use container::{ContainerId, ContainerLayout, ContainerReadiness};
pub use credentials::{Credentials, UserIdentity};
pub use join::{JoinAttempt, JoinConfig, JoinOutcome, JoinRequest, JoinTarget};
pub use meeting::{Meeting, MeetingNumber, Role};
pub use session::{ExitTrigger, SessionId, SessionState, StatusSnapshot};
