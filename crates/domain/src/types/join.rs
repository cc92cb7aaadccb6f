//! Join inputs at each layer boundary
//!
//! - [`JoinTarget`]: what the UI asks the orchestrator for
//! - [`JoinRequest`]: what the orchestrator hands the session manager
//! - [`JoinConfig`]: the validated bundle forwarded to the provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::container::ContainerId;
use super::credentials::{Credentials, UserIdentity};
use super::meeting::{Meeting, MeetingNumber, Role};
use super::session::SessionId;

/// Everything needed to establish a session, before credentials exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTarget {
    /// Raw meeting number as typed or stored; validated before use
    pub meeting_number: String,
    pub role: Role,
    pub identity: UserIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub container: ContainerId,
}

impl JoinTarget {
    pub fn new(
        meeting_number: impl Into<String>,
        role: Role,
        identity: UserIdentity,
        container: impl Into<ContainerId>,
    ) -> Self {
        Self {
            meeting_number: meeting_number.into(),
            role,
            identity,
            password: None,
            container: container.into(),
        }
    }

    /// Build a target from a registry entry, carrying its password.
    pub fn for_meeting(
        meeting: &Meeting,
        role: Role,
        identity: UserIdentity,
        container: impl Into<ContainerId>,
    ) -> Self {
        Self {
            meeting_number: meeting.meeting_number.clone(),
            role,
            identity,
            password: meeting.password.clone(),
            container: container.into(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// A join call against an initialized client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    /// Raw meeting number; the session manager normalizes it
    pub meeting_number: String,
    pub credentials: Credentials,
    pub identity: UserIdentity,
    pub role: Role,
    pub password: Option<String>,
}

impl JoinRequest {
    pub fn from_target(target: &JoinTarget, credentials: Credentials) -> Self {
        Self {
            meeting_number: target.meeting_number.clone(),
            credentials,
            identity: target.identity.clone(),
            role: target.role,
            password: target.password.clone(),
        }
    }
}

/// Validated join configuration handed to the provider client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinConfig {
    pub meeting_number: MeetingNumber,
    pub credentials: Credentials,
    pub identity: UserIdentity,
    pub role: Role,
    pub password: Option<String>,
}

/// One try at joining a specific meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinAttempt {
    pub meeting_number: MeetingNumber,
    pub role: Role,
    /// 1-based, strictly increasing within one orchestration run
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    /// Expiry of the credentials fetched for this attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_expire_at: Option<DateTime<Utc>>,
}

/// Successful orchestration result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub session_id: SessionId,
    pub meeting_number: MeetingNumber,
    pub attempts: Vec<JoinAttempt>,
}

impl JoinOutcome {
    pub fn attempt_count(&self) -> u32 {
        u32::try_from(self.attempts.len()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    /// Validates `JoinTarget::for_meeting`.
    ///
    /// Assertions:
    /// - Confirms the raw meeting number and password are carried over.
    #[test]
    fn test_target_from_registry_entry() {
        let meeting = Meeting {
            meeting_number: "123 456 7890".into(),
            title: "Design review".into(),
            start_time: Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap(),
            duration_minutes: 30,
            password: Some("pa55".into()),
        };

        let target =
            JoinTarget::for_meeting(&meeting, Role::Host, UserIdentity::new("Ada"), "meeting-root");

        assert_eq!(target.meeting_number, "123 456 7890");
        assert_eq!(target.password.as_deref(), Some("pa55"));
        assert_eq!(target.container.as_str(), "meeting-root");
        assert!(target.role.is_host());
    }

    #[test]
    fn test_request_from_target() {
        let target = JoinTarget::new("1234567890", Role::Attendee, UserIdentity::new("Lin"), "root")
            .with_password("secret");
        let request = JoinRequest::from_target(&target, Credentials::new("k", "s", 60));

        assert_eq!(request.meeting_number, "1234567890");
        assert_eq!(request.password.as_deref(), Some("secret"));
        assert_eq!(request.identity.display_name, "Lin");
    }
}
