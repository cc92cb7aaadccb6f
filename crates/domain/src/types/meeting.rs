//! Meeting identifiers, roles and registry entries

use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::MEETING_NUMBER_PATTERN;
use crate::errors::SessionError;

static MEETING_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(MEETING_NUMBER_PATTERN).expect("MEETING_NUMBER_RE should compile - this is a bug")
});

/// A validated, whitespace-free meeting number (10 or 11 digits).
///
/// Construct with [`MeetingNumber::parse`]; there is no way to obtain one
/// that skipped validation, so anything holding a `MeetingNumber` may forward
/// it to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MeetingNumber(String);

impl MeetingNumber {
    /// Strip all whitespace and validate the remaining digits.
    ///
    /// # Errors
    /// `SessionError::InvalidMeetingNumber` carrying the raw input when the
    /// stripped value is not 10 or 11 ASCII digits.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let normalized: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if MEETING_NUMBER_RE.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(SessionError::InvalidMeetingNumber(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeetingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MeetingNumber {
    type Error = SessionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MeetingNumber> for String {
    fn from(value: MeetingNumber) -> Self {
        value.0
    }
}

/// Participant role; the provider expects `0` for attendees and `1` for hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    #[default]
    Attendee,
    Host,
}

impl Role {
    pub const fn code(self) -> u8 {
        match self {
            Self::Attendee => 0,
            Self::Host => 1,
        }
    }

    pub const fn is_host(self) -> bool {
        matches!(self, Self::Host)
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role.code()
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Attendee),
            1 => Ok(Self::Host),
            other => Err(format!("Invalid role code: {other}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attendee => f.write_str("attendee"),
            Self::Host => f.write_str("host"),
        }
    }
}

/// Meeting as supplied by the scheduling registry.
///
/// Only the meeting number format is checked, and only when a join is
/// attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub meeting_number: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Meeting {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    /// Validates meeting number normalization.
    ///
    /// Assertions:
    /// - Confirms spaced, 10-digit and 11-digit inputs are accepted.
    /// - Confirms whitespace is removed from the stored value.
    #[test]
    fn test_meeting_number_accepts_valid_inputs() {
        assert_eq!(MeetingNumber::parse("123 456 7890").unwrap().as_str(), "1234567890");
        assert_eq!(MeetingNumber::parse("1234567890").unwrap().as_str(), "1234567890");
        assert_eq!(MeetingNumber::parse("12345678901").unwrap().as_str(), "12345678901");
        assert_eq!(MeetingNumber::parse("\t1234 567890\n").unwrap().as_str(), "1234567890");
    }

    /// Validates meeting number rejection.
    ///
    /// Assertions:
    /// - Ensures short, alphabetic, too-long and empty inputs are rejected.
    /// - Confirms the error carries the raw input.
    #[test]
    fn test_meeting_number_rejects_invalid_inputs() {
        for raw in ["12345", "abc1234567", "123456789012", "", "１２３４５６７８９０"] {
            let err = MeetingNumber::parse(raw).unwrap_err();
            assert_eq!(err, SessionError::InvalidMeetingNumber(raw.to_string()));
        }
    }

    /// Validates that deserialization runs the same validation.
    ///
    /// Assertions:
    /// - Ensures a valid JSON string deserializes.
    /// - Ensures an invalid JSON string fails.
    #[test]
    fn test_meeting_number_serde_validates() {
        let ok: MeetingNumber = serde_json::from_str("\"987 654 3210\"").unwrap();
        assert_eq!(ok.to_string(), "9876543210");
        assert!(serde_json::from_str::<MeetingNumber>("\"12ab\"").is_err());
    }

    /// Validates role codes and serde representation.
    ///
    /// Assertions:
    /// - Confirms attendee is `0` and host is `1`.
    /// - Confirms roles serialize as numbers.
    /// - Ensures unknown codes are rejected.
    #[test]
    fn test_role_codes() {
        assert_eq!(Role::Attendee.code(), 0);
        assert_eq!(Role::Host.code(), 1);
        assert_eq!(serde_json::to_string(&Role::Host).unwrap(), "1");
        assert_eq!(serde_json::from_str::<Role>("0").unwrap(), Role::Attendee);
        assert!(serde_json::from_str::<Role>("2").is_err());
    }

    /// Validates `Meeting::end_time`.
    ///
    /// Assertions:
    /// - Confirms a 45 minute meeting ends 45 minutes after it starts.
    #[test]
    fn test_meeting_end_time() {
        let meeting = Meeting {
            meeting_number: "1234567890".into(),
            title: "Weekly sync".into(),
            start_time: Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap(),
            duration_minutes: 45,
            password: None,
        };
        assert_eq!(meeting.end_time(), Utc.with_ymd_and_hms(2026, 3, 2, 15, 45, 0).unwrap());
    }
}
