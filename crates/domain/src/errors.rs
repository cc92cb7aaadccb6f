//! Error types used throughout the session lifecycle layer

use std::fmt;
use std::time::Duration;

use roomlink_common::{ErrorClassification, ErrorSeverity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Taxonomy for provider join failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InvalidCredentials,
    MeetingNotFound,
    PasswordRequired,
    MeetingLocked,
    MeetingFull,
    FeatureDisabled,
    SessionConflict,
    Unknown,
}

crate::impl_label_conversions!(ErrorCategory {
    InvalidCredentials => "invalid_credentials",
    MeetingNotFound => "meeting_not_found",
    PasswordRequired => "password_required",
    MeetingLocked => "meeting_locked",
    MeetingFull => "meeting_full",
    FeatureDisabled => "feature_disabled",
    SessionConflict => "session_conflict",
    Unknown => "unknown",
});

impl ErrorCategory {
    /// Only stale-session conflicts and unrecognized failures are retried.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::SessionConflict | Self::Unknown)
    }

    pub const fn recovery_action(self) -> RecoveryAction {
        match self {
            Self::SessionConflict => RecoveryAction::Reconnect,
            Self::Unknown => RecoveryAction::Retry,
            _ => RecoveryAction::Fatal,
        }
    }

    pub const fn user_message(self) -> &'static str {
        match self {
            Self::InvalidCredentials => {
                "Your meeting credentials are invalid or have expired. Please sign in again."
            }
            Self::MeetingNotFound => "This meeting does not exist or has already ended.",
            Self::PasswordRequired => "This meeting requires a passcode.",
            Self::MeetingLocked => "The host has locked this meeting.",
            Self::MeetingFull => "This meeting has reached its participant limit.",
            Self::FeatureDisabled => "Joining from the browser is disabled for this meeting.",
            Self::SessionConflict => {
                "You are still connected to this meeting from another session. Reconnecting..."
            }
            Self::Unknown => "Something went wrong while joining the meeting.",
        }
    }
}

/// Recommended next step for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Try the same join again
    Retry,
    /// Tear the client down, then join again
    Reconnect,
    /// Stop and show the error panel
    Fatal,
}

crate::impl_label_conversions!(RecoveryAction {
    Retry => "retry",
    Reconnect => "reconnect",
    Fatal => "fatal",
});

/// Classifier output: category, message and action for one provider error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub category: ErrorCategory,
    pub user_message: String,
    pub action: RecoveryAction,
}

impl Classification {
    pub fn for_category(category: ErrorCategory) -> Self {
        Self {
            category,
            user_message: category.user_message().to_string(),
            action: category.recovery_action(),
        }
    }
}

/// Uniform failure shape returned by every provider call.
///
/// Providers report an optional numeric code and/or a free-text reason;
/// nothing else about their error objects is relied upon.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error, Serialize, Deserialize)]
pub struct ProviderError {
    pub code: Option<i64>,
    pub reason: Option<String>,
}

impl ProviderError {
    pub fn new(code: Option<i64>, reason: Option<String>) -> Self {
        Self { code, reason }
    }

    pub fn code(code: i64) -> Self {
        Self { code: Some(code), reason: None }
    }

    pub fn reason(reason: impl Into<String>) -> Self {
        Self { code: None, reason: Some(reason.into()) }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.reason) {
            (Some(code), Some(reason)) => write!(f, "provider error {code}: {reason}"),
            (Some(code), None) => write!(f, "provider error {code}"),
            (None, Some(reason)) => write!(f, "provider error: {reason}"),
            (None, None) => f.write_str("provider error"),
        }
    }
}

/// Failures from the credential issuer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum CredentialError {
    /// Network failure or timeout before a response arrived
    #[error("credential request failed: {0}")]
    Transport(String),

    /// The issuer answered with a non-success status
    #[error("credential issuer returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The response body did not contain a usable bundle
    #[error("credential response was malformed: {0}")]
    Malformed(String),

    /// The issuer handed back a bundle that had already expired
    #[error("issued credentials were already expired")]
    Expired,
}

impl CredentialError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Expired => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Malformed(_) => false,
        }
    }
}

/// Main error type for the session lifecycle.
///
/// `Clone` so one failure can be observed by every caller sharing an
/// in-flight operation.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum SessionError {
    #[error("container '{container}' not ready after {attempts} checks")]
    ContainerTimeout { container: String, attempts: u32 },

    #[error("SDK failed to load: {0}")]
    SdkLoadFailure(String),

    #[error("client initialization failed: {0}")]
    InitializationFailure(String),

    /// Provider join failure after classification
    #[error("join failed ({category}): {message}")]
    Join { category: ErrorCategory, code: Option<i64>, message: String },

    #[error("invalid meeting number '{0}'")]
    InvalidMeetingNumber(String),

    #[error("host role requires a ZAK token")]
    MissingHostToken,

    #[error("client is not ready")]
    NotReady,

    #[error(transparent)]
    CredentialFetch(#[from] CredentialError),

    #[error("join failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<SessionError> },

    #[error("operation cancelled")]
    Cancelled,

    #[error("no previous join to retry")]
    NothingToRetry,

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for lifecycle operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Join category, for variants that map onto the provider taxonomy.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Join { category, .. } => Some(*category),
            Self::MissingHostToken => Some(ErrorCategory::InvalidCredentials),
            Self::RetriesExhausted { last, .. } => last.category(),
            _ => None,
        }
    }

    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::Join { category, .. } => category.recovery_action(),
            Self::CredentialFetch(err) if err.is_retryable() => RecoveryAction::Retry,
            _ => RecoveryAction::Fatal,
        }
    }

    /// Message for the error panel.
    pub fn user_message(&self) -> String {
        match self {
            Self::ContainerTimeout { .. } => {
                "The meeting view did not appear in time. Reload the page and try again."
                    .to_string()
            }
            Self::SdkLoadFailure(_) => {
                "The meeting client could not be loaded. Check your connection and reload."
                    .to_string()
            }
            Self::InitializationFailure(_) => "The meeting client failed to start.".to_string(),
            Self::Join { category, .. } => category.user_message().to_string(),
            Self::InvalidMeetingNumber(_) => "Meeting IDs are 10 or 11 digits.".to_string(),
            Self::MissingHostToken => {
                ErrorCategory::InvalidCredentials.user_message().to_string()
            }
            Self::NotReady => "The meeting client is not ready yet.".to_string(),
            Self::CredentialFetch(_) => "Could not obtain meeting credentials.".to_string(),
            Self::RetriesExhausted { attempts, last } => {
                format!("{} (gave up after {attempts} attempts)", last.user_message())
            }
            Self::Cancelled => "Joining was cancelled.".to_string(),
            Self::NothingToRetry => "There is no meeting to retry.".to_string(),
            Self::Config(_) => "The meeting client is misconfigured.".to_string(),
        }
    }
}

impl ErrorClassification for SessionError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Join { category, .. } => category.is_retryable(),
            Self::CredentialFetch(err) => err.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Cancelled | Self::NothingToRetry => ErrorSeverity::Info,
            Self::Join { category, .. } if category.is_retryable() => ErrorSeverity::Warning,
            Self::CredentialFetch(err) if err.is_retryable() => ErrorSeverity::Warning,
            Self::NotReady => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}
