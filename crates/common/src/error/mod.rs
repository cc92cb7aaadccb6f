//! Common error types shared by every RoomLink crate
//!
//! Two pieces live here:
//!
//! 1. **`CommonError`**: failures that cross crate boundaries outside the
//!    join path: configuration, config-file parsing and backend adapters.
//! 2. **`ErrorClassification`**: the interface the retry engine and the
//!    presentation contract use to ask an error whether it is worth another
//!    attempt and how loudly it should be reported.
//!
//! Module-specific errors compose with `CommonError` instead of duplicating
//! it:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum LoaderError {
//!     #[error("script rejected: {0}")]
//!     Script(String),
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//! ```
//!
//! ## Severity levels
//!
//! | Level | Use Case |
//! |-------|----------|
//! | **Info** | Expected conditions (cancelled run, nothing to retry) |
//! | **Warning** | Transient, a retry is likely to help |
//! | **Error** | Needs user or operator action |
//! | **Critical** | Internal invariant broken (client used before init) |

use std::fmt;
use std::time::Duration;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Failure shapes shared across layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Invalid or missing configuration
    Config { message: String, field: Option<String> },

    /// A config file could not be parsed
    Serialization { message: String, format: &'static str },

    /// A remote collaborator failed
    Backend { service: String, message: String, is_retryable: bool },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, field: Some(field) } => {
                write!(f, "Configuration error in field '{field}': {message}")
            }
            Self::Config { message, field: None } => write!(f, "Configuration error: {message}"),
            Self::Serialization { message, format } => {
                write!(f, "Serialization error ({format}): {message}")
            }
            Self::Backend { service, message, .. } => {
                write!(f, "Backend error from '{service}': {message}")
            }
        }
    }
}

impl std::error::Error for CommonError {}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend { is_retryable: true, .. })
    }

    fn severity(&self) -> ErrorSeverity {
        if self.is_retryable() {
            ErrorSeverity::Warning
        } else {
            ErrorSeverity::Error
        }
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl CommonError {
    /// Configuration error without a field name
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    /// Configuration error tied to a specific field
    pub fn config_field<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    pub fn backend<S: Into<String>, M: Into<String>>(
        service: S,
        message: M,
        is_retryable: bool,
    ) -> Self {
        Self::Backend { service: service.into(), message: message.into(), is_retryable }
    }
}

/// Standard interface for classifying errors.
///
/// Implemented by every error that crosses a layer boundary so retry logic
/// and the presentation layer can treat them uniformly.
pub trait ErrorClassification {
    /// Whether another attempt could plausibly succeed.
    fn is_retryable(&self) -> bool;

    /// Severity used for log level and presentation.
    fn severity(&self) -> ErrorSeverity;

    /// Whether this points at a broken internal invariant.
    fn is_critical(&self) -> bool;

    /// Suggested delay before the next attempt, if the error carries one.
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for logging and presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization { message: err.to_string(), format: "JSON" }
    }
}

impl From<toml::de::Error> for CommonError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization { message: err.to_string(), format: "TOML" }
    }
}
