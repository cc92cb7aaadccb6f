//! Provider error classifier
//!
//! Pure mapping from a provider's `(code, reason)` pair to the lifecycle's
//! error taxonomy. New provider codes are added to [`CODE_TABLE`] and
//! nowhere else.

use roomlink_domain::{Classification, ErrorCategory, ProviderError, SessionError};

/// Known provider codes. A code match always wins over the reason text.
pub const CODE_TABLE: &[(i64, ErrorCategory)] = &[
    (124, ErrorCategory::InvalidCredentials),
    (3712, ErrorCategory::InvalidCredentials),
    (3713, ErrorCategory::InvalidCredentials),
    (3714, ErrorCategory::InvalidCredentials),
    (3001, ErrorCategory::MeetingNotFound),
    (3707, ErrorCategory::MeetingNotFound),
    (3004, ErrorCategory::PasswordRequired),
    (3706, ErrorCategory::PasswordRequired),
    (3003, ErrorCategory::MeetingLocked),
    (3008, ErrorCategory::MeetingFull),
    (3009, ErrorCategory::FeatureDisabled),
    (4011, ErrorCategory::FeatureDisabled),
    (200, ErrorCategory::SessionConflict),
    (1003, ErrorCategory::SessionConflict),
    (3000, ErrorCategory::SessionConflict),
];

// Checked in order; the first matching needle decides.
const REASON_TABLE: &[(&str, ErrorCategory)] = &[
    ("signature", ErrorCategory::InvalidCredentials),
    ("token expired", ErrorCategory::InvalidCredentials),
    ("invalid token", ErrorCategory::InvalidCredentials),
    ("not exist", ErrorCategory::MeetingNotFound),
    ("not found", ErrorCategory::MeetingNotFound),
    ("password", ErrorCategory::PasswordRequired),
    ("passcode", ErrorCategory::PasswordRequired),
    ("locked", ErrorCategory::MeetingLocked),
    ("full", ErrorCategory::MeetingFull),
    ("capacity", ErrorCategory::MeetingFull),
    ("disabled", ErrorCategory::FeatureDisabled),
    ("already", ErrorCategory::SessionConflict),
    ("duplicate", ErrorCategory::SessionConflict),
    ("conflict", ErrorCategory::SessionConflict),
    ("another", ErrorCategory::SessionConflict),
];

/// Classify a provider failure.
pub fn classify(code: Option<i64>, reason: Option<&str>) -> Classification {
    Classification::for_category(category_for(code, reason))
}

fn category_for(code: Option<i64>, reason: Option<&str>) -> ErrorCategory {
    if let Some(category) =
        code.and_then(|code| CODE_TABLE.iter().find(|(known, _)| *known == code))
    {
        return category.1;
    }

    let Some(reason) = reason else {
        return ErrorCategory::Unknown;
    };
    let reason = reason.to_lowercase();
    REASON_TABLE
        .iter()
        .find(|(needle, _)| reason.contains(needle))
        .map_or(ErrorCategory::Unknown, |(_, category)| *category)
}

/// Turn a failed provider join into the lifecycle error.
pub fn join_error(err: &ProviderError) -> SessionError {
    let classification = classify(err.code, err.reason.as_deref());
    SessionError::Join {
        category: classification.category,
        code: err.code,
        message: err.reason.clone().unwrap_or(classification.user_message),
    }
}
