//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use roomlink_common::CommonError;
use roomlink_domain::CredentialError;

/// Error newtype that keeps `reqwest` mapping on the infrastructure side and
/// converts back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CredentialError);

impl From<InfraError> for CredentialError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CredentialError> for InfraError {
    fn from(value: CredentialError) -> Self {
        Self(value)
    }
}

impl From<InfraError> for CommonError {
    fn from(value: InfraError) -> Self {
        let retryable = value.0.is_retryable();
        Self::backend("credential-issuer", value.0.to_string(), retryable)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CredentialError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        if err.is_timeout() {
            return Self(CredentialError::Transport("HTTP request timed out".into()));
        }

        if err.is_connect() {
            return Self(CredentialError::Transport("HTTP connection failure".into()));
        }

        if let Some(status) = err.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
            return Self(CredentialError::Rejected { status: code, message });
        }

        if err.is_decode() {
            return Self(CredentialError::Malformed(err.to_string()));
        }

        if err.is_builder() {
            return Self(CredentialError::Malformed(format!("invalid request: {err}")));
        }

        Self(CredentialError::Transport(err.to_string()))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
