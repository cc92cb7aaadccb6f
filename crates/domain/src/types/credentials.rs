//! Credential bundles and participant identity

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signed join material issued per attempt by the credential issuer.
///
/// Treated as opaque apart from its expiry. `Debug` redacts the secrets so a
/// bundle can appear in log fields.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub sdk_key: String,
    pub signature: String,
    /// Lifetime in seconds, counted from `issued_at`
    pub expires_in: u64,
    /// Host-only privileged token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zak_token: Option<String>,
    #[serde(default = "Utc::now")]
    pub issued_at: DateTime<Utc>,
}

impl Credentials {
    pub fn new(sdk_key: impl Into<String>, signature: impl Into<String>, expires_in: u64) -> Self {
        Self {
            sdk_key: sdk_key.into(),
            signature: signature.into(),
            expires_in,
            zak_token: None,
            issued_at: Utc::now(),
        }
    }

    pub fn with_zak_token(mut self, token: impl Into<String>) -> Self {
        self.zak_token = Some(token.into());
        self
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let lifetime = i64::try_from(self.expires_in).unwrap_or(i64::MAX);
        self.issued_at
            .checked_add_signed(chrono::Duration::seconds(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("sdk_key", &self.sdk_key)
            .field("signature", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("zak_token", &self.zak_token.as_ref().map(|_| "<redacted>"))
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Display name and optional email forwarded verbatim into the join
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self { display_name: display_name.into(), email: None }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}
