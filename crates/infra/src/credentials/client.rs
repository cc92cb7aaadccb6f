//! HTTP credential issuer
//!
//! Calls the token-issuing function once per join attempt. Retries are owned
//! by the join orchestrator; the underlying client never retries.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use roomlink_common::CommonError;
use roomlink_core::CredentialIssuer;
use roomlink_domain::{CredentialEndpointConfig, CredentialError, Credentials, MeetingNumber, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::errors::InfraError;
use crate::http::HttpClient;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    meeting_number: &'a str,
    role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    sdk_key: String,
    signature: String,
    expires_in: u64,
    #[serde(default)]
    zak_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

pub struct HttpCredentialIssuer {
    http: HttpClient,
    endpoint: Url,
}

impl HttpCredentialIssuer {
    /// Build an issuer for `config.endpoint`.
    ///
    /// # Errors
    /// `CommonError::Config` for an unparseable endpoint or bearer token, or
    /// if the HTTP client cannot be built.
    pub fn new(config: &CredentialEndpointConfig) -> Result<Self, CommonError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            CommonError::config_field("credentials.endpoint", format!("invalid URL: {e}"))
        })?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                CommonError::config_field("credentials.bearer_token", "not a valid header value")
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = HttpClient::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("roomlink/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| CommonError::from(InfraError(e)))?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CredentialIssuer for HttpCredentialIssuer {
    #[instrument(skip_all, fields(meeting_number = %meeting_number, role = role.code()))]
    async fn issue(
        &self,
        meeting_number: &MeetingNumber,
        role: Role,
    ) -> Result<Credentials, CredentialError> {
        let body = TokenRequest { meeting_number: meeting_number.as_str(), role };
        let request = self.http.request(Method::POST, self.endpoint.clone()).json(&body);
        let response = self.http.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or_else(|_| {
                    status.canonical_reason().unwrap_or("unknown status").to_string()
                });
            warn!(status = status.as_u16(), %message, "credential issuer rejected request");
            return Err(CredentialError::Rejected { status: status.as_u16(), message });
        }

        let bytes = response.bytes().await.map_err(|e| InfraError::from(e).0)?;
        let token: TokenResponse = serde_json::from_slice(&bytes)
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;

        if token.sdk_key.is_empty() || token.signature.is_empty() {
            return Err(CredentialError::Malformed("empty sdkKey or signature".into()));
        }

        debug!(expires_in = token.expires_in, has_zak = token.zak_token.is_some(), "credentials issued");
        let credentials = Credentials::new(token.sdk_key, token.signature, token.expires_in);
        Ok(match token.zak_token {
            Some(zak) => credentials.with_zak_token(zak),
            None => credentials,
        })
    }
}
