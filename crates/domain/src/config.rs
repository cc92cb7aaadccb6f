//! Lifecycle policy configuration
//!
//! Every section deserializes with defaults so a config file only needs the
//! keys it overrides. `SessionConfig::validate` runs after loading and
//! before anything is constructed from the values.

use std::time::Duration;

use roomlink_common::{CommonError, CommonResult};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY_MS, DEFAULT_CREDENTIAL_ENDPOINT,
    DEFAULT_CREDENTIAL_TIMEOUT_MS, DEFAULT_MAX_DELAY_MS, DEFAULT_MAX_RETRIES,
    DEFAULT_OPERATION_TIMEOUT_MS, DEFAULT_PROBE_INTERVAL_MS, DEFAULT_PROBE_MAX_ATTEMPTS,
    DEFAULT_SDK_MAX_POLLS, DEFAULT_SDK_POLL_INTERVAL_MS, DEFAULT_SDK_SCRIPT_URL,
    DEFAULT_SDK_STYLESHEETS, DEFAULT_TEARDOWN_TIMEOUT_MS,
};

/// Top-level configuration for the session lifecycle layer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub probe: ProbeConfig,
    pub loader: LoaderConfig,
    pub retry: RetrySettings,
    pub timeouts: TimeoutConfig,
    pub credentials: CredentialEndpointConfig,
    pub logging: LoggingConfig,
}

impl SessionConfig {
    /// Reject values that would make the lifecycle hang or spin.
    ///
    /// # Errors
    /// Returns `CommonError::Config` naming the first offending field.
    pub fn validate(&self) -> CommonResult<()> {
        if self.probe.check_interval_ms == 0 {
            return Err(CommonError::config_field("probe.check_interval_ms", "must be > 0"));
        }
        if self.probe.max_attempts == 0 {
            return Err(CommonError::config_field("probe.max_attempts", "must be > 0"));
        }

        if self.loader.script_url.trim().is_empty() {
            return Err(CommonError::config_field("loader.script_url", "must not be empty"));
        }
        if self.loader.poll_interval_ms == 0 {
            return Err(CommonError::config_field("loader.poll_interval_ms", "must be > 0"));
        }
        if self.loader.max_polls == 0 {
            return Err(CommonError::config_field("loader.max_polls", "must be > 0"));
        }

        let retry = &self.retry;
        if retry.base_delay_ms == 0 {
            return Err(CommonError::config_field("retry.base_delay_ms", "must be > 0"));
        }
        if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
            return Err(CommonError::config_field("retry.backoff_multiplier", "must be >= 1.0"));
        }
        if retry.max_delay_ms < retry.base_delay_ms {
            return Err(CommonError::config_field(
                "retry.max_delay_ms",
                "must be >= retry.base_delay_ms",
            ));
        }

        if self.timeouts.operation_ms == 0 {
            return Err(CommonError::config_field("timeouts.operation_ms", "must be > 0"));
        }
        if self.timeouts.teardown_ms == 0 {
            return Err(CommonError::config_field("timeouts.teardown_ms", "must be > 0"));
        }

        match url::Url::parse(&self.credentials.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(CommonError::Config {
                    message: format!("unsupported scheme '{}'", url.scheme()),
                    field: Some("credentials.endpoint".to_string()),
                });
            }
            Err(e) => {
                return Err(CommonError::config_field("credentials.endpoint", e.to_string()));
            }
        }
        if self.credentials.request_timeout_ms == 0 {
            return Err(CommonError::config_field("credentials.request_timeout_ms", "must be > 0"));
        }

        Ok(())
    }
}

/// Container readiness probe cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub check_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { check_interval_ms: DEFAULT_PROBE_INTERVAL_MS, max_attempts: DEFAULT_PROBE_MAX_ATTEMPTS }
    }
}

impl ProbeConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}

/// Where the provider SDK comes from and how long to wait for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub script_url: String,
    pub stylesheet_urls: Vec<String>,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            script_url: DEFAULT_SDK_SCRIPT_URL.to_string(),
            stylesheet_urls: DEFAULT_SDK_STYLESHEETS.iter().map(|s| (*s).to_string()).collect(),
            poll_interval_ms: DEFAULT_SDK_POLL_INTERVAL_MS,
            max_polls: DEFAULT_SDK_MAX_POLLS,
        }
    }
}

impl LoaderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Join retry policy.
///
/// `max_retries` counts retries, not attempts: the default of 3 allows four
/// join attempts in total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    /// Give up on repeated session conflicts after this many retries.
    /// `None` leaves conflicts bounded only by `max_retries`.
    pub max_conflict_retries: Option<u32>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            max_conflict_retries: None,
        }
    }
}

impl RetrySettings {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Deadlines for individual provider calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// init and join
    pub operation_ms: u64,
    /// leave and destroy
    pub teardown_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { operation_ms: DEFAULT_OPERATION_TIMEOUT_MS, teardown_ms: DEFAULT_TEARDOWN_TIMEOUT_MS }
    }
}

impl TimeoutConfig {
    pub fn operation(&self) -> Duration {
        Duration::from_millis(self.operation_ms)
    }

    pub fn teardown(&self) -> Duration {
        Duration::from_millis(self.teardown_ms)
    }
}

/// Credential issuer endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialEndpointConfig {
    pub endpoint: String,
    pub request_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl Default for CredentialEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CREDENTIAL_ENDPOINT.to_string(),
            request_timeout_ms: DEFAULT_CREDENTIAL_TIMEOUT_MS,
            bearer_token: None,
        }
    }
}

impl CredentialEndpointConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
