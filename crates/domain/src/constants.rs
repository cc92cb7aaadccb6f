//! Policy defaults and presentation labels
//!
//! Centralized location for the numbers the lifecycle layer falls back to
//! when no configuration overrides them.

// Container readiness probe
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 50;
pub const DEFAULT_PROBE_MAX_ATTEMPTS: u32 = 100;

// SDK entry-point polling
pub const DEFAULT_SDK_POLL_INTERVAL_MS: u64 = 50;
pub const DEFAULT_SDK_MAX_POLLS: u32 = 100;
pub const DEFAULT_SDK_SCRIPT_URL: &str = "/vendor/meeting-sdk/meeting-sdk.min.js";
pub const DEFAULT_SDK_STYLESHEETS: &[&str] =
    &["/vendor/meeting-sdk/css/bootstrap.css", "/vendor/meeting-sdk/css/react-select.css"];

// Join retry policy
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_DELAY_MS: u64 = 8000;

// Provider call deadlines
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_TEARDOWN_TIMEOUT_MS: u64 = 5_000;

// Credential issuer
pub const DEFAULT_CREDENTIAL_ENDPOINT: &str = "http://127.0.0.1:8787/functions/v1/meeting-credentials";
pub const DEFAULT_CREDENTIAL_TIMEOUT_MS: u64 = 10_000;

// Meeting identifiers are 10 or 11 digits once whitespace is removed
pub const MEETING_NUMBER_PATTERN: &str = r"^[0-9]{10,11}$";

// Status board steps shown by the loading overlay
pub const STEP_IDLE: &str = "Idle";
pub const STEP_WAITING_FOR_CONTAINER: &str = "Waiting for container";
pub const STEP_LOADING_SDK: &str = "Loading SDK";
pub const STEP_INITIALIZING: &str = "Initializing client";
pub const STEP_FETCHING_CREDENTIALS: &str = "Fetching credentials";
pub const STEP_JOINING: &str = "Joining meeting";
pub const STEP_JOINED: &str = "Joined";
pub const STEP_LEAVING: &str = "Leaving";
pub const STEP_FAILED: &str = "Failed";
