//! Configuration loader
//!
//! Builds a [`SessionConfig`] from files and environment variables.
//!
//! ## Loading Strategy
//! 1. Load `.env` into the process environment (if present)
//! 2. Start from the file named by `ROOMLINK_CONFIG`, else the first file
//!    found by [`probe_config_paths`], else the built-in defaults
//! 3. Apply `ROOMLINK_*` overrides on top
//! 4. Validate the result
//!
//! ## Environment Variables
//! - `ROOMLINK_CONFIG`: Path to a TOML or JSON config file
//! - `ROOMLINK_CREDENTIAL_ENDPOINT`: Token-issuing function URL
//! - `ROOMLINK_CREDENTIAL_TOKEN`: Bearer token for the issuer
//! - `ROOMLINK_CREDENTIAL_TIMEOUT_MS`: Issuer request timeout
//! - `ROOMLINK_SDK_SCRIPT_URL`: Provider SDK script URL
//! - `ROOMLINK_PROBE_INTERVAL_MS`: Container check interval
//! - `ROOMLINK_PROBE_MAX_ATTEMPTS`: Container check ceiling
//! - `ROOMLINK_MAX_RETRIES`: Join retries after the first attempt
//! - `ROOMLINK_RETRY_BASE_DELAY_MS`: First backoff delay
//! - `ROOMLINK_RETRY_MAX_DELAY_MS`: Backoff cap
//! - `ROOMLINK_MAX_CONFLICT_RETRIES`: Give up after this many session conflicts
//! - `ROOMLINK_LOG_LEVEL`: Filter used when `RUST_LOG` is unset
//! - `ROOMLINK_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./roomlink.toml` or `./roomlink.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use roomlink_common::{CommonError, CommonResult};
use roomlink_domain::SessionConfig;

const CONFIG_PATH_VAR: &str = "ROOMLINK_CONFIG";
const CONFIG_FILE_NAMES: [&str; 4] = ["roomlink.toml", "roomlink.json", "config.toml", "config.json"];

/// Load configuration with the layered strategy described above.
///
/// # Errors
/// Returns `CommonError::Config` if the named file is missing, a file or
/// variable cannot be parsed, or the merged config fails validation.
pub fn load() -> CommonResult<SessionConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "could not load .env file"),
    }

    let base = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => load_from_file(Some(PathBuf::from(path)))?,
        Err(_) => match probe_config_paths() {
            Some(path) => load_from_file(Some(path))?,
            None => {
                tracing::debug!("no config file found, using defaults");
                SessionConfig::default()
            }
        },
    };

    let config = apply_env(base)?;
    config.validate()?;
    tracing::info!(
        endpoint = %config.credentials.endpoint,
        max_retries = config.retry.max_retries,
        "configuration loaded"
    );
    Ok(config)
}

/// Build configuration from defaults plus `ROOMLINK_*` variables.
///
/// Missing variables keep their defaults.
///
/// # Errors
/// Returns `CommonError::Config` if a variable has an invalid value.
pub fn load_from_env() -> CommonResult<SessionConfig> {
    apply_env(SessionConfig::default())
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Supports JSON and
/// TOML (detected by file extension). Fields missing from the file keep
/// their defaults.
///
/// # Errors
/// Returns `CommonError::Config` if the file is missing or unreadable, and
/// `CommonError::Serialization` if it cannot be parsed.
pub fn load_from_file(path: Option<PathBuf>) -> CommonResult<SessionConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CommonError::config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CommonError::config("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CommonError::config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content; format is chosen by extension.
fn parse_config(contents: &str, path: &Path) -> CommonResult<SessionConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => Ok(toml::from_str(contents)?),
        "json" => Ok(serde_json::from_str(contents)?),
        _ => Err(CommonError::config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard paths for a config file.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn apply_env(mut config: SessionConfig) -> CommonResult<SessionConfig> {
    if let Some(endpoint) = env_string("ROOMLINK_CREDENTIAL_ENDPOINT") {
        config.credentials.endpoint = endpoint;
    }
    if let Some(token) = env_string("ROOMLINK_CREDENTIAL_TOKEN") {
        config.credentials.bearer_token = Some(token);
    }
    if let Some(timeout) = env_parse("ROOMLINK_CREDENTIAL_TIMEOUT_MS")? {
        config.credentials.request_timeout_ms = timeout;
    }
    if let Some(url) = env_string("ROOMLINK_SDK_SCRIPT_URL") {
        config.loader.script_url = url;
    }
    if let Some(interval) = env_parse("ROOMLINK_PROBE_INTERVAL_MS")? {
        config.probe.check_interval_ms = interval;
    }
    if let Some(attempts) = env_parse("ROOMLINK_PROBE_MAX_ATTEMPTS")? {
        config.probe.max_attempts = attempts;
    }
    if let Some(retries) = env_parse("ROOMLINK_MAX_RETRIES")? {
        config.retry.max_retries = retries;
    }
    if let Some(delay) = env_parse("ROOMLINK_RETRY_BASE_DELAY_MS")? {
        config.retry.base_delay_ms = delay;
    }
    if let Some(delay) = env_parse("ROOMLINK_RETRY_MAX_DELAY_MS")? {
        config.retry.max_delay_ms = delay;
    }
    if let Some(limit) = env_parse("ROOMLINK_MAX_CONFLICT_RETRIES")? {
        config.retry.max_conflict_retries = Some(limit);
    }
    if let Some(level) = env_string("ROOMLINK_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("ROOMLINK_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Non-empty environment variable
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an optional environment variable.
///
/// # Errors
/// Returns `CommonError::Config` naming `key` if the value does not parse.
fn env_parse<T>(key: &str) -> CommonResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| CommonError::config_field(key, format!("invalid value '{raw}': {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
