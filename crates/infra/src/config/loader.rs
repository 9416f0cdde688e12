//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. If any `IGSESSION_*` variable is set, the environment wins
//! 2. Otherwise probes for a config file (JSON or TOML, by extension)
//! 3. Without either, the built-in defaults are used
//!
//! Every field has a default, so both sources may be partial.
//!
//! ## Environment Variables
//! - `IGSESSION_WEB_BASE_URL`, `IGSESSION_APP_BASE_URL`: endpoint bases
//! - `IGSESSION_LANGUAGE`: session language, e.g. `en-US`
//! - `IGSESSION_PROXY_URL`: proxy for every request
//! - `IGSESSION_MAX_ATTEMPTS`: total attempts per call (1 = no retry)
//! - `IGSESSION_BASE_BACKOFF_MS`: first retry delay, doubled per retry
//! - `IGSESSION_REQUEST_TIMEOUT_SECS`: per-request deadline
//! - `IGSESSION_ACCEPT_INVALID_CERTS`, `IGSESSION_GZIP`: booleans
//! - `IGSESSION_WEB_USER_AGENT`, `IGSESSION_APP_USER_AGENT`, `IGSESSION_APP_ID`
//!
//! ## File Locations
//! The loader probes (in order) `igsession.{json,toml}` and
//! `config.{json,toml}` in the working directory, then next to the
//! executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use igsession_domain::{ClientConfig, IgError, Result};
use url::Url;

const ENV_PREFIX: &str = "IGSESSION_";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["igsession.json", "igsession.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `IgError::Config` if the chosen source is malformed or the
/// resulting configuration is invalid.
pub fn load() -> Result<ClientConfig> {
    if env_is_configured() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::debug!("No configuration source found, using defaults");
            Ok(ClientConfig::default())
        }
    }
}

/// Load configuration from environment variables
///
/// Unset variables keep their defaults.
///
/// # Errors
/// Returns `IgError::Config` if a variable has an invalid value.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::default();

    if let Some(value) = env_string("WEB_BASE_URL") {
        config.web_base_url = value;
    }
    if let Some(value) = env_string("APP_BASE_URL") {
        config.app_base_url = value;
    }
    if let Some(value) = env_string("LANGUAGE") {
        config.language = value;
    }
    if let Some(value) = env_string("PROXY_URL") {
        config.proxy_url = Some(value);
    }
    if let Some(value) = env_parse::<u32>("MAX_ATTEMPTS")? {
        config.max_attempts = value;
    }
    if let Some(value) = env_parse::<u64>("BASE_BACKOFF_MS")? {
        config.base_backoff_ms = value;
    }
    if let Some(value) = env_parse::<u64>("REQUEST_TIMEOUT_SECS")? {
        config.request_timeout_secs = Some(value);
    }
    config.accept_invalid_certs = env_bool("ACCEPT_INVALID_CERTS", config.accept_invalid_certs);
    config.gzip = env_bool("GZIP", config.gzip);
    if let Some(value) = env_string("WEB_USER_AGENT") {
        config.web_user_agent = value;
    }
    if let Some(value) = env_string("APP_USER_AGENT") {
        config.app_user_agent = value;
    }
    if let Some(value) = env_string("APP_ID") {
        config.app_id = value;
    }

    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `IgError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(IgError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            IgError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| IgError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| IgError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| IgError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(IgError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn validate(config: &ClientConfig) -> Result<()> {
    if config.max_attempts == 0 {
        return Err(IgError::Config("max_attempts must be at least 1".to_string()));
    }
    for (field, value) in
        [("web_base_url", &config.web_base_url), ("app_base_url", &config.app_base_url)]
    {
        Url::parse(value)
            .map_err(|e| IgError::Config(format!("Invalid {field} '{value}': {e}")))?;
    }
    if let Some(proxy) = &config.proxy_url {
        Url::parse(proxy).map_err(|e| IgError::Config(format!("Invalid proxy_url: {e}")))?;
    }
    Ok(())
}

fn env_is_configured() -> bool {
    std::env::vars_os().any(|(key, _)| key.to_str().is_some_and(|k| k.starts_with(ENV_PREFIX)))
}

fn env_key(name: &str) -> String {
    format!("{ENV_PREFIX}{name}")
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(env_key(name)).ok().filter(|value| !value.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| IgError::Config(format!("Invalid value for {}: {e}", env_key(name))))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(name: &str, default: bool) -> bool {
    env_string(name)
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
