//! Configuration loader
//!
//! Loads transport configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `FLUXLINE_URL` is missing or a value is invalid, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `FLUXLINE_URL`: Connection string (required)
//! - `FLUXLINE_ASYNC`: Enable `send_async` (true/false)
//! - `FLUXLINE_TIMEOUT_SECS`: Request timeout in seconds
//! - `FLUXLINE_CONNECT_TIMEOUT_SECS`: Connect timeout in seconds
//! - `FLUXLINE_VERIFY_TLS`: Verify server certificates (true/false)
//! - `FLUXLINE_POLL_INTERVAL_MS`: Reconciler poll interval in milliseconds
//! - `FLUXLINE_JOIN_TIMEOUT_SECS`: How long shutdown waits for the final drain
//! - `FLUXLINE_QUEUE_CAPACITY`: Maximum outstanding async writes
//! - `FLUXLINE_USER` / `FLUXLINE_PASSWORD`: Basic authentication
//! - `FLUXLINE_PROXY`: Proxy URL for http and https
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./fluxline.json` or `./fluxline.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names in the parent and grandparent directories
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use fluxline_domain::{BasicAuth, FluxlineError, Proxy, Result, TransportConfig};

const FILE_NAMES: [&str; 4] = ["fluxline.json", "fluxline.toml", "config.json", "config.toml"];
const SEARCH_DIRS: [&str; 3] = [".", "..", "../.."];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `FluxlineError::Config` if configuration cannot be loaded from
/// either source or is invalid.
pub fn load() -> Result<TransportConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `FLUXLINE_URL` is required; every other setting falls back to its
/// default when unset.
///
/// # Errors
/// Returns `FluxlineError::Config` if `FLUXLINE_URL` is missing or a value
/// cannot be parsed.
pub fn load_from_env() -> Result<TransportConfig> {
    let mut config = TransportConfig::new(env_var("FLUXLINE_URL")?);

    config.async_writes = env_bool("FLUXLINE_ASYNC", config.async_writes);
    config.verify_tls = env_bool("FLUXLINE_VERIFY_TLS", config.verify_tls);

    if let Some(secs) = env_parse::<u64>("FLUXLINE_TIMEOUT_SECS")? {
        config.timeout_secs = secs;
    }
    if let Some(secs) = env_parse::<u64>("FLUXLINE_CONNECT_TIMEOUT_SECS")? {
        config.connect_timeout_secs = secs;
    }
    if let Some(ms) = env_parse::<u64>("FLUXLINE_POLL_INTERVAL_MS")? {
        config.poll_interval_ms = ms;
    }
    if let Some(secs) = env_parse::<u64>("FLUXLINE_JOIN_TIMEOUT_SECS")? {
        config.join_timeout_secs = secs;
    }
    config.queue_capacity = env_parse::<usize>("FLUXLINE_QUEUE_CAPACITY")?;

    config.auth = match (std::env::var("FLUXLINE_USER").ok(), std::env::var("FLUXLINE_PASSWORD").ok())
    {
        (Some(user), password) => Some(BasicAuth::new(user, password.unwrap_or_default())),
        (None, Some(_)) => {
            return Err(FluxlineError::Config(
                "FLUXLINE_PASSWORD is set without FLUXLINE_USER".to_string(),
            ));
        }
        (None, None) => None,
    };
    config.proxy = std::env::var("FLUXLINE_PROXY").ok().map(Proxy::new);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Format is detected by file extension.
///
/// # Errors
/// Returns `FluxlineError::Config` if the file is missing, unreadable, or
/// invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<TransportConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FluxlineError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            FluxlineError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FluxlineError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<TransportConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FluxlineError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FluxlineError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(FluxlineError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Returns the first existing candidate, searching the current working
/// directory and its two parents before the executable's directory.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| candidates_in(root))
        .find(|path| path.exists())
}

fn candidates_in(root: &Path) -> Vec<PathBuf> {
    SEARCH_DIRS
        .iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| root.join(dir).join(name)))
        .collect()
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        FluxlineError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable; unset yields `Ok(None)`.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| FluxlineError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
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
