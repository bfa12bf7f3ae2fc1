//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Start from [`Config::default`]
//! 2. Layer an optional config file on top (TOML or JSON by extension)
//! 3. Apply environment variable overrides
//!
//! ## Environment Variables
//! - `MLAUTH_OAUTH_HOST` (or legacy `OAUTH_HOST`): identity provider host
//! - `MLAUTH_CLIENT_ID`: OAuth client id
//! - `MLAUTH_CLIENT_SECRET`: OAuth client secret
//! - `MLAUTH_LICENSING_ENDPOINT`: entitlement list endpoint
//! - `MLAUTH_MATLAB_VERSION`: release used for authorize and entitlements
//! - `MLAUTH_REDIRECT_MODE`: `loopback` or `custom_uri`
//! - `MLAUTH_CALLBACK_PORT`: loopback listener port
//! - `MLAUTH_SETTINGS_PATH`: settings file location
//!
//! ## File Locations
//! When no explicit path is given the loader probes, in order:
//! 1. `./mlauth.toml`
//! 2. `./mlauth.json`
//! 3. `<user config dir>/mlauth/config.toml`
//! 4. `<user config dir>/mlauth/config.json`

use std::path::{Path, PathBuf};

use mlauth_domain::{Config, MlAuthError, RedirectMode, Result};

/// Load configuration: defaults, then file, then environment
///
/// An explicit `path` must exist; without one the standard locations are
/// probed and a missing file simply means defaults.
///
/// # Errors
/// Returns `MlAuthError::Config` if the file is missing (explicit path),
/// unreadable, malformed, or an environment override is invalid.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let file = match path {
        Some(p) => Some(p.to_path_buf()),
        None => probe_config_paths(),
    };

    let mut config = match file {
        Some(p) => load_from_file(&p)?,
        None => {
            tracing::debug!("No config file found, using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// Missing sections and fields fall back to their defaults.
///
/// # Errors
/// Returns `MlAuthError::Config` if the file does not exist, cannot be read,
/// or does not parse.
pub fn load_from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(MlAuthError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| MlAuthError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MlAuthError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MlAuthError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(MlAuthError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a config file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("mlauth.toml"));
        candidates.push(cwd.join("mlauth.json"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let dir = config_dir.join("mlauth");
        candidates.push(dir.join("config.toml"));
        candidates.push(dir.join("config.json"));
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Apply `MLAUTH_*` environment overrides in place
///
/// # Errors
/// Returns `MlAuthError::Config` for an unparsable redirect mode or port.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(host) = env_var("MLAUTH_OAUTH_HOST").or_else(|| env_var("OAUTH_HOST")) {
        config.oauth.host = host;
    }
    if let Some(client_id) = env_var("MLAUTH_CLIENT_ID") {
        config.oauth.client_id = client_id;
    }
    if let Some(secret) = env_var("MLAUTH_CLIENT_SECRET") {
        config.oauth.client_secret = Some(secret);
    }
    if let Some(endpoint) = env_var("MLAUTH_LICENSING_ENDPOINT") {
        config.licensing.endpoint = endpoint;
    }
    if let Some(version) = env_var("MLAUTH_MATLAB_VERSION") {
        config.licensing.product_version = version;
    }
    if let Some(mode) = env_var("MLAUTH_REDIRECT_MODE") {
        config.redirect.mode = mode.parse::<RedirectMode>().map_err(MlAuthError::Config)?;
    }
    if let Some(port) = env_var("MLAUTH_CALLBACK_PORT") {
        config.redirect.loopback_port = port
            .parse::<u16>()
            .map_err(|e| MlAuthError::Config(format!("Invalid callback port: {e}")))?;
    }
    if let Some(path) = env_var("MLAUTH_SETTINGS_PATH") {
        config.storage.settings_path = Some(PathBuf::from(path));
    }

    Ok(())
}

/// Non-empty environment variable
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
