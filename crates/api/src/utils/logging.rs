use std::time::Duration;

use mlauth_common::AuthError;
use tracing::{info, warn};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Targets are matched by prefix, so this covers every `mlauth_*` crate.
const DEFAULT_FILTER: &str = "mlauth=info";

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG`, falling back to `info` for the mlauth crates. Output
/// goes to stderr so command output on stdout stays machine-readable;
/// `MLAUTH_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("MLAUTH_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false).with_writer(std::io::stderr)).try_init()
    };

    if result.is_err() {
        warn!("tracing subscriber already installed");
    }
}

/// Log the outcome of a command execution with structured fields.
///
/// # Parameters
/// * `command` - Logical command identifier (e.g. `"auth::login"`).
/// * `elapsed` - Duration the command execution took.
/// * `success` - Whether the command completed successfully.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, success: bool) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    if success {
        info!(command, duration_ms, "command_execution_success");
    } else {
        warn!(command, duration_ms, "command_execution_failure");
    }
}

/// Convert an `AuthError` into a stable label suitable for logging.
#[inline]
#[must_use]
pub fn error_label(error: &AuthError) -> &'static str {
    match error {
        AuthError::InvalidState => "invalid_state",
        AuthError::MissingCode => "missing_code",
        AuthError::MissingVerifier => "missing_verifier",
        AuthError::TokenEndpoint { .. } => "token_endpoint",
        AuthError::TokenTransport(_) => "token_transport",
        AuthError::MalformedTokenResponse(_) => "malformed_token_response",
        AuthError::NoValidLicense { .. } => "no_valid_license",
        AuthError::EntitlementTransport(_) => "entitlement_transport",
        AuthError::UnsupportedCallback(_) => "unsupported_callback",
        AuthError::CallbackTimeout => "callback_timeout",
        AuthError::Redirect(_) => "redirect",
        AuthError::Browser(_) => "browser",
        AuthError::Storage(_) => "storage",
        AuthError::Config(_) => "config",
    }
}
