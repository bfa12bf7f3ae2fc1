//! Authentication commands

use std::time::{Duration, Instant};

use mlauth_common::auth::EntitlementListing;
use mlauth_common::AuthError;
use mlauth_domain::{AuthSession, ConnectionStatus, Identity, LicensingInfo};
use serde::Serialize;
use tracing::warn;

use crate::context::AppContext;
use crate::utils::logging::{error_label, log_command_execution};

/// Snapshot of the sign-in state reported by `mlauth status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: ConnectionStatus,
    /// Human-readable status label
    pub label: String,
    pub identity: Option<Identity>,
    pub licensing: Option<LicensingInfo>,
}

fn finish<T>(command: &str, start: Instant, result: &Result<T, AuthError>) {
    log_command_execution(command, start.elapsed(), result.is_ok());
    if let Err(err) = result {
        warn!(command, error = error_label(err), %err, "command failed");
    }
}

/// Start a login attempt and return the authorize URL.
///
/// With `open_browser` the URL is also opened in the system browser.
///
/// # Errors
/// Propagates storage, redirect and browser failures from the orchestrator.
pub async fn start_login(ctx: &AppContext, open_browser: bool) -> Result<String, AuthError> {
    let start = Instant::now();
    let result = if open_browser {
        ctx.orchestrator.login().await
    } else {
        ctx.orchestrator.begin_login().await
    };
    finish("auth::start_login", start, &result);
    result
}

/// Wait for the redirect callback of the pending login and complete it.
///
/// # Errors
/// Returns `AuthError::CallbackTimeout` if nothing arrives within `timeout`,
/// or any fatal error raised while processing the callback.
pub async fn finish_login(ctx: &AppContext, timeout: Duration) -> Result<AuthSession, AuthError> {
    let start = Instant::now();
    let result = ctx.orchestrator.complete_login(timeout).await;
    finish("auth::finish_login", start, &result);
    result
}

/// Feed a redirect URI received out of band to the custom-URI listener.
///
/// # Errors
/// Returns `AuthError::Config` when the redirect transport is not custom URI.
pub fn deliver_callback(ctx: &AppContext, uri: &str) -> Result<(), AuthError> {
    let start = Instant::now();
    let result = ctx
        .transport
        .custom_uri()
        .ok_or_else(|| AuthError::Config("redirect mode is not custom_uri".to_string()))
        .map(|listener| listener.deliver(uri.trim()));
    finish("auth::deliver_callback", start, &result);
    result
}

/// Current connection status with identity and licensing.
///
/// # Errors
/// Returns `AuthError::Storage` if persisted state cannot be read.
pub async fn status(ctx: &AppContext) -> Result<StatusReport, AuthError> {
    let start = Instant::now();
    let result = async {
        let session = ctx.orchestrator.current_session().await?;
        let licensing = ctx.orchestrator.licensing().await?;
        let status = ctx.orchestrator.status();
        Ok(StatusReport {
            status,
            label: status.label().to_string(),
            identity: session.map(|s| s.identity),
            licensing,
        })
    }
    .await;
    finish("auth::status", start, &result);
    result
}

/// Stored entitlements together with the current selection.
///
/// # Errors
/// Returns `AuthError::Storage` if licensing info cannot be read.
pub async fn entitlements(ctx: &AppContext) -> Result<EntitlementListing, AuthError> {
    let start = Instant::now();
    let result = ctx.orchestrator.entitlements().await;
    finish("auth::entitlements", start, &result);
    result
}

/// Select one of the stored entitlements; `Ok(false)` when it is unknown.
///
/// # Errors
/// Returns `AuthError::Storage` if persisting fails.
pub async fn select_entitlement(ctx: &AppContext, id: &str) -> Result<bool, AuthError> {
    let start = Instant::now();
    let result = ctx.orchestrator.select_entitlement(id).await;
    finish("auth::select_entitlement", start, &result);
    result
}

/// Remove the stored session and licensing info.
///
/// # Errors
/// Returns the first storage failure; the remaining cleanup still runs.
pub async fn sign_out(ctx: &AppContext) -> Result<(), AuthError> {
    let start = Instant::now();
    let result = ctx.orchestrator.sign_out().await;
    finish("auth::sign_out", start, &result);
    result
}
