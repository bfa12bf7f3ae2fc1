//! Ports the auth orchestrator is wired with
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (identity provider, licensing service, keychain,
//! settings storage, redirect transport, UI observers).

use std::time::Duration;

use async_trait::async_trait;
use mlauth_domain::{ConnectionStatus, Entitlement, Identity, LicensingInfo};
use serde_json::Value;

use super::pkce::PkceChallenge;
use super::types::{AuthError, Notice, Token};

/// Trait for OAuth client operations
#[async_trait]
pub trait OAuthClientTrait: Send + Sync {
    /// Build the provider authorize URL for a login attempt
    fn authorization_url(&self, challenge: &PkceChallenge, redirect_uri: &str) -> String;

    /// Exchange an authorization code for a token (single attempt)
    ///
    /// # Errors
    /// Returns `TokenEndpoint` on a non-success status, `TokenTransport` on
    /// network failure and `MalformedTokenResponse` on an unusable body.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<Token, AuthError>;
}

/// Trait for resolving license grants from an access token
#[async_trait]
pub trait EntitlementResolver: Send + Sync {
    /// Resolve entitlements for `product_version`, in provider order
    ///
    /// # Errors
    /// Returns `NoValidLicense` when the response has no entitlements
    /// collection, `EntitlementTransport` on network or parse failure.
    async fn resolve_entitlements(
        &self,
        access_token: &str,
        product_version: &str,
    ) -> Result<Vec<Entitlement>, AuthError>;
}

/// Protected secret storage (access token, code verifier)
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read a secret; `Ok(None)` when absent
    async fn get_secret(&self, key: &str) -> Result<Option<String>, AuthError>;

    async fn set_secret(&self, key: &str, value: &str) -> Result<(), AuthError>;

    /// Delete a secret (idempotent)
    async fn delete_secret(&self, key: &str) -> Result<(), AuthError>;
}

/// Ordinary persisted configuration storage for non-secret metadata
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_value(&self, key: &str) -> Result<Option<Value>, AuthError>;

    async fn set_value(&self, key: &str, value: Value) -> Result<(), AuthError>;

    /// Remove a value (idempotent)
    async fn remove_value(&self, key: &str) -> Result<(), AuthError>;
}

/// Opens the provider authorize page for the user
pub trait BrowserLauncher: Send + Sync {
    /// # Errors
    /// Returns `AuthError::Browser` if the system browser cannot be started.
    fn open(&self, url: &str) -> Result<(), AuthError>;
}

/// Receives the provider redirect for one login attempt at a time
#[async_trait]
pub trait RedirectListener: Send + Sync {
    /// Start receiving callbacks, closing any previous listener first.
    /// Returns the redirect URI to register with the provider.
    async fn listen(&self) -> Result<String, AuthError>;

    /// The redirect URI callbacks arrive at
    fn redirect_uri(&self) -> String;

    /// Wait for the next callback URI
    ///
    /// Delivery does not stop the listener; the caller closes it once a
    /// callback has been accepted.
    ///
    /// # Errors
    /// Returns `AuthError::CallbackTimeout` (and closes the listener) when
    /// nothing arrives within `timeout`.
    async fn wait_for_callback(&self, timeout: Duration) -> Result<String, AuthError>;

    /// Stop receiving callbacks (idempotent)
    async fn close(&self);
}

/// Status indicator observer
pub trait StatusNotifier: Send + Sync {
    fn status_changed(&self, status: ConnectionStatus);

    /// Show a user-visible message
    fn notify(&self, notice: Notice);
}

/// Side panel observer
pub trait DisplayNotifier: Send + Sync {
    fn auth_status_changed(&self, connected: bool, identity: Option<&Identity>);

    fn licensing_changed(&self, licensing: Option<&LicensingInfo>);
}
