//! OAuth 2.0 + PKCE sign-in core
//!
//! Drives the authorization-code flow against the identity provider, derives
//! licensing data from the resulting token and keeps the single signed-in
//! session in a split store (secrets in the keychain, metadata in settings).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ AuthOrchestrator │  login / handle_callback / sign_out / select_entitlement
//! └────────┬─────────┘
//!          │
//!          ├──► PKCE utilities       (session id, verifier, challenge)
//!          ├──► RedirectListener     (loopback HTTP or custom URI)
//!          ├──► callback             (parse + state validation)
//!          ├──► OAuthClientTrait     (authorize URL, token exchange)
//!          ├──► EntitlementResolver  (token -> entitlements)
//!          └──► SessionStore         (SecretStore + SettingsStore, change events)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use mlauth_common::auth::AuthOrchestrator;
//!
//! # async fn example(orchestrator: AuthOrchestrator) -> Result<(), mlauth_common::AuthError> {
//! orchestrator.restore().await;
//!
//! // Opens the system browser on the provider's authorize page
//! orchestrator.login().await?;
//!
//! // Waits for the redirect and completes the exchange
//! let session = orchestrator.complete_login(Duration::from_secs(300)).await?;
//! println!("Signed in as {}", session.identity.label());
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: error taxonomy, provider config, token payloads, notices
//! - **[`pkce`]**: session id, code verifier and challenge generation
//! - **[`callback`]**: redirect URI parsing and state validation
//! - **[`client`]**: authorize URL building and token exchange over HTTP
//! - **[`traits`]**: ports the orchestrator is wired with
//! - **[`session_store`]**: persisted session and licensing with change events
//! - **[`service`]**: the orchestrator state machine

pub mod callback;
pub mod client;
#[cfg(feature = "platform")]
mod keychain;
pub mod pkce;
pub mod service;
pub mod session_store;
pub mod traits;
pub mod types;

// Re-export commonly used types and functions
pub use callback::{parse_callback, require_code, validate_state, CallbackParams};
pub use client::OAuthClient;
pub use pkce::{generate_code_challenge, generate_code_verifier, generate_session_id, PkceChallenge};
pub use service::{AuthOrchestrator, AuthPorts, EntitlementListing, OrchestratorConfig};
pub use session_store::{SessionChangeEvent, SessionDelta, SessionStore};
pub use traits::{
    BrowserLauncher, DisplayNotifier, EntitlementResolver, OAuthClientTrait, RedirectListener,
    SecretStore, SettingsStore, StatusNotifier,
};
pub use types::{AuthError, Notice, NoticeLevel, OAuthConfig, OAuthError, Token, TokenResponse};
