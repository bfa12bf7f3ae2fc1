//! Auth types and structures
//!
//! Error taxonomy for the sign-in flow, provider configuration, and the
//! boundary parsing of the token endpoint's loosely typed JSON payload.

use std::fmt;

use mlauth_domain::{Identity, MlAuthError, OAuthSettings};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised by the sign-in flow
///
/// Only [`AuthError::NoValidLicense`] and [`AuthError::EntitlementTransport`]
/// are non-fatal: they downgrade to a warning and the login still completes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Callback `state` does not match the pending session id
    #[error("Invalid state parameter")]
    InvalidState,

    /// Callback carried no authorization code
    #[error("Missing authorization code")]
    MissingCode,

    /// Code verifier absent from the secret store at callback time
    #[error("Missing code verifier")]
    MissingVerifier,

    /// Token endpoint answered with a non-success status
    #[error("OAuth server returned status {status}")]
    TokenEndpoint { status: u16 },

    /// Network failure talking to the token endpoint
    #[error("Token request failed: {0}")]
    TokenTransport(String),

    /// Token endpoint succeeded but the body is unusable
    #[error("Malformed token response: {0}")]
    MalformedTokenResponse(String),

    /// Entitlement endpoint succeeded without an entitlements collection
    #[error(
        "Your MathWorks account is not linked to a valid license for MATLAB {version}. Sign out and login with a licensed user."
    )]
    NoValidLicense { version: String },

    /// Network or parse failure resolving entitlements
    #[error("Entitlement request failed: {0}")]
    EntitlementTransport(String),

    /// Callback URI shape not understood or not enabled
    #[error("Unsupported callback: {0}")]
    UnsupportedCallback(String),

    /// No callback arrived before the caller's deadline
    #[error("Timed out waiting for the authorization callback")]
    CallbackTimeout,

    /// Redirect listener could not bind or serve
    #[error("Redirect listener error: {0}")]
    Redirect(String),

    #[error("Failed to open browser: {0}")]
    Browser(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether this error aborts the login (reverting to disconnected).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::NoValidLicense { .. } | Self::EntitlementTransport(_))
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("Serialization error: {err}"))
    }
}

impl From<AuthError> for MlAuthError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidState
            | AuthError::MissingCode
            | AuthError::MissingVerifier
            | AuthError::MalformedTokenResponse(_)
            | AuthError::NoValidLicense { .. }
            | AuthError::UnsupportedCallback(_)
            | AuthError::CallbackTimeout => Self::Auth(err.to_string()),
            AuthError::TokenEndpoint { .. }
            | AuthError::TokenTransport(_)
            | AuthError::EntitlementTransport(_) => Self::Network(err.to_string()),
            AuthError::Redirect(_) | AuthError::Browser(_) => Self::Platform(err.to_string()),
            AuthError::Storage(msg) => Self::Storage(msg),
            AuthError::Config(msg) => Self::Config(msg),
        }
    }
}

/// OAuth error envelope returned by the provider on failures
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthError {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{}: {}", self.error, description),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Identity provider endpoints and authorize-request constants
#[derive(Clone)]
pub struct OAuthConfig {
    pub authorize_url: String,
    pub token_url: String,
    pub client_id: String,
    client_secret: Option<String>,
    /// Product release sent as `release`
    pub release: String,
    pub platform: String,
    pub profile_tier: String,
    pub locale: String,
}

impl OAuthConfig {
    /// Build the client configuration from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &OAuthSettings, release: &str) -> Self {
        Self {
            authorize_url: settings.authorize_url(),
            token_url: settings.token_url(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone().filter(|s| !s.is_empty()),
            release: release.to_string(),
            platform: platform_name().to_string(),
            profile_tier: settings.profile_tier.clone(),
            locale: settings.locale.clone(),
        }
    }

    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("release", &self.release)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

/// Platform name the provider expects in the authorize request.
#[must_use]
pub const fn platform_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "Mac OS X"
    } else if cfg!(target_os = "windows") {
        "Windows"
    } else {
        "Linux"
    }
}

/// Validated result of a token exchange
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    /// Provider-formatted expiry, empty when not reported
    pub expiration_date: String,
    pub identity: Identity,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("expiration_date", &self.expiration_date)
            .field("identity", &self.identity)
            .finish()
    }
}

/// Raw token endpoint response
///
/// Every field is optional; numbers and strings are both accepted for the
/// scalar fields.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct TokenResponse {
    #[serde(rename = "accessTokenString", deserialize_with = "lenient_string")]
    pub access_token_string: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub access_token: Option<String>,
    #[serde(rename = "expirationDate", deserialize_with = "lenient_string")]
    pub expiration_date: Option<String>,
    #[serde(rename = "referenceDetail")]
    pub reference_detail: Option<ReferenceDetail>,
    #[serde(rename = "referenceId", deserialize_with = "lenient_string")]
    pub reference_id: Option<String>,
}

/// Identity block embedded in the token response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferenceDetail {
    #[serde(deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub display_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub last_name: Option<String>,
}

impl ReferenceDetail {
    /// Convert into an [`Identity`], defaulting absent fields to empty.
    #[must_use]
    pub fn into_identity(self, fallback_id: Option<String>) -> Identity {
        Identity {
            id: self.user_id.or(self.id).or(fallback_id).unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            display_name: self.display_name.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
        }
    }
}

impl TokenResponse {
    /// Validate the payload into a [`Token`].
    ///
    /// # Errors
    /// Returns `AuthError::MalformedTokenResponse` when neither
    /// `accessTokenString` nor `access_token` carries a value.
    pub fn into_token(self) -> Result<Token, AuthError> {
        let access_token = self
            .access_token_string
            .filter(|t| !t.is_empty())
            .or_else(|| self.access_token.filter(|t| !t.is_empty()))
            .ok_or_else(|| {
                AuthError::MalformedTokenResponse("response carried no access token".to_string())
            })?;

        let identity = self.reference_detail.unwrap_or_default().into_identity(self.reference_id);

        Ok(Token {
            access_token,
            expiration_date: self.expiration_date.unwrap_or_default(),
            identity,
        })
    }
}

/// Accept strings, numbers and booleans as text; anything else is absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Severity of a user-visible notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-visible message emitted by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}
