//! Configuration management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTHORIZE_PATH, DEFAULT_CALLBACK_PATH, DEFAULT_CALLBACK_TIMEOUT_SECS,
    DEFAULT_CLIENT_ID, DEFAULT_CORE_PRODUCT, DEFAULT_CUSTOM_REDIRECT_URI,
    DEFAULT_KEYCHAIN_SERVICE, DEFAULT_LICENSING_CONTEXT, DEFAULT_LICENSING_ENDPOINT,
    DEFAULT_LOCALE, DEFAULT_LOOPBACK_PORT, DEFAULT_MATLAB_VERSION, DEFAULT_OAUTH_HOST,
    DEFAULT_PROFILE_TIER, DEFAULT_TOKEN_PATH,
};
use crate::impl_domain_status_conversions;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub oauth: OAuthSettings,
    pub licensing: LicensingSettings,
    pub redirect: RedirectSettings,
    pub storage: StorageSettings,
}

/// Identity provider settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub host: String,
    pub authorize_path: String,
    pub token_path: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    pub profile_tier: String,
    pub locale: String,
}

impl OAuthSettings {
    #[must_use]
    pub fn authorize_url(&self) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), self.authorize_path)
    }

    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), self.token_path)
    }
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_OAUTH_HOST.to_string(),
            authorize_path: DEFAULT_AUTHORIZE_PATH.to_string(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: None,
            profile_tier: DEFAULT_PROFILE_TIER.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

/// Licensing endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicensingSettings {
    pub endpoint: String,
    /// Release sent as `release` to both the authorize and entitlement calls.
    pub product_version: String,
    pub core_product: String,
    pub context: String,
    pub exclude_expired: bool,
}

impl Default for LicensingSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_LICENSING_ENDPOINT.to_string(),
            product_version: DEFAULT_MATLAB_VERSION.to_string(),
            core_product: DEFAULT_CORE_PRODUCT.to_string(),
            context: DEFAULT_LICENSING_CONTEXT.to_string(),
            exclude_expired: true,
        }
    }
}

/// How the provider redirect reaches this process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectMode {
    /// Local HTTP listener on `127.0.0.1`
    Loopback,
    /// Host environment hands over the full callback URI
    #[default]
    CustomUri,
}

impl_domain_status_conversions!(RedirectMode {
    Loopback => "loopback",
    CustomUri => "custom_uri",
});

/// Redirect listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectSettings {
    pub mode: RedirectMode,
    pub custom_uri: String,
    pub loopback_port: u16,
    pub callback_path: String,
    /// Where the loopback confirmation page navigates back to.
    pub return_uri: Option<String>,
    /// Accept `/auth-complete?userData=...` callbacks carrying an identity
    /// instead of an authorization code.
    pub accept_identity_payload: bool,
    pub callback_timeout_secs: u64,
}

impl Default for RedirectSettings {
    fn default() -> Self {
        Self {
            mode: RedirectMode::default(),
            custom_uri: DEFAULT_CUSTOM_REDIRECT_URI.to_string(),
            loopback_port: DEFAULT_LOOPBACK_PORT,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            return_uri: None,
            accept_identity_payload: false,
            callback_timeout_secs: DEFAULT_CALLBACK_TIMEOUT_SECS,
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub keychain_service: String,
    /// Settings file location; `None` uses the user config directory.
    pub settings_path: Option<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(), settings_path: None }
    }
}
