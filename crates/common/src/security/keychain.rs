//! Keychain provider for the access token and PKCE verifier
//!
//! Every secret lives under one service name, keyed by its logical storage
//! key (`mlauth.accessToken`, `mlauth.codeVerifier`). Calls block on the
//! platform credential service.
//!
//! ## Usage
//!
//! ```no_run
//! use mlauth_common::security::KeychainProvider;
//!
//! let keychain = KeychainProvider::new("mlauth");
//! keychain.write("mlauth.accessToken", "tok1")?;
//! assert_eq!(keychain.read("mlauth.accessToken")?.as_deref(), Some("tok1"));
//! keychain.erase("mlauth.accessToken")?;
//! # Ok::<(), mlauth_common::security::KeychainError>(())
//! ```

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

/// Keychain-backed secret storage scoped to one service name
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Create a provider for `service_name` (typically `mlauth`).
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Read the secret stored under `key`, `None` when there is no entry.
    ///
    /// # Errors
    /// Returns `KeychainError::Unavailable` if no credential service can be
    /// reached and `KeychainError::AccessFailed` if the read is refused.
    pub fn read(&self, key: &str) -> Result<Option<String>, KeychainError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(KeychainError::access(key, "read", &e)),
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// See [`Self::read`].
    pub fn write(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key, "Writing keychain entry");
        self.entry(key)?.set_password(value).map_err(|e| KeychainError::access(key, "write", &e))
    }

    /// Remove the entry under `key`; absent entries are not an error.
    ///
    /// # Errors
    /// See [`Self::read`].
    pub fn erase(&self, key: &str) -> Result<(), KeychainError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => {
                debug!(service = %self.service_name, key, "Erased keychain entry");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::access(key, "erase", &e)),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, key).map_err(|e| KeychainError::Unavailable(e.to_string()))
    }
}

/// Keychain error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeychainError {
    /// No usable platform credential service
    #[error("Keychain unavailable: {0}")]
    Unavailable(String),

    /// The credential service refused the operation
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),
}

impl KeychainError {
    fn access(key: &str, operation: &str, err: &keyring::Error) -> Self {
        Self::AccessFailed(format!("failed to {operation} {key}: {err}"))
    }
}
