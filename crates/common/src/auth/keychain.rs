//! [`SecretStore`] adapter over the platform keychain.

use async_trait::async_trait;

use crate::auth::traits::SecretStore;
use crate::auth::types::AuthError;
use crate::security::{KeychainError, KeychainProvider};

impl From<KeychainError> for AuthError {
    fn from(err: KeychainError) -> Self {
        AuthError::Storage(err.to_string())
    }
}

/// Run a blocking keychain call off the async executor.
async fn blocking<T, F>(keychain: &KeychainProvider, op: F) -> Result<T, AuthError>
where
    T: Send + 'static,
    F: FnOnce(&KeychainProvider) -> Result<T, KeychainError> + Send + 'static,
{
    let keychain = keychain.clone();
    tokio::task::spawn_blocking(move || op(&keychain))
        .await
        .map_err(|e| AuthError::Storage(format!("keychain task failed: {e}")))?
        .map_err(AuthError::from)
}

#[async_trait]
impl SecretStore for KeychainProvider {
    async fn get_secret(&self, key: &str) -> Result<Option<String>, AuthError> {
        let key = key.to_string();
        blocking(self, move |k| k.read(&key)).await
    }

    async fn set_secret(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let (key, value) = (key.to_string(), value.to_string());
        blocking(self, move |k| k.write(&key, &value)).await
    }

    async fn delete_secret(&self, key: &str) -> Result<(), AuthError> {
        let key = key.to_string();
        blocking(self, move |k| k.erase(&key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keychain_error_maps_to_storage() {
        let err: AuthError = KeychainError::AccessFailed("denied".to_string()).into();
        assert_eq!(err, AuthError::Storage("Keychain access failed: denied".to_string()));
    }

    #[tokio::test]
    async fn test_blocking_surfaces_keychain_errors() {
        let keychain = KeychainProvider::new("mlauth-test");
        let result: Result<(), AuthError> =
            blocking(&keychain, |_| Err(KeychainError::Unavailable("no service".to_string())))
                .await;
        assert_eq!(result, Err(AuthError::Storage("Keychain unavailable: no service".to_string())));
    }
}
