//! Conversions from external infrastructure errors into domain errors.

use mlauth_common::auth::AuthError;
use mlauth_domain::MlAuthError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub MlAuthError);

impl From<InfraError> for MlAuthError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<MlAuthError> for InfraError {
    fn from(value: MlAuthError) -> Self {
        InfraError(value)
    }
}

/// Storage-side failures surface to the auth core as `AuthError::Storage`.
impl From<InfraError> for AuthError {
    fn from(value: InfraError) -> Self {
        AuthError::Storage(value.0.to_string())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → MlAuthError */
/* -------------------------------------------------------------------------- */

impl From<std::io::Error> for InfraError {
    fn from(err: std::io::Error) -> Self {
        let message = err.to_string();
        let mapped = match err.kind() {
            std::io::ErrorKind::NotFound => MlAuthError::NotFound(message),
            std::io::ErrorKind::PermissionDenied => {
                MlAuthError::Security(format!("permission denied: {message}"))
            }
            _ => MlAuthError::Storage(message),
        };
        InfraError(mapped)
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → MlAuthError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(err: serde_json::Error) -> Self {
        InfraError(MlAuthError::Storage(format!("invalid JSON: {err}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → MlAuthError */
/* -------------------------------------------------------------------------- */

impl From<reqwest::Error> for InfraError {
    fn from(err: reqwest::Error) -> Self {
        let mapped = if err.is_timeout() {
            MlAuthError::Network(format!("request timed out: {err}"))
        } else if err.is_connect() {
            MlAuthError::Network(format!("connection failed: {err}"))
        } else if err.is_builder() {
            MlAuthError::Config(format!("invalid request: {err}"))
        } else {
            MlAuthError::Network(err.to_string())
        };
        InfraError(mapped)
    }
}
