//! Redirect callback parsing and state validation
//!
//! Both redirect transports hand over a full URI. A callback either carries
//! `code`/`state` from the provider, or (at `/auth-complete`) a URL-encoded
//! JSON identity assembled by a hosted page that already did the exchange.

use mlauth_domain::constants::IDENTITY_PAYLOAD_PATH;
use mlauth_domain::Identity;
use tracing::warn;
use url::Url;

use super::types::{AuthError, ReferenceDetail};

/// Query parameter carrying the identity payload
const USER_DATA_PARAM: &str = "userData";

/// Parsed redirect callback
#[derive(Clone, PartialEq, Eq)]
pub enum CallbackParams {
    /// Standard authorization-code redirect
    Authorization { code: Option<String>, state: Option<String> },
    /// Identity delivered without an authorization code
    IdentityPayload(Identity),
}

impl std::fmt::Debug for CallbackParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authorization { code, state } => f
                .debug_struct("Authorization")
                .field("code", &code.as_ref().map(|_| "<redacted>"))
                .field("state", state)
                .finish(),
            Self::IdentityPayload(identity) => {
                f.debug_tuple("IdentityPayload").field(identity).finish()
            }
        }
    }
}

/// Parse a callback URI delivered by either redirect transport.
///
/// # Errors
/// Returns `AuthError::UnsupportedCallback` if the URI does not parse, or if
/// an `/auth-complete` callback has a missing or undecodable payload.
pub fn parse_callback(uri: &str) -> Result<CallbackParams, AuthError> {
    let url = Url::parse(uri.trim())
        .map_err(|e| AuthError::UnsupportedCallback(format!("invalid callback URI: {e}")))?;

    let query_value = |name: &str| {
        url.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
    };

    if url.path().trim_end_matches('/').ends_with(IDENTITY_PAYLOAD_PATH) {
        let payload = query_value(USER_DATA_PARAM).ok_or_else(|| {
            AuthError::UnsupportedCallback("identity callback without userData".to_string())
        })?;
        return parse_identity_payload(&payload).map(CallbackParams::IdentityPayload);
    }

    if let Some(error) = query_value("error") {
        warn!(
            error = %error,
            description = query_value("error_description").unwrap_or_default(),
            "Provider redirected with an error"
        );
    }

    Ok(CallbackParams::Authorization {
        code: query_value("code").filter(|c| !c.is_empty()),
        state: query_value("state"),
    })
}

/// Decode the `userData` JSON, tolerating one extra layer of percent-encoding.
fn parse_identity_payload(payload: &str) -> Result<Identity, AuthError> {
    let detail: ReferenceDetail = match serde_json::from_str(payload) {
        Ok(detail) => detail,
        Err(first_err) => {
            let decoded = urlencoding::decode(payload).map_err(|_| {
                AuthError::UnsupportedCallback(format!("undecodable userData: {first_err}"))
            })?;
            serde_json::from_str(&decoded).map_err(|e| {
                AuthError::UnsupportedCallback(format!("undecodable userData: {e}"))
            })?
        }
    };

    Ok(detail.into_identity(None))
}

/// Check the callback `state` against the pending login.
///
/// The in-memory pending session id and the persisted one must both be
/// present and both equal `state`.
///
/// # Errors
/// Returns `AuthError::InvalidState` on any mismatch or absence.
pub fn validate_state(
    state: Option<&str>,
    pending: Option<&str>,
    persisted: Option<&str>,
) -> Result<(), AuthError> {
    match (state, pending, persisted) {
        (Some(state), Some(pending), Some(persisted))
            if constant_time_eq(state, pending) && constant_time_eq(state, persisted) =>
        {
            Ok(())
        }
        _ => Err(AuthError::InvalidState),
    }
}

/// Extract the authorization code.
///
/// # Errors
/// Returns `AuthError::MissingCode` when absent or empty.
pub fn require_code(code: Option<&str>) -> Result<&str, AuthError> {
    code.filter(|c| !c.is_empty()).ok_or(AuthError::MissingCode)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
