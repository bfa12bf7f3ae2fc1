//! Authenticated session and provider-asserted identity

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User identity as asserted by the identity provider (`referenceDetail`).
///
/// Every field defaults to an empty string when the provider omits it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
}

impl Identity {
    /// Label for presentation: display name, then full name, then email.
    #[must_use]
    pub fn label(&self) -> String {
        if !self.display_name.is_empty() {
            return self.display_name.clone();
        }

        let full_name = format!("{} {}", self.first_name, self.last_name);
        let full_name = full_name.trim();
        if full_name.is_empty() {
            self.email.clone()
        } else {
            full_name.to_string()
        }
    }
}

/// The current authenticated session.
///
/// Its presence is the sole source of truth for "connected". The access token
/// lives in the secret store; this struct is never serialized as a whole.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Login attempt identifier that produced this session.
    pub session_id: String,
    pub access_token: String,
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
}

impl AuthSession {
    /// Create a session stamped with the current time.
    #[must_use]
    pub fn new(session_id: String, access_token: String, identity: Identity) -> Self {
        Self { session_id, access_token, identity, created_at: Utc::now() }
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("session_id", &self.session_id)
            .field("access_token", &"<redacted>")
            .field("identity", &self.identity)
            .field("created_at", &self.created_at)
            .finish()
    }
}
