//! Session store
//!
//! Owns the persisted [`AuthSession`] and [`LicensingInfo`]. The access token
//! goes to the [`SecretStore`]; the session record written to the
//! [`SettingsStore`] only notes that a token exists. Every mutation emits a
//! [`SessionChangeEvent`] on a broadcast channel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mlauth_domain::constants::{
    SECRET_KEY_ACCESS_TOKEN, SETTINGS_KEY_AUTH_SESSION, SETTINGS_KEY_LICENSING_INFO,
};
use mlauth_domain::{AuthSession, Identity, LicensingInfo};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::traits::{SecretStore, SettingsStore};
use super::types::AuthError;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Session metadata as persisted in settings storage (no token)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    session_id: String,
    #[serde(default)]
    identity: Identity,
    created_at: DateTime<Utc>,
    #[serde(default)]
    has_token: bool,
}

/// Session summary carried in change events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDelta {
    pub id: String,
    /// Account email, empty when unknown
    pub account: String,
    pub label: String,
}

impl SessionDelta {
    fn from_parts(id: &str, identity: &Identity) -> Self {
        Self { id: id.to_string(), account: identity.email.clone(), label: identity.label() }
    }
}

/// Structured session change notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionChangeEvent {
    pub added: Vec<SessionDelta>,
    pub removed: Vec<SessionDelta>,
    pub changed: Vec<SessionDelta>,
}

/// Persisted single-session store
pub struct SessionStore {
    settings: Arc<dyn SettingsStore>,
    secrets: Arc<dyn SecretStore>,
    events: broadcast::Sender<SessionChangeEvent>,
}

impl SessionStore {
    pub fn new(settings: Arc<dyn SettingsStore>, secrets: Arc<dyn SecretStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { settings, secrets, events }
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionChangeEvent> {
        self.events.subscribe()
    }

    /// Load the current session
    ///
    /// A record that claims a token which the secret store no longer holds
    /// is treated as no session.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if either store fails or the record is
    /// corrupt.
    pub async fn get(&self) -> Result<Option<AuthSession>, AuthError> {
        let Some(record) = self.record().await? else {
            return Ok(None);
        };

        let access_token = if record.has_token {
            match self.secrets.get_secret(SECRET_KEY_ACCESS_TOKEN).await? {
                Some(token) => token,
                None => {
                    warn!(session_id = %record.session_id, "Session record without access token");
                    return Ok(None);
                }
            }
        } else {
            String::new()
        };

        Ok(Some(AuthSession {
            session_id: record.session_id,
            access_token,
            identity: record.identity,
            created_at: record.created_at,
        }))
    }

    /// Persist `session`, replacing any previous one
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if either store fails.
    pub async fn save(&self, session: &AuthSession) -> Result<(), AuthError> {
        let previous = self.record().await.unwrap_or_else(|e| {
            warn!(error = %e, "Discarding unreadable session record");
            None
        });

        let has_token = !session.access_token.is_empty();
        if has_token {
            self.secrets.set_secret(SECRET_KEY_ACCESS_TOKEN, &session.access_token).await?;
        } else {
            self.secrets.delete_secret(SECRET_KEY_ACCESS_TOKEN).await?;
        }

        let record = SessionRecord {
            session_id: session.session_id.clone(),
            identity: session.identity.clone(),
            created_at: session.created_at,
            has_token,
        };
        self.settings.set_value(SETTINGS_KEY_AUTH_SESSION, serde_json::to_value(&record)?).await?;

        let delta = SessionDelta::from_parts(&session.session_id, &session.identity);
        let event = match previous {
            Some(prev) if prev.session_id == session.session_id => {
                SessionChangeEvent { changed: vec![delta], ..SessionChangeEvent::default() }
            }
            Some(prev) => SessionChangeEvent {
                added: vec![delta],
                removed: vec![SessionDelta::from_parts(&prev.session_id, &prev.identity)],
                changed: Vec::new(),
            },
            None => SessionChangeEvent { added: vec![delta], ..SessionChangeEvent::default() },
        };

        debug!(session_id = %session.session_id, has_token, "Session saved");
        self.emit(event);
        Ok(())
    }

    /// Clear the stored session and its access token
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if either store fails.
    pub async fn remove(&self, session_id: &str) -> Result<(), AuthError> {
        let identity = match self.record().await {
            Ok(Some(record)) if record.session_id == session_id => record.identity,
            _ => Identity::default(),
        };

        self.secrets.delete_secret(SECRET_KEY_ACCESS_TOKEN).await?;
        self.settings.remove_value(SETTINGS_KEY_AUTH_SESSION).await?;

        debug!(session_id = %session_id, "Session removed");
        self.emit(SessionChangeEvent {
            removed: vec![SessionDelta::from_parts(session_id, &identity)],
            ..SessionChangeEvent::default()
        });
        Ok(())
    }

    /// Persist licensing info
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the settings store fails.
    pub async fn set_licensing(&self, info: &LicensingInfo) -> Result<(), AuthError> {
        self.settings.set_value(SETTINGS_KEY_LICENSING_INFO, serde_json::to_value(info)?).await?;
        debug!(
            entitlement_count = info.entitlements.as_ref().map(Vec::len),
            "Licensing info saved"
        );
        self.emit_changed().await;
        Ok(())
    }

    /// Load licensing info
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the store fails or the value is
    /// corrupt.
    pub async fn get_licensing(&self) -> Result<Option<LicensingInfo>, AuthError> {
        match self.settings.get_value(SETTINGS_KEY_LICENSING_INFO).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Remove licensing info
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the settings store fails.
    pub async fn clear_licensing(&self) -> Result<(), AuthError> {
        self.settings.remove_value(SETTINGS_KEY_LICENSING_INFO).await?;
        self.emit_changed().await;
        Ok(())
    }

    /// Id of the stored session, without touching the secret store
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the record cannot be read.
    pub async fn session_id(&self) -> Result<Option<String>, AuthError> {
        Ok(self.record().await?.map(|record| record.session_id))
    }

    async fn record(&self) -> Result<Option<SessionRecord>, AuthError> {
        match self.settings.get_value(SETTINGS_KEY_AUTH_SESSION).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn emit_changed(&self) {
        let changed = match self.record().await {
            Ok(Some(record)) => vec![SessionDelta::from_parts(&record.session_id, &record.identity)],
            _ => Vec::new(),
        };
        self.emit(SessionChangeEvent { changed, ..SessionChangeEvent::default() });
    }

    fn emit(&self, event: SessionChangeEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
