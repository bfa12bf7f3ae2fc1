//! Auth orchestrator
//!
//! Wires PKCE, the redirect listener, token exchange, entitlement resolution
//! and the session store into the user-facing commands, and reports status
//! to the injected notifiers.
//!
//! State machine: `Disconnected -> Connecting -> Connected`; a fatal failure
//! while connecting falls back to `Disconnected`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mlauth_domain::constants::{
    SECRET_KEY_ACCESS_TOKEN, SECRET_KEY_CODE_VERIFIER, SETTINGS_KEY_PENDING_SESSION_ID,
    SETTINGS_KEY_SELECTED_ENTITLEMENT,
};
use mlauth_domain::{AuthSession, ConnectionStatus, Entitlement, Identity, LicensingInfo};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::callback::{parse_callback, require_code, validate_state, CallbackParams};
use super::pkce::{generate_session_id, PkceChallenge};
use super::session_store::SessionStore;
use super::traits::{
    BrowserLauncher, DisplayNotifier, EntitlementResolver, OAuthClientTrait, RedirectListener,
    SecretStore, SettingsStore, StatusNotifier,
};
use super::types::{AuthError, Notice};

/// Orchestrator settings taken from the application config
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Release used for entitlement resolution
    pub product_version: String,
    /// Recorded as `sourceId` on licensing info
    pub client_id: String,
    /// Accept `/auth-complete` identity payload callbacks
    pub accept_identity_payload: bool,
}

/// Collaborators injected into the orchestrator
pub struct AuthPorts {
    pub client: Arc<dyn OAuthClientTrait>,
    pub resolver: Arc<dyn EntitlementResolver>,
    pub listener: Arc<dyn RedirectListener>,
    pub browser: Arc<dyn BrowserLauncher>,
    pub secrets: Arc<dyn SecretStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub status_notifier: Arc<dyn StatusNotifier>,
    pub display_notifier: Arc<dyn DisplayNotifier>,
}

/// Stored entitlements with the one currently selected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitlementListing {
    pub entitlements: Vec<Entitlement>,
    pub selected: Option<Entitlement>,
}

/// Transient state of the login attempt awaiting its callback
#[derive(Debug, Clone)]
struct PendingLogin {
    session_id: String,
    redirect_uri: String,
    started_at: DateTime<Utc>,
}

/// Drives login, callback handling, sign-out and entitlement selection
pub struct AuthOrchestrator {
    config: OrchestratorConfig,
    client: Arc<dyn OAuthClientTrait>,
    resolver: Arc<dyn EntitlementResolver>,
    listener: Arc<dyn RedirectListener>,
    browser: Arc<dyn BrowserLauncher>,
    secrets: Arc<dyn SecretStore>,
    settings: Arc<dyn SettingsStore>,
    status_notifier: Arc<dyn StatusNotifier>,
    display_notifier: Arc<dyn DisplayNotifier>,
    store: SessionStore,
    status: RwLock<ConnectionStatus>,
    pending: Mutex<Option<PendingLogin>>,
}

impl AuthOrchestrator {
    pub fn new(config: OrchestratorConfig, ports: AuthPorts) -> Self {
        let store = SessionStore::new(ports.settings.clone(), ports.secrets.clone());

        Self {
            config,
            client: ports.client,
            resolver: ports.resolver,
            listener: ports.listener,
            browser: ports.browser,
            secrets: ports.secrets,
            settings: ports.settings,
            status_notifier: ports.status_notifier,
            display_notifier: ports.display_notifier,
            store,
            status: RwLock::new(ConnectionStatus::Disconnected),
            pending: Mutex::new(None),
        }
    }

    /// Current connection status
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    /// The backing session store (for change subscriptions)
    #[must_use]
    pub fn session_store(&self) -> &SessionStore {
        &self.store
    }

    /// Session id of the login attempt awaiting its callback
    #[must_use]
    pub fn pending_session_id(&self) -> Option<String> {
        self.pending.lock().as_ref().map(|p| p.session_id.clone())
    }

    /// Restore status from persisted state at startup
    ///
    /// Connected iff a session is stored; read failures count as
    /// disconnected.
    pub async fn restore(&self) -> ConnectionStatus {
        match self.store.get().await {
            Ok(Some(session)) => {
                let licensing = self.store.get_licensing().await.unwrap_or_else(|e| {
                    warn!(error = %e, "Ignoring unreadable licensing info");
                    None
                });
                self.set_status(ConnectionStatus::Connected);
                self.display_notifier.auth_status_changed(true, Some(&session.identity));
                self.display_notifier.licensing_changed(licensing.as_ref());
                info!(session_id = %session.session_id, "Restored existing session");
            }
            Ok(None) => {
                self.set_status(ConnectionStatus::Disconnected);
                self.display_notifier.auth_status_changed(false, None);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored session");
                self.set_status(ConnectionStatus::Disconnected);
                self.display_notifier.auth_status_changed(false, None);
            }
        }

        self.status()
    }

    /// Start a login attempt without opening the browser
    ///
    /// Overwrites any earlier pending attempt. Returns the authorize URL.
    ///
    /// # Errors
    /// Returns `Redirect` if the listener cannot start or `Storage` if the
    /// verifier or session id cannot be persisted.
    pub async fn begin_login(&self) -> Result<String, AuthError> {
        match self.prepare_login().await {
            Ok(url) => Ok(url),
            Err(e) => {
                self.listener.close().await;
                self.abandon_pending().await;
                Err(self.fail_login(e).await)
            }
        }
    }

    /// Start a login attempt and open the authorize URL in the browser
    ///
    /// # Errors
    /// See [`Self::begin_login`]; additionally `Browser` when the browser
    /// cannot be opened, which abandons the attempt.
    pub async fn login(&self) -> Result<String, AuthError> {
        let url = self.begin_login().await?;

        if let Err(e) = self.browser.open(&url) {
            self.abandon_pending().await;
            self.listener.close().await;
            return Err(self.fail_login(e).await);
        }

        Ok(url)
    }

    async fn prepare_login(&self) -> Result<String, AuthError> {
        let challenge = PkceChallenge::generate();
        let redirect_uri = self.listener.listen().await?;

        self.secrets.set_secret(SECRET_KEY_CODE_VERIFIER, &challenge.code_verifier).await?;
        self.settings
            .set_value(
                SETTINGS_KEY_PENDING_SESSION_ID,
                Value::String(challenge.session_id.clone()),
            )
            .await?;

        let replaced = self.pending.lock().replace(PendingLogin {
            session_id: challenge.session_id.clone(),
            redirect_uri: redirect_uri.clone(),
            started_at: Utc::now(),
        });
        if let Some(previous) = replaced {
            debug!(session_id = %previous.session_id, "Superseded pending login");
        }

        self.set_status(ConnectionStatus::Connecting);
        info!(session_id = %challenge.session_id, "Login started");

        Ok(self.client.authorization_url(&challenge, &redirect_uri))
    }

    /// Wait on the redirect listener and complete the login
    ///
    /// Callbacks whose state does not match are ignored and waiting
    /// continues until `timeout` elapses in total.
    ///
    /// # Errors
    /// Returns `CallbackTimeout` if no acceptable callback arrives in time,
    /// otherwise the errors of [`Self::handle_callback`].
    pub async fn complete_login(&self, timeout: Duration) -> Result<AuthSession, AuthError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let uri = match self.listener.wait_for_callback(remaining).await {
                Ok(uri) => uri,
                Err(e) => {
                    self.listener.close().await;
                    return Err(self.fail_login(e).await);
                }
            };

            match self.process_callback(&uri).await {
                Ok(session) => return Ok(session),
                Err(AuthError::InvalidState) => {
                    warn!("Ignoring callback with mismatched state");
                }
                Err(e) => {
                    self.listener.close().await;
                    return Err(self.fail_login(e).await);
                }
            }
        }
    }

    /// Handle a redirect callback URI
    ///
    /// A state mismatch leaves the pending attempt in place. Once the state
    /// is accepted the pending verifier and session id are erased whatever
    /// the outcome.
    ///
    /// # Errors
    /// Returns the fatal error that aborted the login. Entitlement failures
    /// are reported as warnings and do not fail the login.
    pub async fn handle_callback(&self, uri: &str) -> Result<AuthSession, AuthError> {
        match self.process_callback(uri).await {
            Ok(session) => Ok(session),
            Err(e) => Err(self.fail_login(e).await),
        }
    }

    async fn process_callback(&self, uri: &str) -> Result<AuthSession, AuthError> {
        match parse_callback(uri)? {
            CallbackParams::Authorization { code, state } => {
                let pending = self.accept_state(state.as_deref()).await?;
                self.listener.close().await;
                let result = self.exchange_and_persist(&pending, code.as_deref()).await;
                self.clear_pending_secrets().await;
                result
            }
            CallbackParams::IdentityPayload(identity) => {
                if !self.config.accept_identity_payload {
                    return Err(AuthError::UnsupportedCallback(
                        "identity payload callbacks are disabled".to_string(),
                    ));
                }
                self.listener.close().await;
                let session_id = match self.pending.lock().take() {
                    Some(pending) => pending.session_id,
                    None => generate_session_id(),
                };
                let result = self.persist_identity_session(session_id, identity).await;
                self.clear_pending_secrets().await;
                result
            }
        }
    }

    /// Validate `state` and consume the pending attempt on success.
    async fn accept_state(&self, state: Option<&str>) -> Result<PendingLogin, AuthError> {
        let persisted = self.settings.get_value(SETTINGS_KEY_PENDING_SESSION_ID).await?;
        let persisted = persisted.as_ref().and_then(Value::as_str);

        let mut guard = self.pending.lock();
        validate_state(state, guard.as_ref().map(|p| p.session_id.as_str()), persisted)?;
        guard.take().ok_or(AuthError::InvalidState)
    }

    async fn exchange_and_persist(
        &self,
        pending: &PendingLogin,
        code: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        let code = require_code(code)?;
        let verifier = self
            .secrets
            .get_secret(SECRET_KEY_CODE_VERIFIER)
            .await?
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingVerifier)?;

        debug!(
            session_id = %pending.session_id,
            pending_secs = (Utc::now() - pending.started_at).num_seconds(),
            "Callback accepted"
        );

        let token = self.client.exchange_code(code, &verifier, &pending.redirect_uri).await?;

        let mut licensing =
            LicensingInfo::for_identity(&token.identity, &token.expiration_date, &self.config.client_id);
        licensing.entitlements = self.resolve_entitlements(&token.access_token).await;

        let session =
            AuthSession::new(pending.session_id.clone(), token.access_token, token.identity);
        self.store.save(&session).await?;
        self.persist_licensing(&licensing).await;

        self.connected(&session, Some(&licensing));
        Ok(session)
    }

    async fn persist_identity_session(
        &self,
        session_id: String,
        identity: Identity,
    ) -> Result<AuthSession, AuthError> {
        let licensing = LicensingInfo::for_identity(&identity, "", &self.config.client_id);
        let session = AuthSession::new(session_id, String::new(), identity);

        self.store.save(&session).await?;
        self.persist_licensing(&licensing).await;

        self.connected(&session, Some(&licensing));
        Ok(session)
    }

    /// Store licensing for a session that is already saved.
    ///
    /// The login has succeeded at this point, so failures only warn.
    async fn persist_licensing(&self, licensing: &LicensingInfo) {
        let result = match self.store.set_licensing(licensing).await {
            Ok(()) => self.settings.remove_value(SETTINGS_KEY_SELECTED_ENTITLEMENT).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist licensing info");
            self.status_notifier
                .notify(Notice::warning(format!("Could not save MATLAB licensing info: {e}")));
        }
    }

    /// Entitlement failures degrade to `None` with a warning.
    async fn resolve_entitlements(&self, access_token: &str) -> Option<Vec<Entitlement>> {
        match self.resolver.resolve_entitlements(access_token, &self.config.product_version).await
        {
            Ok(entitlements) => {
                info!(entitlement_count = entitlements.len(), "Entitlements resolved");
                Some(entitlements)
            }
            Err(e @ AuthError::NoValidLicense { .. }) => {
                warn!(version = %self.config.product_version, "No valid license for product version");
                self.status_notifier.notify(Notice::warning(e.to_string()));
                None
            }
            Err(e) => {
                warn!(error = %e, "Entitlement resolution failed");
                self.status_notifier
                    .notify(Notice::warning(format!("Could not fetch MATLAB entitlements: {e}")));
                None
            }
        }
    }

    fn connected(&self, session: &AuthSession, licensing: Option<&LicensingInfo>) {
        self.set_status(ConnectionStatus::Connected);
        self.display_notifier.auth_status_changed(true, Some(&session.identity));
        self.display_notifier.licensing_changed(licensing);
        self.status_notifier.notify(Notice::info("Successfully connected to MATLAB"));
        info!(session_id = %session.session_id, "Login completed");
    }

    /// Report a fatal login failure and revert the status.
    ///
    /// A session that is still stored keeps the status at `Connected`.
    async fn fail_login(&self, err: AuthError) -> AuthError {
        warn!(error = %err, "Login failed");

        let status = match self.store.get().await {
            Ok(Some(_)) => ConnectionStatus::Connected,
            _ => ConnectionStatus::Disconnected,
        };
        self.set_status(status);
        if status == ConnectionStatus::Disconnected {
            self.display_notifier.auth_status_changed(false, None);
        }
        self.status_notifier.notify(Notice::error(format!("Authentication failed: {err}")));
        err
    }

    async fn abandon_pending(&self) {
        self.pending.lock().take();
        self.clear_pending_secrets().await;
    }

    /// Erase the temporary verifier and persisted session id.
    async fn clear_pending_secrets(&self) {
        if let Err(e) = self.secrets.delete_secret(SECRET_KEY_CODE_VERIFIER).await {
            warn!(error = %e, "Failed to delete code verifier");
        }
        if let Err(e) = self.settings.remove_value(SETTINGS_KEY_PENDING_SESSION_ID).await {
            warn!(error = %e, "Failed to clear pending session id");
        }
    }

    /// Sign out: clear the session, licensing, secrets and pending state
    ///
    /// Every step is attempted; the status is `Disconnected` afterwards.
    ///
    /// # Errors
    /// Returns the first storage error encountered.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.listener.close().await;
        self.pending.lock().take();

        let mut first_error: Option<AuthError> = None;
        let mut record = |result: Result<(), AuthError>, step: &str| {
            if let Err(e) = result {
                warn!(error = %e, step, "Sign-out step failed");
                first_error.get_or_insert(e);
            }
        };

        match self.store.session_id().await {
            Ok(Some(session_id)) => record(self.store.remove(&session_id).await, "session"),
            Ok(None) => {}
            Err(e) => record(Err(e), "session"),
        }
        record(self.store.clear_licensing().await, "licensing");
        record(self.secrets.delete_secret(SECRET_KEY_ACCESS_TOKEN).await, "access_token");
        record(self.secrets.delete_secret(SECRET_KEY_CODE_VERIFIER).await, "code_verifier");
        record(self.settings.remove_value(SETTINGS_KEY_PENDING_SESSION_ID).await, "session_id");
        record(
            self.settings.remove_value(SETTINGS_KEY_SELECTED_ENTITLEMENT).await,
            "selected_entitlement",
        );

        self.set_status(ConnectionStatus::Disconnected);
        self.display_notifier.auth_status_changed(false, None);
        self.display_notifier.licensing_changed(None);

        match first_error {
            Some(e) => {
                self.status_notifier.notify(Notice::error(format!("Sign out incomplete: {e}")));
                Err(e)
            }
            None => {
                self.status_notifier.notify(Notice::info("Successfully signed out from MATLAB"));
                info!("Signed out");
                Ok(())
            }
        }
    }

    /// Point the stored licensing info at entitlement `id`
    ///
    /// Returns `Ok(false)` (logged, no error) when there is no licensing
    /// info or it holds no entitlement with that id.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if persisting fails.
    pub async fn select_entitlement(&self, id: &str) -> Result<bool, AuthError> {
        let Some(mut licensing) = self.store.get_licensing().await? else {
            warn!(entitlement_id = %id, "No licensing info, ignoring entitlement selection");
            return Ok(false);
        };

        let Some(name) = licensing
            .entitlements
            .iter()
            .flatten()
            .find(|e| e.id == id)
            .map(|e| e.name.clone())
        else {
            warn!(entitlement_id = %id, "Unknown entitlement, ignoring selection");
            self.status_notifier.notify(Notice::warning(format!("Entitlement {id} is not available")));
            return Ok(false);
        };

        licensing.entitlement_id = Some(id.to_string());
        self.store.set_licensing(&licensing).await?;
        self.settings
            .set_value(SETTINGS_KEY_SELECTED_ENTITLEMENT, Value::String(id.to_string()))
            .await?;

        self.display_notifier.licensing_changed(Some(&licensing));
        self.status_notifier.notify(Notice::info(format!("Selected entitlement: {name} ({id})")));
        info!(entitlement_id = %id, "Entitlement selected");
        Ok(true)
    }

    /// Stored entitlements and the current selection
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if licensing info cannot be read.
    pub async fn entitlements(&self) -> Result<EntitlementListing, AuthError> {
        let Some(licensing) = self.store.get_licensing().await? else {
            return Ok(EntitlementListing::default());
        };

        Ok(EntitlementListing {
            selected: licensing.selected_entitlement().cloned(),
            entitlements: licensing.entitlements.unwrap_or_default(),
        })
    }

    /// Current persisted session
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the store cannot be read.
    pub async fn current_session(&self) -> Result<Option<AuthSession>, AuthError> {
        self.store.get().await
    }

    /// Current persisted licensing info
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the store cannot be read.
    pub async fn licensing(&self) -> Result<Option<LicensingInfo>, AuthError> {
        self.store.get_licensing().await
    }

    fn set_status(&self, status: ConnectionStatus) {
        let previous = std::mem::replace(&mut *self.status.write(), status);
        if previous != status {
            info!(status = %status, previous = %previous, "connection_status_changed");
        }
        self.status_notifier.status_changed(status);
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::service.
    use mlauth_domain::constants::{SETTINGS_KEY_AUTH_SESSION, SETTINGS_KEY_LICENSING_INFO};

    use super::*;
    use crate::auth::types::NoticeLevel;
    use crate::testing::{entitlement, TestHarness};

    fn callback(state: &str, code: &str) -> String {
        format!("vscode://spruhath.matlab/callback?code={code}&state={state}")
    }

    /// Validates `AuthOrchestrator::begin_login` behavior for the pending
    /// state scenario.
    ///
    /// Assertions:
    /// - Confirms the status is `Connecting`.
    /// - Confirms the verifier and session id are persisted.
    /// - Ensures the browser is not opened.
    #[tokio::test]
    async fn test_begin_login_persists_pending_state() {
        let harness = TestHarness::new();
        let orchestrator = harness.orchestrator();

        let url = orchestrator.begin_login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();

        assert_eq!(orchestrator.status(), ConnectionStatus::Connecting);
        assert!(url.contains(&format!("state={session_id}")));
        assert_eq!(session_id.len(), 8);
        assert!(harness.secrets.get_secret_value(SECRET_KEY_CODE_VERIFIER).is_some());
        assert_eq!(
            harness.settings.value(SETTINGS_KEY_PENDING_SESSION_ID),
            Some(Value::String(session_id))
        );
        assert!(harness.browser.opened().is_empty());
    }

    /// Validates `AuthOrchestrator::login` behavior for the browser failure
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the error is returned and status reverts to `Disconnected`.
    /// - Ensures the pending verifier is erased.
    #[tokio::test]
    async fn test_login_browser_failure_abandons_attempt() {
        let harness = TestHarness::new();
        harness.browser.fail_with(AuthError::Browser("no display".to_string()));
        let orchestrator = harness.orchestrator();

        let err = orchestrator.login().await.unwrap_err();

        assert_eq!(err, AuthError::Browser("no display".to_string()));
        assert_eq!(orchestrator.status(), ConnectionStatus::Disconnected);
        assert!(orchestrator.pending_session_id().is_none());
        assert!(harness.secrets.get_secret_value(SECRET_KEY_CODE_VERIFIER).is_none());
        assert!(!harness.listener.is_listening());
    }

    /// Validates `AuthOrchestrator::handle_callback` behavior for the
    /// successful exchange scenario.
    ///
    /// Assertions:
    /// - Confirms the exchange received the stored verifier.
    /// - Confirms the session and licensing info are persisted.
    /// - Confirms the success notice is posted.
    #[tokio::test]
    async fn test_handle_callback_success() {
        let harness = TestHarness::new();
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();
        let verifier = harness.secrets.get_secret_value(SECRET_KEY_CODE_VERIFIER).unwrap();

        let session = orchestrator.handle_callback(&callback(&session_id, "XYZ")).await.unwrap();

        assert_eq!(session.session_id, session_id);
        assert_eq!(session.access_token, "tok1");
        let exchanges = harness.client.exchanges();
        assert_eq!(exchanges.len(), 1);
        assert_eq!(exchanges[0].code, "XYZ");
        assert_eq!(exchanges[0].code_verifier, verifier);
        assert_eq!(orchestrator.status(), ConnectionStatus::Connected);

        let licensing = orchestrator.licensing().await.unwrap().unwrap();
        assert_eq!(licensing.email_addr, "a@b.com");
        assert_eq!(licensing.selected_entitlement().map(|e| e.id.as_str()), Some("E1"));

        let notices = harness.notifier.notices();
        assert_eq!(notices.last(), Some(&Notice::info("Successfully connected to MATLAB")));
    }

    /// Validates `AuthOrchestrator::handle_callback` behavior for the state
    /// mismatch scenario.
    ///
    /// Assertions:
    /// - Confirms `InvalidState` is returned without any exchange.
    /// - Ensures the pending attempt survives for the genuine callback.
    #[tokio::test]
    async fn test_handle_callback_state_mismatch_keeps_pending() {
        let harness = TestHarness::new();
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();

        let err = orchestrator.handle_callback(&callback("WRONG", "XYZ")).await.unwrap_err();

        assert_eq!(err, AuthError::InvalidState);
        assert_eq!(harness.client.exchange_count(), 0);
        assert_eq!(orchestrator.status(), ConnectionStatus::Disconnected);
        assert_eq!(orchestrator.pending_session_id(), Some(session_id.clone()));

        orchestrator.handle_callback(&callback(&session_id, "XYZ")).await.unwrap();
        assert_eq!(orchestrator.status(), ConnectionStatus::Connected);
    }

    /// Validates `AuthOrchestrator::handle_callback` behavior for the missing
    /// code scenario.
    ///
    /// Assertions:
    /// - Confirms `MissingCode` is returned and no exchange happens.
    /// - Ensures the verifier is erased once state was accepted.
    #[tokio::test]
    async fn test_handle_callback_missing_code() {
        let harness = TestHarness::new();
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();

        let uri = format!("vscode://spruhath.matlab/callback?state={session_id}");
        let err = orchestrator.handle_callback(&uri).await.unwrap_err();

        assert_eq!(err, AuthError::MissingCode);
        assert_eq!(harness.client.exchange_count(), 0);
        assert!(harness.secrets.get_secret_value(SECRET_KEY_CODE_VERIFIER).is_none());
        assert!(harness.settings.value(SETTINGS_KEY_PENDING_SESSION_ID).is_none());
    }

    /// Validates `AuthOrchestrator::handle_callback` behavior for the
    /// missing verifier scenario.
    ///
    /// Assertions:
    /// - Confirms `MissingVerifier` is returned before any exchange.
    #[tokio::test]
    async fn test_handle_callback_missing_verifier() {
        let harness = TestHarness::new();
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();
        harness.secrets.delete_secret(SECRET_KEY_CODE_VERIFIER).await.unwrap();

        let err = orchestrator.handle_callback(&callback(&session_id, "XYZ")).await.unwrap_err();

        assert_eq!(err, AuthError::MissingVerifier);
        assert_eq!(harness.client.exchange_count(), 0);
    }

    /// Validates `AuthOrchestrator::handle_callback` behavior for the token
    /// endpoint rejection scenario.
    ///
    /// Assertions:
    /// - Confirms the endpoint error is surfaced and nothing is persisted.
    /// - Confirms an error notice is posted.
    #[tokio::test]
    async fn test_handle_callback_exchange_failure() {
        let harness = TestHarness::new();
        harness.client.set_result(Err(AuthError::TokenEndpoint { status: 400 }));
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();

        let err = orchestrator.handle_callback(&callback(&session_id, "XYZ")).await.unwrap_err();

        assert_eq!(err, AuthError::TokenEndpoint { status: 400 });
        assert_eq!(orchestrator.status(), ConnectionStatus::Disconnected);
        assert!(orchestrator.current_session().await.unwrap().is_none());
        let last = harness.notifier.notices().pop().unwrap();
        assert_eq!(last.level, NoticeLevel::Error);
        assert!(last.message.starts_with("Authentication failed"));
    }

    /// Validates `AuthOrchestrator::handle_callback` behavior for the
    /// entitlement resolution failure scenario.
    ///
    /// Assertions:
    /// - Confirms the login still succeeds with no entitlements.
    /// - Confirms the no-license warning is posted.
    #[tokio::test]
    async fn test_entitlement_failure_is_not_fatal() {
        let harness = TestHarness::new();
        harness
            .resolver
            .set_result(Err(AuthError::NoValidLicense { version: "R2024b".to_string() }));
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();

        orchestrator.handle_callback(&callback(&session_id, "XYZ")).await.unwrap();

        assert_eq!(orchestrator.status(), ConnectionStatus::Connected);
        let licensing = orchestrator.licensing().await.unwrap().unwrap();
        assert!(licensing.entitlements.is_none());
        assert!(harness
            .notifier
            .notices()
            .iter()
            .any(|n| n.level == NoticeLevel::Warning && n.message.contains("R2024b")));
    }

    /// Validates `AuthOrchestrator::handle_callback` behavior when the
    /// entitlement request itself fails.
    ///
    /// Assertions:
    /// - Confirms the login still ends `Connected` with unknown entitlements.
    /// - Confirms a warning notice explains the failed lookup.
    #[tokio::test]
    async fn test_entitlement_transport_failure_still_connects() {
        let harness = TestHarness::new();
        harness
            .resolver
            .set_result(Err(AuthError::EntitlementTransport("connection reset".to_string())));
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();

        orchestrator.handle_callback(&callback(&session_id, "XYZ")).await.unwrap();

        assert_eq!(orchestrator.status(), ConnectionStatus::Connected);
        let licensing = orchestrator.licensing().await.unwrap().unwrap();
        assert!(licensing.entitlements.is_none());
        assert!(licensing.selected_entitlement().is_none());
        assert!(harness.notifier.notices().iter().any(|n| n.level == NoticeLevel::Warning
            && n.message.starts_with("Could not fetch MATLAB entitlements")));
    }

    /// Validates `AuthOrchestrator::complete_login` behavior for a callback
    /// with a mismatched state arriving before the genuine one.
    ///
    /// Assertions:
    /// - Confirms the mismatched callback is skipped without an exchange.
    /// - Confirms the genuine callback completes the login.
    /// - Ensures the listener is closed once the callback is accepted.
    #[tokio::test]
    async fn test_complete_login_skips_mismatched_state() {
        let harness = TestHarness::new();
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();

        harness.listener.deliver(callback("WRONG", "EVIL"));
        harness.listener.deliver(callback(&session_id, "XYZ"));
        let session = orchestrator.complete_login(Duration::from_secs(5)).await.unwrap();

        assert_eq!(session.session_id, session_id);
        let exchanges = harness.client.exchanges();
        assert_eq!(exchanges.len(), 1);
        assert_eq!(exchanges[0].code, "XYZ");
        assert_eq!(orchestrator.status(), ConnectionStatus::Connected);
        assert!(!harness.listener.is_listening());
    }

    /// Validates `AuthOrchestrator::complete_login` behavior when only a
    /// mismatched callback arrives.
    ///
    /// Assertions:
    /// - Confirms the wait ends with `CallbackTimeout` and no exchange.
    #[tokio::test]
    async fn test_complete_login_times_out_after_mismatched_state() {
        let harness = TestHarness::new();
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();

        harness.listener.deliver(callback("WRONG", "EVIL"));
        let err = orchestrator.complete_login(Duration::from_millis(50)).await.unwrap_err();

        assert_eq!(err, AuthError::CallbackTimeout);
        assert_eq!(harness.client.exchange_count(), 0);
        assert_eq!(orchestrator.status(), ConnectionStatus::Disconnected);
        assert!(!harness.listener.is_listening());
    }

    /// Validates `AuthOrchestrator::handle_callback` behavior when the
    /// licensing record cannot be written after the session is saved.
    ///
    /// Assertions:
    /// - Confirms the login succeeds and the status is `Connected`.
    /// - Confirms a warning instead of an authentication failure notice.
    #[tokio::test]
    async fn test_licensing_write_failure_keeps_login() {
        let harness = TestHarness::new();
        harness.settings.fail_writes_to(Some(SETTINGS_KEY_LICENSING_INFO));
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();

        let session = orchestrator.handle_callback(&callback(&session_id, "XYZ")).await.unwrap();

        assert_eq!(orchestrator.status(), ConnectionStatus::Connected);
        assert_eq!(orchestrator.current_session().await.unwrap(), Some(session));
        let notices = harness.notifier.notices();
        assert!(notices.iter().any(|n| n.level == NoticeLevel::Warning
            && n.message.starts_with("Could not save MATLAB licensing info")));
        assert!(!notices.iter().any(|n| n.level == NoticeLevel::Error));
    }

    /// Validates `AuthOrchestrator::begin_login` behavior when the verifier
    /// cannot be stored.
    ///
    /// Assertions:
    /// - Confirms the storage error is returned and the status reverts.
    /// - Ensures the redirect listener is not left running.
    #[tokio::test]
    async fn test_begin_login_storage_failure_closes_listener() {
        let harness = TestHarness::new();
        harness.secrets.fail_writes(true);
        let orchestrator = harness.orchestrator();

        let err = orchestrator.begin_login().await.unwrap_err();

        assert!(matches!(err, AuthError::Storage(_)));
        assert_eq!(harness.listener.listen_count(), 1);
        assert!(!harness.listener.is_listening());
        assert!(orchestrator.pending_session_id().is_none());
        assert_eq!(orchestrator.status(), ConnectionStatus::Disconnected);
    }

    /// Validates `AuthOrchestrator::handle_callback` behavior for the
    /// identity payload scenario.
    ///
    /// Assertions:
    /// - Confirms the payload is rejected while disabled.
    /// - Confirms an enabled orchestrator persists a token-less session.
    #[tokio::test]
    async fn test_identity_payload_gate() {
        let harness = TestHarness::new();
        let uri = "vscode://spruhath.matlab/auth-complete?userData=%7B%22id%22%3A%22u9%22%2C%22email%22%3A%22e%40x.com%22%7D";

        let disabled = harness.orchestrator();
        let err = disabled.handle_callback(uri).await.unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedCallback(_)));

        let enabled = harness.orchestrator_with(OrchestratorConfig {
            accept_identity_payload: true,
            ..TestHarness::config()
        });
        let session = enabled.handle_callback(uri).await.unwrap();

        assert_eq!(session.identity.id, "u9");
        assert!(session.access_token.is_empty());
        assert_eq!(enabled.status(), ConnectionStatus::Connected);
        assert_eq!(harness.settings.snapshot()[SETTINGS_KEY_AUTH_SESSION]["hasToken"], false);
    }

    /// Validates `AuthOrchestrator::select_entitlement` behavior for the
    /// known and unknown id scenario.
    ///
    /// Assertions:
    /// - Confirms a known id is selected and mirrored to settings.
    /// - Confirms an unknown id leaves the selection unchanged.
    #[tokio::test]
    async fn test_select_entitlement() {
        let harness = TestHarness::new();
        harness.resolver.set_result(Ok(vec![
            entitlement("E1", "MATLAB"),
            entitlement("E2", "MATLAB Campus"),
        ]));
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();
        orchestrator.handle_callback(&callback(&session_id, "XYZ")).await.unwrap();

        assert!(orchestrator.select_entitlement("E2").await.unwrap());
        assert!(!orchestrator.select_entitlement("E9").await.unwrap());

        let listing = orchestrator.entitlements().await.unwrap();
        assert_eq!(listing.entitlements.len(), 2);
        assert_eq!(listing.selected.map(|e| e.id), Some("E2".to_string()));
        assert_eq!(
            harness.settings.value(SETTINGS_KEY_SELECTED_ENTITLEMENT),
            Some(Value::String("E2".to_string()))
        );
        assert!(harness
            .notifier
            .notices()
            .contains(&Notice::info("Selected entitlement: MATLAB Campus (E2)")));
    }

    /// Validates `AuthOrchestrator::select_entitlement` behavior for the
    /// signed-out scenario.
    ///
    /// Assertions:
    /// - Confirms the call is a no-op returning `false`.
    #[tokio::test]
    async fn test_select_entitlement_without_licensing() {
        let harness = TestHarness::new();
        let orchestrator = harness.orchestrator();

        assert!(!orchestrator.select_entitlement("E1").await.unwrap());
        assert!(harness.settings.value(SETTINGS_KEY_SELECTED_ENTITLEMENT).is_none());
    }

    /// Validates `AuthOrchestrator::sign_out` behavior for the signed-in
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the session, token and licensing info are gone.
    /// - Confirms the status is `Disconnected` with the sign-out notice.
    #[tokio::test]
    async fn test_sign_out_clears_everything() {
        let harness = TestHarness::new();
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();
        orchestrator.handle_callback(&callback(&session_id, "XYZ")).await.unwrap();

        orchestrator.sign_out().await.unwrap();

        assert!(orchestrator.current_session().await.unwrap().is_none());
        assert!(orchestrator.licensing().await.unwrap().is_none());
        assert!(harness.secrets.get_secret_value(SECRET_KEY_ACCESS_TOKEN).is_none());
        assert_eq!(orchestrator.status(), ConnectionStatus::Disconnected);
        assert_eq!(
            harness.notifier.notices().last(),
            Some(&Notice::info("Successfully signed out from MATLAB"))
        );
    }

    /// Validates `AuthOrchestrator::restore` behavior for the persisted
    /// session scenario.
    ///
    /// Assertions:
    /// - Confirms a fresh orchestrator over the same stores is `Connected`.
    /// - Confirms an empty store restores to `Disconnected`.
    #[tokio::test]
    async fn test_restore_from_persisted_state() {
        let harness = TestHarness::new();
        assert_eq!(harness.orchestrator().restore().await, ConnectionStatus::Disconnected);

        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let session_id = orchestrator.pending_session_id().unwrap();
        orchestrator.handle_callback(&callback(&session_id, "XYZ")).await.unwrap();

        let restarted = harness.orchestrator();
        assert_eq!(restarted.restore().await, ConnectionStatus::Connected);
        assert_eq!(restarted.current_session().await.unwrap().unwrap().session_id, session_id);
    }

    /// Validates `AuthOrchestrator::handle_callback` behavior for the failure
    /// while signed in scenario.
    ///
    /// Assertions:
    /// - Confirms a failed re-login keeps the existing session `Connected`.
    #[tokio::test]
    async fn test_failed_relogin_keeps_existing_session() {
        let harness = TestHarness::new();
        let orchestrator = harness.orchestrator();
        orchestrator.login().await.unwrap();
        let first = orchestrator.pending_session_id().unwrap();
        orchestrator.handle_callback(&callback(&first, "XYZ")).await.unwrap();

        orchestrator.login().await.unwrap();
        assert_eq!(orchestrator.status(), ConnectionStatus::Connecting);
        let err = orchestrator.handle_callback(&callback("WRONG", "XYZ")).await.unwrap_err();

        assert_eq!(err, AuthError::InvalidState);
        assert_eq!(orchestrator.status(), ConnectionStatus::Connected);
        assert_eq!(orchestrator.current_session().await.unwrap().unwrap().session_id, first);
    }
}
