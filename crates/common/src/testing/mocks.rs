//! Mock implementations of the auth ports
//!
//! Provides in-memory, inspectable objects for testing purposes.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mlauth_domain::{ConnectionStatus, Entitlement, Identity, LicensingInfo};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::auth::{
    AuthError, BrowserLauncher, DisplayNotifier, EntitlementResolver, Notice, OAuthClientTrait,
    PkceChallenge, RedirectListener, SecretStore, SettingsStore, StatusNotifier, Token,
};

// Type aliases to reduce complexity
type StorageData = Arc<Mutex<HashMap<String, String>>>;

/// In-memory secret store standing in for the OS keychain
#[derive(Debug, Clone)]
pub struct MockKeychainProvider {
    storage: StorageData,
    service_name: String,
    fail_writes: Arc<AtomicBool>,
}

impl MockKeychainProvider {
    /// Create a new mock keychain provider with a service name for namespacing.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
            service_name: service_name.into(),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Read a stored secret directly.
    #[must_use]
    pub fn get_secret_value(&self, key: &str) -> Option<String> {
        self.storage.lock().get(key).cloned()
    }

    /// Seed a secret directly.
    pub fn insert(&self, key: &str, value: &str) {
        self.storage.lock().insert(key.to_string(), value.to_string());
    }

    /// Make subsequent `set_secret` calls fail with `AuthError::Storage`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Default for MockKeychainProvider {
    fn default() -> Self {
        Self::new("mlauth-test")
    }
}

#[async_trait]
impl SecretStore for MockKeychainProvider {
    async fn get_secret(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.get_secret_value(key))
    }

    async fn set_secret(&self, key: &str, value: &str) -> Result<(), AuthError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AuthError::Storage(format!("keychain write refused for {key}")));
        }
        self.insert(key, value);
        Ok(())
    }

    async fn delete_secret(&self, key: &str) -> Result<(), AuthError> {
        self.storage.lock().remove(key);
        Ok(())
    }
}

/// In-memory settings store
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<Map<String, Value>>,
    failing_key: Mutex<Option<String>>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored values as one JSON object.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        Value::Object(self.values.lock().clone())
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.values.lock().insert(key.to_string(), value);
    }

    /// Make writes to `key` fail with `AuthError::Storage`; `None` clears it.
    pub fn fail_writes_to(&self, key: Option<&str>) {
        *self.failing_key.lock() = key.map(str::to_string);
    }

    fn check_write(&self, key: &str) -> Result<(), AuthError> {
        if self.failing_key.lock().as_deref() == Some(key) {
            return Err(AuthError::Storage(format!("write to {key} refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get_value(&self, key: &str) -> Result<Option<Value>, AuthError> {
        Ok(self.value(key))
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<(), AuthError> {
        self.check_write(key)?;
        self.insert(key, value);
        Ok(())
    }

    async fn remove_value(&self, key: &str) -> Result<(), AuthError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Arguments of one recorded token exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeCall {
    pub code: String,
    pub code_verifier: String,
    pub redirect_uri: String,
}

/// Mock OAuth client that simulates the provider without network calls.
#[derive(Debug)]
pub struct MockOAuthClient {
    result: Mutex<Result<Token, AuthError>>,
    exchanges: Mutex<Vec<ExchangeCall>>,
    challenges: Mutex<Vec<String>>,
}

impl MockOAuthClient {
    /// Client whose exchange succeeds with `token`.
    #[must_use]
    pub fn new(token: Token) -> Self {
        Self::with_result(Ok(token))
    }

    #[must_use]
    pub fn with_result(result: Result<Token, AuthError>) -> Self {
        Self {
            result: Mutex::new(result),
            exchanges: Mutex::new(Vec::new()),
            challenges: Mutex::new(Vec::new()),
        }
    }

    pub fn set_result(&self, result: Result<Token, AuthError>) {
        *self.result.lock() = result;
    }

    #[must_use]
    pub fn exchanges(&self) -> Vec<ExchangeCall> {
        self.exchanges.lock().clone()
    }

    #[must_use]
    pub fn exchange_count(&self) -> usize {
        self.exchanges.lock().len()
    }

    /// Code challenges of every authorize URL built so far.
    #[must_use]
    pub fn challenges(&self) -> Vec<String> {
        self.challenges.lock().clone()
    }
}

#[async_trait]
impl OAuthClientTrait for MockOAuthClient {
    fn authorization_url(&self, challenge: &PkceChallenge, redirect_uri: &str) -> String {
        self.challenges.lock().push(challenge.code_challenge.clone());
        format!(
            "https://idp.test/oauth2/v1/oauth/authorize?state={}&code_challenge={}&redirect_uri={}",
            challenge.session_id,
            challenge.code_challenge,
            urlencoding::encode(redirect_uri)
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<Token, AuthError> {
        self.exchanges.lock().push(ExchangeCall {
            code: code.to_string(),
            code_verifier: code_verifier.to_string(),
            redirect_uri: redirect_uri.to_string(),
        });
        self.result.lock().clone()
    }
}

/// Mock entitlement resolver with a scripted result
#[derive(Debug)]
pub struct MockEntitlementResolver {
    result: Mutex<Result<Vec<Entitlement>, AuthError>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockEntitlementResolver {
    #[must_use]
    pub fn new(entitlements: Vec<Entitlement>) -> Self {
        Self::with_result(Ok(entitlements))
    }

    #[must_use]
    pub fn with_result(result: Result<Vec<Entitlement>, AuthError>) -> Self {
        Self { result: Mutex::new(result), calls: Mutex::new(Vec::new()) }
    }

    pub fn set_result(&self, result: Result<Vec<Entitlement>, AuthError>) {
        *self.result.lock() = result;
    }

    /// `(access_token, product_version)` of every call.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl EntitlementResolver for MockEntitlementResolver {
    async fn resolve_entitlements(
        &self,
        access_token: &str,
        product_version: &str,
    ) -> Result<Vec<Entitlement>, AuthError> {
        self.calls.lock().push((access_token.to_string(), product_version.to_string()));
        self.result.lock().clone()
    }
}

/// Browser launcher that records URLs instead of opening them
#[derive(Debug, Default)]
pub struct MockBrowser {
    opened: Mutex<Vec<String>>,
    failure: Mutex<Option<AuthError>>,
}

impl MockBrowser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `open` calls fail with `err`.
    pub fn fail_with(&self, err: AuthError) {
        *self.failure.lock() = Some(err);
    }

    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

impl BrowserLauncher for MockBrowser {
    fn open(&self, url: &str) -> Result<(), AuthError> {
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        self.opened.lock().push(url.to_string());
        Ok(())
    }
}

/// Channel-backed redirect listener; tests push callbacks with `deliver`
#[derive(Debug)]
pub struct MockRedirectListener {
    redirect_uri: String,
    sender: mpsc::UnboundedSender<String>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    listening: AtomicBool,
    listen_count: AtomicUsize,
}

impl MockRedirectListener {
    #[must_use]
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            redirect_uri: redirect_uri.into(),
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
            listening: AtomicBool::new(false),
            listen_count: AtomicUsize::new(0),
        }
    }

    /// Queue a callback URI for `wait_for_callback`.
    pub fn deliver(&self, uri: impl Into<String>) {
        let _ = self.sender.send(uri.into());
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn listen_count(&self) -> usize {
        self.listen_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RedirectListener for MockRedirectListener {
    async fn listen(&self) -> Result<String, AuthError> {
        self.listening.store(true, Ordering::SeqCst);
        self.listen_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.redirect_uri.clone())
    }

    fn redirect_uri(&self) -> String {
        self.redirect_uri.clone()
    }

    async fn wait_for_callback(&self, timeout: Duration) -> Result<String, AuthError> {
        let mut receiver = self.receiver.lock().await;
        match tokio::time::timeout(timeout, receiver.recv()).await {
            Ok(Some(uri)) => Ok(uri),
            Ok(None) => Err(AuthError::Redirect("callback channel closed".to_string())),
            Err(_) => {
                self.listening.store(false, Ordering::SeqCst);
                Err(AuthError::CallbackTimeout)
            }
        }
    }

    async fn close(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }
}

/// One display notifier call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayUpdate {
    Auth { connected: bool, identity: Option<Identity> },
    Licensing(Option<LicensingInfo>),
}

/// Captures everything sent to the status and display notifiers
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    statuses: Mutex<Vec<ConnectionStatus>>,
    notices: Mutex<Vec<Notice>>,
    display: Mutex<Vec<DisplayUpdate>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.statuses.lock().clone()
    }

    #[must_use]
    pub fn last_status(&self) -> Option<ConnectionStatus> {
        self.statuses.lock().last().copied()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    #[must_use]
    pub fn display_updates(&self) -> Vec<DisplayUpdate> {
        self.display.lock().clone()
    }

    /// Most recent licensing info pushed to the display.
    #[must_use]
    pub fn last_licensing(&self) -> Option<Option<LicensingInfo>> {
        self.display.lock().iter().rev().find_map(|update| match update {
            DisplayUpdate::Licensing(info) => Some(info.clone()),
            DisplayUpdate::Auth { .. } => None,
        })
    }
}

impl StatusNotifier for RecordingNotifier {
    fn status_changed(&self, status: ConnectionStatus) {
        self.statuses.lock().push(status);
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

impl DisplayNotifier for RecordingNotifier {
    fn auth_status_changed(&self, connected: bool, identity: Option<&Identity>) {
        self.display
            .lock()
            .push(DisplayUpdate::Auth { connected, identity: identity.cloned() });
    }

    fn licensing_changed(&self, licensing: Option<&LicensingInfo>) {
        self.display.lock().push(DisplayUpdate::Licensing(licensing.cloned()));
    }
}
