//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use mlauth_common::auth::{
    AuthOrchestrator, AuthPorts, BrowserLauncher, DisplayNotifier, OAuthClient, OAuthConfig,
    OrchestratorConfig, SecretStore, SettingsStore, StatusNotifier,
};
use mlauth_common::KeychainProvider;
use mlauth_domain::{Config, MlAuthError, Result};
use mlauth_infra::{build_listener, FileSettingsStore, LicensingClient, RedirectTransport, SystemBrowser};
use tracing::info;

use crate::console::ConsoleNotifier;

/// Application context - holds the orchestrator and its transport
pub struct AppContext {
    /// Effective configuration
    pub config: Config,
    pub orchestrator: Arc<AuthOrchestrator>,
    /// Redirect listener shared with the orchestrator
    pub transport: RedirectTransport,
}

impl AppContext {
    /// Wire the production adapters for `config`.
    ///
    /// # Errors
    /// Returns `MlAuthError::Config` if an HTTP client cannot be built or
    /// `MlAuthError::Platform` when no settings location can be resolved.
    pub fn new(config: Config) -> Result<Self> {
        Self::builder(config).build()
    }

    #[must_use]
    pub fn builder(config: Config) -> AppContextBuilder {
        AppContextBuilder {
            config,
            secrets: None,
            settings: None,
            browser: None,
            status_notifier: None,
            display_notifier: None,
        }
    }

    /// Configured wait for the redirect callback.
    #[must_use]
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.config.redirect.callback_timeout_secs)
    }
}

/// Builder for [`AppContext`]; unset ports use the production adapters.
pub struct AppContextBuilder {
    config: Config,
    secrets: Option<Arc<dyn SecretStore>>,
    settings: Option<Arc<dyn SettingsStore>>,
    browser: Option<Arc<dyn BrowserLauncher>>,
    status_notifier: Option<Arc<dyn StatusNotifier>>,
    display_notifier: Option<Arc<dyn DisplayNotifier>>,
}

impl AppContextBuilder {
    #[must_use]
    pub fn secrets(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    #[must_use]
    pub fn browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = Some(browser);
        self
    }

    #[must_use]
    pub fn notifiers(
        mut self,
        status: Arc<dyn StatusNotifier>,
        display: Arc<dyn DisplayNotifier>,
    ) -> Self {
        self.status_notifier = Some(status);
        self.display_notifier = Some(display);
        self
    }

    /// # Errors
    /// See [`AppContext::new`].
    pub fn build(self) -> Result<AppContext> {
        let config = self.config;
        if config.oauth.client_id.trim().is_empty() {
            return Err(MlAuthError::Config("oauth.client_id must not be empty".to_string()));
        }
        let release = config.licensing.product_version.clone();

        let settings = match self.settings {
            Some(settings) => settings,
            None => {
                let path = match &config.storage.settings_path {
                    Some(path) => path.clone(),
                    None => FileSettingsStore::default_path()?,
                };
                info!(path = %path.display(), "Using settings file");
                Arc::new(FileSettingsStore::new(path))
            }
        };
        let secrets = self.secrets.unwrap_or_else(|| {
            Arc::new(KeychainProvider::new(config.storage.keychain_service.clone()))
        });
        let browser = self.browser.unwrap_or_else(|| Arc::new(SystemBrowser::new()));
        let console = Arc::new(ConsoleNotifier::new());
        let status_notifier = self.status_notifier.unwrap_or_else(|| console.clone());
        let display_notifier = self.display_notifier.unwrap_or(console);

        let transport = build_listener(&config.redirect);
        let resolver = LicensingClient::new(config.licensing.clone())?;
        let client = OAuthClient::new(OAuthConfig::from_settings(&config.oauth, &release));

        let orchestrator = AuthOrchestrator::new(
            OrchestratorConfig {
                product_version: release,
                client_id: config.oauth.client_id.clone(),
                accept_identity_payload: config.redirect.accept_identity_payload,
            },
            AuthPorts {
                client: Arc::new(client),
                resolver: Arc::new(resolver),
                listener: transport.listener(),
                browser,
                secrets,
                settings,
                status_notifier,
                display_notifier,
            },
        );

        info!(redirect_mode = %transport.mode(), "Application context initialised");
        Ok(AppContext { config, orchestrator: Arc::new(orchestrator), transport })
    }
}
