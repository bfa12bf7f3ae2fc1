//! Orchestrator wired with mocks

use std::sync::Arc;

use mlauth_domain::constants::{DEFAULT_CLIENT_ID, DEFAULT_CUSTOM_REDIRECT_URI, DEFAULT_MATLAB_VERSION};

use super::fixtures::{entitlement, sample_token};
use super::mocks::{
    MemorySettingsStore, MockBrowser, MockEntitlementResolver, MockKeychainProvider,
    MockOAuthClient, MockRedirectListener, RecordingNotifier,
};
use crate::auth::{AuthOrchestrator, AuthPorts, OrchestratorConfig};

/// Every mock port, shared with the orchestrator built from it
pub struct TestHarness {
    pub client: Arc<MockOAuthClient>,
    pub resolver: Arc<MockEntitlementResolver>,
    pub listener: Arc<MockRedirectListener>,
    pub browser: Arc<MockBrowser>,
    pub secrets: Arc<MockKeychainProvider>,
    pub settings: Arc<MemorySettingsStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestHarness {
    /// Exchange yields [`sample_token`]; resolution yields entitlement `E1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Arc::new(MockOAuthClient::new(sample_token())),
            resolver: Arc::new(MockEntitlementResolver::new(vec![entitlement("E1", "MATLAB")])),
            listener: Arc::new(MockRedirectListener::new(DEFAULT_CUSTOM_REDIRECT_URI)),
            browser: Arc::new(MockBrowser::new()),
            secrets: Arc::new(MockKeychainProvider::default()),
            settings: Arc::new(MemorySettingsStore::new()),
            notifier: Arc::new(RecordingNotifier::new()),
        }
    }

    #[must_use]
    pub fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            product_version: DEFAULT_MATLAB_VERSION.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            accept_identity_payload: false,
        }
    }

    #[must_use]
    pub fn orchestrator(&self) -> AuthOrchestrator {
        self.orchestrator_with(Self::config())
    }

    /// Build an orchestrator sharing this harness's mocks; orchestrators
    /// built from the same harness see the same persisted state.
    #[must_use]
    pub fn orchestrator_with(&self, config: OrchestratorConfig) -> AuthOrchestrator {
        AuthOrchestrator::new(
            config,
            AuthPorts {
                client: self.client.clone(),
                resolver: self.resolver.clone(),
                listener: self.listener.clone(),
                browser: self.browser.clone(),
                secrets: self.secrets.clone(),
                settings: self.settings.clone(),
                status_notifier: self.notifier.clone(),
                display_notifier: self.notifier.clone(),
            },
        )
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
