use std::sync::Arc;

use mlauth_app::AppContext;
use mlauth_common::testing::{MockBrowser, MockKeychainProvider, RecordingNotifier};
use mlauth_domain::{Config, RedirectMode};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENTITLEMENTS_XML: &str = "<describe_entitlements_response><entitlements>\
    <entitlement><id>E1</id><label>MATLAB</label><license_number>41</license_number></entitlement>\
    <entitlement><id>E2</id><label>MATLAB Campus</label><license_number>42</license_number></entitlement>\
    </entitlements></describe_entitlements_response>";

/// Shared state for command tests; contexts built from it see the same
/// settings file and secret store.
pub struct TestEnv {
    /// Token and entitlement endpoints.
    pub server: MockServer,
    pub secrets: Arc<MockKeychainProvider>,
    pub browser: Arc<MockBrowser>,
    pub notifier: Arc<RecordingNotifier>,
    /// Keep temporary directory alive for the lifetime of the environment.
    pub temp_dir: TempDir,
}

impl TestEnv {
    pub fn config(&self, mode: RedirectMode) -> Config {
        let mut config = Config::default();
        config.oauth.host = self.server.uri();
        config.licensing.endpoint =
            format!("{}/mls/service/v1/entitlement/list", self.server.uri());
        config.redirect.mode = mode;
        config.redirect.loopback_port = 0;
        config.storage.settings_path = Some(self.temp_dir.path().join("state.json"));
        config
    }

    pub fn context(&self, mode: RedirectMode) -> AppContext {
        AppContext::builder(self.config(mode))
            .secrets(self.secrets.clone())
            .browser(self.browser.clone())
            .notifiers(self.notifier.clone(), self.notifier.clone())
            .build()
            .expect("failed to build app context")
    }
}

/// Start mock endpoints and a fresh settings directory.
pub async fn setup_test_env() -> TestEnv {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessTokenString": "tok1",
            "expirationDate": "2026-12-01T00:00:00.000Z",
            "referenceDetail": {"userId": "u1", "email": "a@b.com", "displayName": "A B"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mls/service/v1/entitlement/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ENTITLEMENTS_XML))
        .mount(&server)
        .await;

    TestEnv {
        server,
        secrets: Arc::new(MockKeychainProvider::new("mlauth-app-test")),
        browser: Arc::new(MockBrowser::new()),
        notifier: Arc::new(RecordingNotifier::new()),
        temp_dir: TempDir::new().expect("failed to create temporary settings directory"),
    }
}
