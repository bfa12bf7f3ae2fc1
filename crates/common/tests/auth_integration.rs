//! Integration tests for the auth module
//!
//! Drives the full sign-in flow through the public API: the real
//! `OAuthClient` against a mock token endpoint, with in-memory stores and
//! recording notifiers for every other port.

use std::sync::Arc;
use std::time::Duration;

use mlauth_common::auth::{
    AuthError, AuthOrchestrator, AuthPorts, Notice, OAuthClient, OAuthConfig, OrchestratorConfig,
};
use mlauth_common::testing::{
    entitlement, MemorySettingsStore, MockBrowser, MockEntitlementResolver, MockKeychainProvider,
    MockRedirectListener, RecordingNotifier, TestHarness,
};
use mlauth_domain::constants::{
    SECRET_KEY_ACCESS_TOKEN, SECRET_KEY_CODE_VERIFIER, SETTINGS_KEY_AUTH_SESSION,
    SETTINGS_KEY_PENDING_SESSION_ID,
};
use mlauth_domain::{ConnectionStatus, OAuthSettings};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REDIRECT_URI: &str = "vscode://spruhath.matlab";

struct Flow {
    orchestrator: AuthOrchestrator,
    browser: Arc<MockBrowser>,
    listener: Arc<MockRedirectListener>,
    secrets: Arc<MockKeychainProvider>,
    settings: Arc<MemorySettingsStore>,
    notifier: Arc<RecordingNotifier>,
}

fn flow_against(server: &MockServer) -> Flow {
    let settings = OAuthSettings { host: server.uri(), ..OAuthSettings::default() };
    let client = Arc::new(OAuthClient::new(OAuthConfig::from_settings(&settings, "R2024b")));

    let browser = Arc::new(MockBrowser::new());
    let listener = Arc::new(MockRedirectListener::new(REDIRECT_URI));
    let secrets = Arc::new(MockKeychainProvider::new("mlauth-integration"));
    let store = Arc::new(MemorySettingsStore::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let orchestrator = AuthOrchestrator::new(
        TestHarness::config(),
        AuthPorts {
            client,
            resolver: Arc::new(MockEntitlementResolver::new(vec![
                entitlement("E1", "MATLAB"),
                entitlement("E2", "MATLAB (Individual)"),
            ])),
            listener: listener.clone(),
            browser: browser.clone(),
            secrets: secrets.clone(),
            settings: store.clone(),
            status_notifier: notifier.clone(),
            display_notifier: notifier.clone(),
        },
    );

    Flow { orchestrator, browser, listener, secrets, settings: store, notifier }
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/oauth/token"))
        .and(body_string_contains("code=XYZ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessTokenString": "tok1",
            "expirationDate": "2026-12-01T00:00:00.000Z",
            "referenceDetail": {
                "userId": "u1",
                "email": "a@b.com",
                "displayName": "A B"
            }
        })))
        .mount(server)
        .await;
}

/// Validates the complete browser sign-in flow.
///
/// # Test Steps
/// 1. Start a login and capture the authorize URL opened in the browser
/// 2. Deliver the redirect carrying the pending state and code `XYZ`
/// 3. Verify the session, token and licensing info are persisted
/// 4. Verify the temporary verifier and session id are erased
#[tokio::test(flavor = "multi_thread")]
async fn test_full_login_flow() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    let flow = flow_against(&server);

    flow.orchestrator.login().await.expect("login should start");
    let opened = flow.browser.opened();
    assert_eq!(opened.len(), 1);
    let authorize = url::Url::parse(&opened[0]).expect("authorize URL parses");
    let state = authorize
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("state param");
    assert!(authorize.query_pairs().any(|(k, v)| k == "code_challenge_method" && v == "S256"));
    assert!(authorize.query_pairs().any(|(k, v)| k == "txn_id" && v == state));

    flow.listener.deliver(format!("{REDIRECT_URI}/callback?code=XYZ&state={state}"));
    let session = flow
        .orchestrator
        .complete_login(Duration::from_secs(5))
        .await
        .expect("login should complete");

    assert_eq!(session.session_id, state);
    assert_eq!(session.identity.email, "a@b.com");
    assert_eq!(flow.orchestrator.status(), ConnectionStatus::Connected);
    assert_eq!(flow.secrets.get_secret_value(SECRET_KEY_ACCESS_TOKEN).as_deref(), Some("tok1"));
    assert!(flow.secrets.get_secret_value(SECRET_KEY_CODE_VERIFIER).is_none());
    assert!(flow.settings.value(SETTINGS_KEY_PENDING_SESSION_ID).is_none());
    assert_eq!(flow.settings.snapshot()[SETTINGS_KEY_AUTH_SESSION]["hasToken"], true);

    let licensing = flow.orchestrator.licensing().await.unwrap().expect("licensing stored");
    assert_eq!(licensing.display_name, "A B");
    assert_eq!(licensing.selected_entitlement().map(|e| e.id.as_str()), Some("E1"));
    assert!(flow.notifier.notices().contains(&Notice::info("Successfully connected to MATLAB")));
    assert_eq!(
        flow.notifier.statuses(),
        vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
    );
}

/// Validates that a forged callback never reaches the token endpoint.
///
/// # Test Steps
/// 1. Start a login
/// 2. Hand a redirect whose state does not match to `handle_callback`
/// 3. Verify `InvalidState`, a `Disconnected` status and no token request
#[tokio::test(flavor = "multi_thread")]
async fn test_forged_state_is_rejected() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    let flow = flow_against(&server);

    flow.orchestrator.login().await.unwrap();
    let err = flow
        .orchestrator
        .handle_callback(&format!("{REDIRECT_URI}/callback?code=XYZ&state=WRONG"))
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::InvalidState);
    assert_eq!(flow.orchestrator.status(), ConnectionStatus::Disconnected);
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

/// Validates that a forged redirect does not cost the genuine one.
///
/// # Test Steps
/// 1. Start a login and queue a forged redirect ahead of the genuine one
/// 2. Wait for the login to complete
/// 3. Verify one token request carrying the genuine code
#[tokio::test(flavor = "multi_thread")]
async fn test_forged_redirect_before_genuine_one() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    let flow = flow_against(&server);

    flow.orchestrator.login().await.unwrap();
    let state = flow.orchestrator.pending_session_id().unwrap();
    flow.listener.deliver(format!("{REDIRECT_URI}/callback?code=EVIL&state=WRONG"));
    flow.listener.deliver(format!("{REDIRECT_URI}/callback?code=XYZ&state={state}"));

    let session = flow.orchestrator.complete_login(Duration::from_secs(5)).await.unwrap();

    assert_eq!(session.session_id, state);
    assert_eq!(flow.orchestrator.status(), ConnectionStatus::Connected);
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(body.contains("code=XYZ"));
    assert!(!body.contains("EVIL"));
}

/// Validates the token endpoint rejection path.
///
/// # Test Steps
/// 1. Mount a token endpoint answering 400 `invalid_grant`
/// 2. Complete a login with the genuine state
/// 3. Verify `TokenEndpoint { status: 400 }` and nothing persisted
#[tokio::test(flavor = "multi_thread")]
async fn test_token_endpoint_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "code expired"
        })))
        .mount(&server)
        .await;
    let flow = flow_against(&server);

    flow.orchestrator.login().await.unwrap();
    let state = flow.orchestrator.pending_session_id().unwrap();
    let err = flow
        .orchestrator
        .handle_callback(&format!("{REDIRECT_URI}/callback?code=XYZ&state={state}"))
        .await
        .unwrap_err();

    assert_eq!(err, AuthError::TokenEndpoint { status: 400 });
    assert!(flow.orchestrator.current_session().await.unwrap().is_none());
    assert!(flow.secrets.get_secret_value(SECRET_KEY_CODE_VERIFIER).is_none());
}

/// Validates that no callback within the timeout fails the login.
///
/// # Test Steps
/// 1. Start a login
/// 2. Wait with a short timeout and deliver nothing
/// 3. Verify `CallbackTimeout` and a `Disconnected` status
#[tokio::test(flavor = "multi_thread")]
async fn test_callback_timeout() {
    let server = MockServer::start().await;
    let flow = flow_against(&server);

    flow.orchestrator.login().await.unwrap();
    let err = flow.orchestrator.complete_login(Duration::from_millis(50)).await.unwrap_err();

    assert_eq!(err, AuthError::CallbackTimeout);
    assert_eq!(flow.orchestrator.status(), ConnectionStatus::Disconnected);
}

/// Validates that a second login supersedes the first.
///
/// # Test Steps
/// 1. Start two logins back to back
/// 2. Deliver a redirect carrying the first state
/// 3. Verify it is rejected and the second state still completes
#[tokio::test(flavor = "multi_thread")]
async fn test_second_login_supersedes_first() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    let flow = flow_against(&server);

    flow.orchestrator.login().await.unwrap();
    let first = flow.orchestrator.pending_session_id().unwrap();
    flow.orchestrator.login().await.unwrap();
    let second = flow.orchestrator.pending_session_id().unwrap();
    assert_ne!(first, second);

    let stale = flow
        .orchestrator
        .handle_callback(&format!("{REDIRECT_URI}/callback?code=XYZ&state={first}"))
        .await;
    assert_eq!(stale.unwrap_err(), AuthError::InvalidState);

    let session = flow
        .orchestrator
        .handle_callback(&format!("{REDIRECT_URI}/callback?code=XYZ&state={second}"))
        .await
        .unwrap();
    assert_eq!(session.session_id, second);
}

/// Validates sign-out and the session change events it emits.
///
/// # Test Steps
/// 1. Sign in and subscribe to session changes
/// 2. Sign out
/// 3. Verify a `removed` event and that no session or token remains
#[tokio::test(flavor = "multi_thread")]
async fn test_sign_out_emits_removal() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    let flow = flow_against(&server);

    flow.orchestrator.login().await.unwrap();
    let state = flow.orchestrator.pending_session_id().unwrap();
    flow.orchestrator
        .handle_callback(&format!("{REDIRECT_URI}/callback?code=XYZ&state={state}"))
        .await
        .unwrap();

    let mut events = flow.orchestrator.session_store().subscribe();
    flow.orchestrator.sign_out().await.unwrap();

    let event = events.recv().await.expect("removal event");
    assert_eq!(event.removed.len(), 1);
    assert_eq!(event.removed[0].id, state);
    assert!(flow.orchestrator.current_session().await.unwrap().is_none());
    assert!(flow.secrets.get_secret_value(SECRET_KEY_ACCESS_TOKEN).is_none());
    assert_eq!(flow.orchestrator.status(), ConnectionStatus::Disconnected);
}

/// Validates entitlement selection surviving a restart.
///
/// # Test Steps
/// 1. Sign in and select entitlement `E2`
/// 2. Build a fresh orchestrator over the same stores and restore
/// 3. Verify it is `Connected` with `E2` selected
#[tokio::test(flavor = "multi_thread")]
async fn test_selection_survives_restart() {
    let harness = TestHarness::new();
    harness
        .resolver
        .set_result(Ok(vec![entitlement("E1", "MATLAB"), entitlement("E2", "Campus")]));

    let orchestrator = harness.orchestrator();
    orchestrator.login().await.unwrap();
    let state = orchestrator.pending_session_id().unwrap();
    orchestrator
        .handle_callback(&format!("{REDIRECT_URI}/callback?code=XYZ&state={state}"))
        .await
        .unwrap();
    assert!(orchestrator.select_entitlement("E2").await.unwrap());

    let restarted = harness.orchestrator_with(OrchestratorConfig {
        accept_identity_payload: false,
        ..TestHarness::config()
    });
    assert_eq!(restarted.restore().await, ConnectionStatus::Connected);

    let listing = restarted.entitlements().await.unwrap();
    assert_eq!(listing.selected.map(|e| e.id), Some("E2".to_string()));
}
