//! Application constants
//!
//! Storage keys must stay stable across releases so "already signed in" can
//! be detected after a restart.

// Ordinary settings storage
pub const SETTINGS_KEY_AUTH_SESSION: &str = "mlauth.authSession";
pub const SETTINGS_KEY_LICENSING_INFO: &str = "mlauth.licensingInfo";
pub const SETTINGS_KEY_PENDING_SESSION_ID: &str = "mlauth.sessionId";
pub const SETTINGS_KEY_SELECTED_ENTITLEMENT: &str = "mlauth.selectedEntitlement";

// Secret storage
pub const SECRET_KEY_ACCESS_TOKEN: &str = "mlauth.accessToken";
pub const SECRET_KEY_CODE_VERIFIER: &str = "mlauth.codeVerifier";

// Status bar labels
pub const STATUS_LABEL_CONNECTED: &str = "MATLAB: Connected";
pub const STATUS_LABEL_NOT_CONNECTED: &str = "MATLAB: Not Connected";
pub const STATUS_LABEL_CONNECTING: &str = "MATLAB: Establishing Connection";

// Provider defaults
pub const DEFAULT_OAUTH_HOST: &str = "https://signin-integ1.mathworks.com";
pub const DEFAULT_AUTHORIZE_PATH: &str = "/oauth2/v1/oauth/authorize";
pub const DEFAULT_TOKEN_PATH: &str = "/oauth2/v1/oauth/token";
pub const DEFAULT_CLIENT_ID: &str = "go-test-client";
pub const DEFAULT_PROFILE_TIER: &str = "extended";
pub const DEFAULT_LOCALE: &str = "en_US";

// Licensing defaults
pub const DEFAULT_LICENSING_ENDPOINT: &str =
    "https://licensing-integ1.mathworks.com/mls/service/v1/entitlement/list";
pub const DEFAULT_MATLAB_VERSION: &str = "R2024b";
pub const DEFAULT_CORE_PRODUCT: &str = "ML";
pub const DEFAULT_LICENSING_CONTEXT: &str = "vscode";

// Redirect defaults
pub const DEFAULT_CUSTOM_REDIRECT_URI: &str = "vscode://spruhath.matlab";
pub const DEFAULT_LOOPBACK_PORT: u16 = 31515;
pub const DEFAULT_CALLBACK_PATH: &str = "/callback";
pub const IDENTITY_PAYLOAD_PATH: &str = "/auth-complete";
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;

// Storage defaults
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "mlauth";
pub const SETTINGS_FILE_NAME: &str = "state.json";
