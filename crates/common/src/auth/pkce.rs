//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 S256 challenges. The per-login session id doubles as
//! the OAuth `state` parameter and is correlated with the callback.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

const SESSION_ID_BYTES: usize = 4;
const VERIFIER_BYTES: usize = 32;

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate a session identifier
///
/// 4 random bytes, hex-encoded (8 characters).
#[must_use]
pub fn generate_session_id() -> String {
    hex::encode(random_bytes::<SESSION_ID_BYTES>())
}

/// Generate a cryptographically secure code verifier
///
/// 32 random bytes, URL-safe base64 without padding (43 characters).
#[must_use]
pub fn generate_code_verifier() -> String {
    URL_SAFE_NO_PAD.encode(random_bytes::<VERIFIER_BYTES>())
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier)))
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// PKCE material for one login attempt
#[derive(Clone)]
pub struct PkceChallenge {
    /// Correlates the login attempt with its callback (sent as `state`)
    pub session_id: String,

    /// Kept secret until token exchange
    pub code_verifier: String,

    /// SHA256 hash of `code_verifier`, sent in the authorization request
    pub code_challenge: String,
}

impl PkceChallenge {
    /// Generate fresh random values for a login attempt
    ///
    /// # Examples
    /// ```
    /// use mlauth_common::auth::pkce::PkceChallenge;
    ///
    /// let challenge = PkceChallenge::generate();
    /// assert_eq!(challenge.session_id.len(), 8);
    /// assert!(challenge.code_verifier.len() >= 43);
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);

        Self { session_id: generate_session_id(), code_verifier, code_challenge }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("session_id", &self.session_id)
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}
