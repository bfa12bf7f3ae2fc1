//! OAuth 2.0 client implementation with PKCE support
//!
//! Builds the browser authorize URL and performs the authorization-code
//! exchange against the provider token endpoint. No retries: the code is
//! single-use, so a failed exchange surfaces immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::pkce::PkceChallenge;
use super::traits::OAuthClientTrait;
use super::types::{AuthError, OAuthConfig, OAuthError, Token, TokenResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth 2.0 client for the identity provider
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    client: Client,
}

impl OAuthClient {
    /// Create a new OAuth client with the given configuration
    ///
    /// # Examples
    /// ```
    /// use mlauth_common::auth::{OAuthClient, OAuthConfig};
    /// use mlauth_domain::OAuthSettings;
    ///
    /// let config = OAuthConfig::from_settings(&OAuthSettings::default(), "R2024b");
    /// let client = OAuthClient::new(config);
    /// assert_eq!(client.config().client_id, "go-test-client");
    /// ```
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        let client =
            Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    /// Build the authorize URL for a login attempt
    ///
    /// The session id is sent as both `state` and `txn_id`.
    #[must_use]
    pub fn authorization_url(&self, challenge: &PkceChallenge, redirect_uri: &str) -> String {
        let params = [
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("state", challenge.session_id.as_str()),
            ("code_challenge", challenge.code_challenge.as_str()),
            ("code_challenge_method", challenge.challenge_method()),
            ("txn_id", challenge.session_id.as_str()),
            ("release", self.config.release.as_str()),
            ("platform", self.config.platform.as_str()),
            ("profile_tier", self.config.profile_tier.as_str()),
            ("locale", self.config.locale.as_str()),
        ];

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.config.authorize_url, query_string)
    }

    /// Exchange authorization code for a token
    ///
    /// # Errors
    /// Returns:
    /// - `AuthError::TokenTransport` if the request cannot be sent
    /// - `AuthError::TokenEndpoint` on any non-success status
    /// - `AuthError::MalformedTokenResponse` if the body is not usable
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<Token, AuthError> {
        let mut request_body = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = self.config.client_secret() {
            request_body.push(("client_secret", secret));
        }
        request_body.push(("redirect_uri", redirect_uri));
        request_body.push(("code_verifier", code_verifier));

        debug!(token_url = %self.config.token_url, "Exchanging authorization code");

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&request_body)
            .send()
            .await
            .map_err(|e| AuthError::TokenTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<OAuthError>(&body) {
                Ok(envelope) if !envelope.error.is_empty() => {
                    warn!(http_status = status.as_u16(), error = %envelope, "Token exchange rejected");
                }
                _ => warn!(http_status = status.as_u16(), "Token exchange rejected"),
            }
            return Err(AuthError::TokenEndpoint { status: status.as_u16() });
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedTokenResponse(e.to_string()))?;
        let token = token_response.into_token()?;

        info!(user_id = %token.identity.id, "Token exchange succeeded");

        Ok(token)
    }

    /// Get a reference to the OAuth configuration
    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }
}

#[async_trait]
impl OAuthClientTrait for OAuthClient {
    fn authorization_url(&self, challenge: &PkceChallenge, redirect_uri: &str) -> String {
        self.authorization_url(challenge, redirect_uri)
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<Token, AuthError> {
        self.exchange_code(code, code_verifier, redirect_uri).await
    }
}
