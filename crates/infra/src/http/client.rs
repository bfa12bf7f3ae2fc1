use std::time::Duration;

use mlauth_domain::MlAuthError;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Serialize;
use tracing::debug;

use crate::errors::InfraError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Status and body of a completed request.
///
/// Non-success statuses are still a completed request; callers decide how
/// to report them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Form-posting HTTP client for the licensing service.
///
/// Every request is a single attempt bounded by the configured timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// # Errors
    /// Returns `MlAuthError::Config` if the TLS backend cannot initialise.
    pub fn new() -> Result<Self, MlAuthError> {
        Self::builder().build()
    }

    /// POST `form` as `application/x-www-form-urlencoded` and read the body.
    ///
    /// # Errors
    /// Returns `MlAuthError::Network` on connect, timeout or body read
    /// failures and `MlAuthError::Config` if the request cannot be built.
    pub async fn post_form<F>(&self, url: &str, form: &F) -> Result<HttpResponse, MlAuthError>
    where
        F: Serialize + ?Sized,
    {
        let request = self.client.post(url).form(form).build().map_err(InfraError::from)?;
        debug!(url = %request.url(), "sending HTTP request");

        let response = self.client.execute(request).await.map_err(InfraError::from)?;
        let status = response.status();
        debug!(url, http_status = status.as_u16(), "received HTTP response");

        let body = response
            .text()
            .await
            .map_err(|err| MlAuthError::Network(format!("failed to read response body: {err}")))?;

        Ok(HttpResponse { status, body })
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("mlauth/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientBuilder {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// # Errors
    /// Returns `MlAuthError::Config` if the reqwest client cannot be built.
    pub fn build(self) -> Result<HttpClient, MlAuthError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .build()
            .map_err(|err| MlAuthError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpClient { client })
    }
}
