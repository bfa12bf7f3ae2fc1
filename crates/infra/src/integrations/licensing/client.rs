//! Entitlement resolution over HTTP.

use async_trait::async_trait;
use mlauth_common::auth::{AuthError, EntitlementResolver};
use mlauth_domain::{Entitlement, LicensingSettings, MlAuthError};
use tracing::{debug, warn};

use super::parser::parse_entitlements;
use crate::http::HttpClient;

/// Licensing service client
#[derive(Clone)]
pub struct LicensingClient {
    settings: LicensingSettings,
    http: HttpClient,
}

impl LicensingClient {
    /// # Errors
    /// Returns `MlAuthError::Config` if the HTTP client cannot be built.
    pub fn new(settings: LicensingSettings) -> Result<Self, MlAuthError> {
        Ok(Self { settings, http: HttpClient::new()? })
    }

    #[must_use]
    pub fn with_http_client(settings: LicensingSettings, http: HttpClient) -> Self {
        Self { settings, http }
    }

    #[must_use]
    pub fn settings(&self) -> &LicensingSettings {
        &self.settings
    }

    fn form<'a>(&'a self, access_token: &'a str, version: &'a str) -> [(&'static str, &'a str); 5] {
        [
            ("token", access_token),
            ("release", version),
            ("coreProduct", self.settings.core_product.as_str()),
            ("context", self.settings.context.as_str()),
            ("excludeExpired", if self.settings.exclude_expired { "true" } else { "false" }),
        ]
    }
}

#[async_trait]
impl EntitlementResolver for LicensingClient {
    async fn resolve_entitlements(
        &self,
        access_token: &str,
        product_version: &str,
    ) -> Result<Vec<Entitlement>, AuthError> {
        let endpoint = &self.settings.endpoint;
        debug!(endpoint = %endpoint, version = %product_version, "Requesting entitlements");

        let response = self
            .http
            .post_form(endpoint, &self.form(access_token, product_version))
            .await
            .map_err(|e| AuthError::EntitlementTransport(e.to_string()))?;

        if !response.is_success() {
            let status = response.status.as_u16();
            warn!(endpoint = %endpoint, http_status = status, "Licensing request failed");
            return Err(AuthError::EntitlementTransport(format!(
                "Communication with {endpoint} failed ({status}). For more details, see the MathWorks licensing portal."
            )));
        }

        let entitlements = parse_entitlements(&response.body, product_version)?;
        debug!(entitlement_count = entitlements.len(), "Entitlements parsed");
        Ok(entitlements)
    }
}
