//! `describe_entitlements_response` XML parsing
//!
//! ```xml
//! <describe_entitlements_response>
//!   <entitlements>
//!     <entitlement>
//!       <id>E1</id>
//!       <label>MATLAB</label>
//!       <license_number>40000000</license_number>
//!     </entitlement>
//!   </entitlements>
//! </describe_entitlements_response>
//! ```
//!
//! One `<entitlement>` and many parse into the same list shape.

use mlauth_common::auth::AuthError;
use mlauth_domain::Entitlement;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DescribeEntitlementsResponse {
    entitlements: Option<EntitlementList>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EntitlementList {
    entitlement: Vec<EntitlementElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EntitlementElement {
    id: String,
    label: String,
    license_number: String,
    license_use: String,
    permissions: String,
    expiration_date: String,
    status: String,
}

impl EntitlementElement {
    fn into_entitlement(self, version: &str) -> Entitlement {
        Entitlement {
            id: self.id.trim().to_string(),
            name: self.label.trim().to_string(),
            expiry: self.expiration_date.trim().to_string(),
            status: self.status.trim().to_string(),
            product_number: self.license_number.trim().to_string(),
            license_use: self.license_use.trim().to_string(),
            permissions: self.permissions.trim().to_string(),
            version: version.to_string(),
        }
    }
}

/// Parse a licensing response body into entitlements for `version`
///
/// Order is preserved as received.
///
/// # Errors
/// - `AuthError::NoValidLicense` when the document has no entitlements
/// - `AuthError::EntitlementTransport` when the body is not valid XML
pub fn parse_entitlements(body: &str, version: &str) -> Result<Vec<Entitlement>, AuthError> {
    let response: DescribeEntitlementsResponse = quick_xml::de::from_str(body)
        .map_err(|e| AuthError::EntitlementTransport(format!("invalid licensing response: {e}")))?;

    let entitlements = response.entitlements.map(|list| list.entitlement).unwrap_or_default();
    if entitlements.is_empty() {
        return Err(AuthError::NoValidLicense { version: version.to_string() });
    }

    Ok(entitlements.into_iter().map(|e| e.into_entitlement(version)).collect())
}
