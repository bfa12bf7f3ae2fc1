//! Licensing information and entitlements derived from an access token

use serde::{Deserialize, Serialize};

use super::session::Identity;

/// Kind of licensing backing the session. Only OAuth sign-in is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicensingKind {
    #[default]
    Oauth,
}

/// A single license grant held by the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Entitlement {
    pub id: String,
    pub name: String,
    pub expiry: String,
    pub status: String,
    pub product_number: String,
    pub license_use: String,
    pub permissions: String,
    pub version: String,
}

/// Licensing state shown by the side panel.
///
/// Supplementary to [`super::AuthSession`]: it may be stale if a sign-out
/// failed to clear it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicensingInfo {
    #[serde(rename = "type", default)]
    pub kind: LicensingKind,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub email_addr: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub source_id: String,
    /// `None` means entitlements are unknown (resolution failed), which is
    /// distinct from an empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entitlements: Option<Vec<Entitlement>>,
    /// Pointer into `entitlements` by id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entitlement_id: Option<String>,
}

impl LicensingInfo {
    /// Build licensing info for an identity, without entitlements.
    #[must_use]
    pub fn for_identity(identity: &Identity, expiry: &str, source_id: &str) -> Self {
        Self {
            kind: LicensingKind::Oauth,
            expiry: expiry.to_string(),
            email_addr: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            display_name: identity.display_name.clone(),
            user_id: identity.id.clone(),
            source_id: source_id.to_string(),
            entitlements: None,
            entitlement_id: None,
        }
    }

    /// The entitlement to display.
    ///
    /// The one whose id equals `entitlement_id` when set, otherwise the first
    /// entitlement in provider order. A pointer that matches nothing selects
    /// nothing.
    #[must_use]
    pub fn selected_entitlement(&self) -> Option<&Entitlement> {
        let entitlements = self.entitlements.as_deref()?;
        match &self.entitlement_id {
            Some(id) => entitlements.iter().find(|e| &e.id == id),
            None => entitlements.first(),
        }
    }

    /// Whether an entitlement with `id` is present.
    #[must_use]
    pub fn has_entitlement(&self, id: &str) -> bool {
        self.entitlements.as_deref().is_some_and(|list| list.iter().any(|e| e.id == id))
    }
}
