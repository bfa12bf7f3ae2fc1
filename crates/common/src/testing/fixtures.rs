//! Test fixture generators

use mlauth_domain::{Entitlement, Identity};

use crate::auth::Token;

/// The identity used across auth scenarios (`u1`, `a@b.com`, `A B`).
#[must_use]
pub fn sample_identity() -> Identity {
    Identity {
        id: "u1".to_string(),
        email: "a@b.com".to_string(),
        display_name: "A B".to_string(),
        ..Identity::default()
    }
}

/// A token with access token `tok1` for [`sample_identity`].
#[must_use]
pub fn sample_token() -> Token {
    Token {
        access_token: "tok1".to_string(),
        expiration_date: "2026-12-01T00:00:00.000Z".to_string(),
        identity: sample_identity(),
    }
}

/// An entitlement with only `id` and `name` set.
///
/// # Examples
///
/// ```ignore
/// use mlauth_common::testing::fixtures::entitlement;
///
/// let e = entitlement("E1", "MATLAB");
/// assert_eq!(e.id, "E1");
/// assert!(e.license_use.is_empty());
/// ```
#[must_use]
pub fn entitlement(id: &str, name: &str) -> Entitlement {
    Entitlement { id: id.to_string(), name: name.to_string(), ..Entitlement::default() }
}
