//! Auth core shared across mlauth crates.
//!
//! # Feature Tiers
//!
//! - default: PKCE, callback validation, token exchange, session store and
//!   the auth orchestrator, all driven through the ports in [`auth::traits`]
//! - `platform`: OS keychain secret storage via `keyring`
//! - `test-utils`: in-memory ports and recording notifiers in [`testing`]

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
#[cfg(feature = "platform")]
pub mod security;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use auth::{AuthError, AuthOrchestrator, Notice, NoticeLevel, SessionStore};
#[cfg(feature = "platform")]
pub use security::{KeychainError, KeychainProvider};
