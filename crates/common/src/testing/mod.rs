//! Testing utilities and helpers
//!
//! - **[`fixtures`]**: sample identities, tokens and entitlements
//! - **[`mocks`]**: in-memory implementations of every auth port
//! - **[`harness`]**: an orchestrator wired entirely with mocks
//!
//! ## Usage
//!
//! ```ignore
//! # async fn example() {
//! use mlauth_common::testing::TestHarness;
//!
//! let harness = TestHarness::new();
//! let orchestrator = harness.orchestrator();
//! orchestrator.login().await.unwrap();
//! assert_eq!(harness.browser.opened().len(), 1);
//! # }
//! ```

pub mod fixtures;
pub mod harness;
pub mod mocks;

// Re-export commonly used items
pub use fixtures::{entitlement, sample_identity, sample_token};
pub use harness::TestHarness;
pub use mocks::{
    MemorySettingsStore, MockBrowser, MockEntitlementResolver, MockKeychainProvider,
    MockOAuthClient, MockRedirectListener, RecordingNotifier,
};
