//! # mlauth Infrastructure
//!
//! Adapters implementing the auth ports defined in `mlauth-common`.
//!
//! This crate contains:
//! - Configuration loading (defaults, TOML/JSON file, environment)
//! - The licensing service client and its XML parser
//! - Redirect listeners (loopback HTTP server, custom URI channel)
//! - The JSON file settings store
//! - The system browser launcher
//!
//! ## Architecture
//! - Implements traits from `mlauth_common::auth::traits`
//! - Contains all "impure" code (network, filesystem, OS integration)

pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod platform;
pub mod redirect;
pub mod storage;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder, HttpError, HttpResponse};
pub use integrations::licensing::LicensingClient;
pub use platform::SystemBrowser;
pub use redirect::{build_listener, CustomUriListener, LoopbackListener, RedirectTransport};
pub use storage::FileSettingsStore;
