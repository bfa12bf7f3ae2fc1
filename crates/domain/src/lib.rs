//! # mlauth Domain
//!
//! Domain types for the MATLAB sign-in helper.
//!
//! This crate contains:
//! - Session and licensing data (`Identity`, `AuthSession`, `LicensingInfo`,
//!   `Entitlement`)
//! - Connection status reported to the UI layer
//! - Configuration structures
//! - The application error type and `Result` alias
//! - Stable storage key names
//!
//! ## Architecture
//! - No dependencies on other mlauth crates
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
