//! MathWorks licensing service integration
//!
//! Resolves the entitlements linked to an access token for one MATLAB
//! release. The service answers form-encoded POSTs with an XML document.

pub mod client;
pub mod parser;

pub use client::LicensingClient;
pub use parser::parse_entitlements;
