//! Platform secret storage
//!
//! Wraps the OS credential store (macOS Keychain, Windows Credential Manager,
//! Linux Secret Service) behind [`KeychainProvider`].

pub mod keychain;

pub use keychain::{KeychainError, KeychainProvider};
