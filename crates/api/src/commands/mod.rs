//! Command handlers invoked by the CLI

pub mod auth;

pub use auth::*;
