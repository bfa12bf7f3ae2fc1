//! # mlauth App
//!
//! Application layer: dependency wiring, commands and the `mlauth` CLI.
//!
//! This crate contains:
//! - Commands (CLI → auth orchestrator bridge)
//! - Application context (dependency injection)
//! - Console notifiers and tracing setup
//!
//! ## Architecture
//! - Depends on `domain`, `common` and `infra`
//! - Wires the infrastructure adapters into the auth orchestrator

pub mod commands;
pub mod console;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
