//! Shared helpers for commands and startup

pub mod logging;
