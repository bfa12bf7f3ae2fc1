//! External service integrations

pub mod licensing;
