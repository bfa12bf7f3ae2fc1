//! HTTP client for form-encoded service calls

pub mod client;

pub use client::{HttpClient, HttpClientBuilder, HttpResponse};

/// Errors surfaced by [`HttpClient`]
pub type HttpError = mlauth_domain::MlAuthError;
