//! Redirect listeners
//!
//! Two transports deliver the provider's redirect back to the orchestrator:
//! - [`LoopbackListener`]: a one-shot axum server on `127.0.0.1`
//! - [`CustomUriListener`]: a channel fed by the host's URI handler

pub mod custom_uri;
pub mod loopback;

use std::sync::Arc;

use mlauth_common::auth::RedirectListener;
use mlauth_domain::{RedirectMode, RedirectSettings};

pub use custom_uri::CustomUriListener;
pub use loopback::LoopbackListener;

/// The configured redirect transport
#[derive(Clone)]
pub enum RedirectTransport {
    Loopback(Arc<LoopbackListener>),
    CustomUri(Arc<CustomUriListener>),
}

impl RedirectTransport {
    /// The transport as the orchestrator's listener port.
    #[must_use]
    pub fn listener(&self) -> Arc<dyn RedirectListener> {
        match self {
            Self::Loopback(listener) => listener.clone(),
            Self::CustomUri(listener) => listener.clone(),
        }
    }

    /// The custom URI listener, for hosts that forward URIs themselves.
    #[must_use]
    pub fn custom_uri(&self) -> Option<Arc<CustomUriListener>> {
        match self {
            Self::CustomUri(listener) => Some(listener.clone()),
            Self::Loopback(_) => None,
        }
    }

    #[must_use]
    pub fn mode(&self) -> RedirectMode {
        match self {
            Self::Loopback(_) => RedirectMode::Loopback,
            Self::CustomUri(_) => RedirectMode::CustomUri,
        }
    }
}

/// Build the listener selected by `settings.mode`.
#[must_use]
pub fn build_listener(settings: &RedirectSettings) -> RedirectTransport {
    match settings.mode {
        RedirectMode::Loopback => RedirectTransport::Loopback(Arc::new(LoopbackListener::new(
            settings.loopback_port,
            settings.callback_path.clone(),
            settings.return_uri.clone(),
        ))),
        RedirectMode::CustomUri => {
            RedirectTransport::CustomUri(Arc::new(CustomUriListener::new(settings.custom_uri.clone())))
        }
    }
}
