//! System browser launcher

use mlauth_common::auth::{AuthError, BrowserLauncher};
use tracing::debug;

/// Opens URLs with the platform's default handler
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl SystemBrowser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<(), AuthError> {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(AuthError::Browser(format!("refusing to open non-HTTP URL: {url}")));
        }

        debug!("Opening authorize URL in system browser");
        open::that(url).map_err(|e| AuthError::Browser(format!("failed to open browser: {e}")))
    }
}
