//! Custom URI redirect listener
//!
//! The operating system hands `vscode://...` style URIs to the host
//! application, which forwards them here with [`CustomUriListener::deliver`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mlauth_common::auth::{AuthError, RedirectListener};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Channel-backed listener for custom URI callbacks
pub struct CustomUriListener {
    redirect_uri: String,
    sender: mpsc::UnboundedSender<String>,
    receiver: Mutex<mpsc::UnboundedReceiver<String>>,
    listening: AtomicBool,
}

impl CustomUriListener {
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            redirect_uri: redirect_uri.into(),
            sender,
            receiver: Mutex::new(receiver),
            listening: AtomicBool::new(false),
        }
    }

    /// Forward a URI received by the host's URI handler.
    ///
    /// URIs delivered while no login is waiting are still queued and are
    /// discarded by the next [`RedirectListener::listen`].
    pub fn deliver(&self, uri: impl Into<String>) {
        let uri = uri.into();
        if !self.listening.load(Ordering::SeqCst) {
            debug!("Callback URI delivered while not listening");
        }
        if self.sender.send(uri).is_err() {
            warn!("Custom URI channel closed, dropping callback");
        }
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RedirectListener for CustomUriListener {
    async fn listen(&self) -> Result<String, AuthError> {
        let mut receiver = self.receiver.lock().await;
        let mut stale = 0usize;
        while receiver.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!(discarded = stale, "Discarded stale callback URIs");
        }

        self.listening.store(true, Ordering::SeqCst);
        Ok(self.redirect_uri.clone())
    }

    fn redirect_uri(&self) -> String {
        self.redirect_uri.clone()
    }

    async fn wait_for_callback(&self, timeout: Duration) -> Result<String, AuthError> {
        let mut receiver = self.receiver.lock().await;
        let err = match tokio::time::timeout(timeout, receiver.recv()).await {
            Ok(Some(uri)) => return Ok(uri),
            Ok(None) => AuthError::Redirect("callback channel closed".to_string()),
            Err(_) => AuthError::CallbackTimeout,
        };
        self.listening.store(false, Ordering::SeqCst);
        Err(err)
    }

    async fn close(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }
}
