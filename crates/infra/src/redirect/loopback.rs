//! Loopback HTTP redirect listener
//!
//! Binds `127.0.0.1:<port>` and forwards the full URI of every
//! `GET <callback_path>` to the waiting caller. The server keeps running
//! until [`RedirectListener::close`], a new `listen` or a wait that times
//! out, so a stray request cannot end the login attempt.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{OriginalUri, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use mlauth_common::auth::{AuthError, RedirectListener};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Callbacks queued beyond this are dropped until the caller catches up.
const CALLBACK_QUEUE: usize = 8;

/// Loopback server for OAuth redirects
pub struct LoopbackListener {
    port: u16,
    callback_path: String,
    return_uri: Option<String>,
    server: Mutex<Option<RunningServer>>,
    receiver: tokio::sync::Mutex<Option<mpsc::Receiver<String>>>,
}

struct RunningServer {
    port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl RunningServer {
    fn stop(mut self) -> JoinHandle<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle
    }
}

#[derive(Clone)]
struct CallbackState {
    port: u16,
    return_uri: Option<String>,
    sender: mpsc::Sender<String>,
}

impl LoopbackListener {
    /// `port` 0 binds an ephemeral port, reflected by `redirect_uri` once
    /// listening.
    pub fn new(port: u16, callback_path: impl Into<String>, return_uri: Option<String>) -> Self {
        let mut callback_path = callback_path.into();
        if !callback_path.starts_with('/') {
            callback_path.insert(0, '/');
        }

        Self {
            port,
            callback_path,
            return_uri,
            server: Mutex::new(None),
            receiver: tokio::sync::Mutex::new(None),
        }
    }

    /// Port of the running server, if any.
    #[must_use]
    pub fn bound_port(&self) -> Option<u16> {
        self.server.lock().as_ref().map(|s| s.port)
    }

    fn uri_for(&self, port: u16) -> String {
        format!("http://127.0.0.1:{port}{}", self.callback_path)
    }

    async fn stop_server(&self) {
        let running = self.server.lock().take();
        if let Some(running) = running {
            let handle = running.stop();
            if let Err(err) = handle.await {
                if err.is_panic() {
                    error!("Loopback callback server panicked: {err}");
                }
            }
            debug!("Loopback callback server stopped");
        }
    }
}

#[async_trait]
impl RedirectListener for LoopbackListener {
    async fn listen(&self) -> Result<String, AuthError> {
        self.stop_server().await;

        let listener = TcpListener::bind(("127.0.0.1", self.port)).await.map_err(|err| {
            AuthError::Redirect(format!("failed to bind 127.0.0.1:{}: {err}", self.port))
        })?;
        let port = listener
            .local_addr()
            .map_err(|err| AuthError::Redirect(format!("failed to determine port: {err}")))?
            .port();

        let (sender, receiver) = mpsc::channel(CALLBACK_QUEUE);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = CallbackState { port, return_uri: self.return_uri.clone(), sender };
        let app = Router::new()
            .route(&self.callback_path, get(handle_callback))
            .with_state(state);

        let handle = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            if let Err(err) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
                error!("Loopback callback server error: {err}");
            }
        });

        *self.receiver.lock().await = Some(receiver);
        *self.server.lock() =
            Some(RunningServer { port, shutdown_tx: Some(shutdown_tx), handle });

        let redirect_uri = self.uri_for(port);
        info!(port, "Loopback callback server listening");
        Ok(redirect_uri)
    }

    fn redirect_uri(&self) -> String {
        self.uri_for(self.bound_port().unwrap_or(self.port))
    }

    /// The next forwarded callback; the server stays up after a delivery.
    async fn wait_for_callback(&self, timeout: Duration) -> Result<String, AuthError> {
        let mut guard = self.receiver.lock().await;
        let receiver = guard
            .as_mut()
            .ok_or_else(|| AuthError::Redirect("loopback listener is not running".to_string()))?;

        let err = match tokio::time::timeout(timeout, receiver.recv()).await {
            Ok(Some(uri)) => return Ok(uri),
            Ok(None) => AuthError::Redirect("loopback listener closed".to_string()),
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "Timed out waiting for OAuth callback");
                AuthError::CallbackTimeout
            }
        };
        guard.take();
        drop(guard);

        self.stop_server().await;
        Err(err)
    }

    async fn close(&self) {
        self.receiver.lock().await.take();
        self.stop_server().await;
    }
}

impl Drop for LoopbackListener {
    fn drop(&mut self) {
        if let Some(running) = self.server.get_mut().take() {
            let handle = running.stop();
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

async fn handle_callback(
    State(state): State<CallbackState>,
    OriginalUri(uri): OriginalUri,
) -> Html<String> {
    let full_uri = format!("http://127.0.0.1:{}{uri}", state.port);

    if state.sender.try_send(full_uri).is_err() {
        warn!("Callback queue full, dropping loopback callback");
    }

    Html(confirmation_page(state.return_uri.as_deref()))
}

fn confirmation_page(return_uri: Option<&str>) -> String {
    let redirect = return_uri
        .map(|target| {
            let escaped = html_escape(target);
            format!(
                r#"<meta http-equiv="refresh" content="0;url={escaped}">
    <script>window.location.href = "{escaped}";</script>"#
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>MATLAB sign-in</title>
    {redirect}
</head>
<body>
    <h1>Sign-in received</h1>
    <p>You can close this window and return to your editor.</p>
</body>
</html>"#
    )
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener(return_uri: Option<&str>) -> LoopbackListener {
        LoopbackListener::new(0, "/callback", return_uri.map(str::to_string))
    }

    #[tokio::test]
    async fn forwards_callback_uri_and_keeps_serving() {
        let listener = listener(Some("vscode://spruhath.matlab"));
        let redirect_uri = listener.listen().await.expect("listen");
        assert!(redirect_uri.starts_with("http://127.0.0.1:"));
        assert!(redirect_uri.ends_with("/callback"));
        assert_eq!(listener.redirect_uri(), redirect_uri);

        let url = format!("{redirect_uri}?code=XYZ&state=ab12cd34");
        let page = tokio::spawn(async move {
            reqwest::get(url).await.expect("callback request").text().await.expect("body")
        });

        let uri = listener.wait_for_callback(Duration::from_secs(5)).await.expect("callback");
        assert_eq!(uri, format!("{redirect_uri}?code=XYZ&state=ab12cd34"));

        let body = page.await.expect("join");
        assert!(body.contains(r#"content="0;url=vscode://spruhath.matlab""#));
        assert!(listener.bound_port().is_some());

        listener.close().await;
        assert!(listener.bound_port().is_none());
    }

    #[tokio::test]
    async fn stray_request_does_not_stop_server() {
        let listener = listener(None);
        let redirect_uri = listener.listen().await.expect("listen");

        let stray = reqwest::get(format!("{redirect_uri}?code=EVIL&state=WRONG")).await;
        assert!(stray.expect("stray request served").status().is_success());
        let genuine = reqwest::get(format!("{redirect_uri}?code=XYZ&state=ab12cd34")).await;
        assert!(genuine.expect("genuine request served").status().is_success());

        let first = listener.wait_for_callback(Duration::from_secs(5)).await.expect("first");
        let second = listener.wait_for_callback(Duration::from_secs(5)).await.expect("second");
        assert!(first.ends_with("state=WRONG"));
        assert!(second.ends_with("state=ab12cd34"));
        listener.close().await;
    }

    #[tokio::test]
    async fn times_out_and_closes_server() {
        let listener = listener(None);
        listener.listen().await.expect("listen");
        assert!(listener.bound_port().is_some());

        let result = listener.wait_for_callback(Duration::from_millis(50)).await;

        assert_eq!(result, Err(AuthError::CallbackTimeout));
        assert!(listener.bound_port().is_none());
    }

    #[tokio::test]
    async fn listen_restarts_server() {
        let listener = listener(None);
        listener.listen().await.expect("first listen");
        listener.listen().await.expect("second listen");
        assert!(listener.bound_port().is_some());

        listener.close().await;
        assert!(listener.bound_port().is_none());
    }

    #[tokio::test]
    async fn wait_without_listen_is_redirect_error() {
        let result = listener(None).wait_for_callback(Duration::from_millis(10)).await;
        assert!(matches!(result, Err(AuthError::Redirect(_))));
    }

    #[test]
    fn confirmation_page_escapes_return_uri() {
        let page = confirmation_page(Some("app://x?a=1&b=\"2\""));
        assert!(page.contains("app://x?a=1&amp;b=&quot;2&quot;"));
        assert!(!confirmation_page(None).contains("http-equiv"));
    }
}
