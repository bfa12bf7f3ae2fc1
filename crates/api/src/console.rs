//! Terminal rendering of status, notices and the signed-in account
//!
//! Everything is written to stderr; stdout is reserved for command output.

#![allow(clippy::print_stderr)]

use mlauth_common::auth::{DisplayNotifier, StatusNotifier};
use mlauth_common::{Notice, NoticeLevel};
use mlauth_domain::{ConnectionStatus, Identity, LicensingInfo};
use parking_lot::Mutex;

/// Status and display notifier printing to the terminal
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    quiet: bool,
    last_status: Mutex<Option<ConnectionStatus>>,
}

impl ConsoleNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress status lines, keeping warnings and errors.
    #[must_use]
    pub fn quiet() -> Self {
        Self { quiet: true, ..Self::default() }
    }
}

impl StatusNotifier for ConsoleNotifier {
    fn status_changed(&self, status: ConnectionStatus) {
        let changed = self.last_status.lock().replace(status) != Some(status);
        if changed && !self.quiet {
            eprintln!("{}", status.label());
        }
    }

    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info if self.quiet => {}
            NoticeLevel::Info => eprintln!("{}", notice.message),
            NoticeLevel::Warning => eprintln!("warning: {}", notice.message),
            NoticeLevel::Error => eprintln!("error: {}", notice.message),
        }
    }
}

impl DisplayNotifier for ConsoleNotifier {
    fn auth_status_changed(&self, connected: bool, identity: Option<&Identity>) {
        if self.quiet {
            return;
        }
        if let (true, Some(identity)) = (connected, identity) {
            eprintln!("Signed in as {}", identity.label());
        }
    }

    fn licensing_changed(&self, licensing: Option<&LicensingInfo>) {
        if self.quiet {
            return;
        }
        if let Some(entitlement) = licensing.and_then(LicensingInfo::selected_entitlement) {
            eprintln!("Entitlement: {} ({})", entitlement.name, entitlement.id);
        }
    }
}
