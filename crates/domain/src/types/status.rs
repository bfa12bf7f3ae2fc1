//! Connection status reported to the status indicator

use serde::{Deserialize, Serialize};

use crate::constants::{
    STATUS_LABEL_CONNECTED, STATUS_LABEL_CONNECTING, STATUS_LABEL_NOT_CONNECTED,
};
use crate::impl_domain_status_conversions;

/// Sign-in state machine: `Disconnected -> Connecting -> Connected`, with
/// any failure while connecting falling back to `Disconnected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl_domain_status_conversions!(ConnectionStatus {
    Disconnected => "disconnected",
    Connecting => "connecting",
    Connected => "connected",
});

impl ConnectionStatus {
    /// Status bar text for this state.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Disconnected => STATUS_LABEL_NOT_CONNECTED,
            Self::Connecting => STATUS_LABEL_CONNECTING,
            Self::Connected => STATUS_LABEL_CONNECTED,
        }
    }

    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_status_bar_text() {
        assert_eq!(ConnectionStatus::Connected.label(), "MATLAB: Connected");
        assert_eq!(ConnectionStatus::Disconnected.label(), "MATLAB: Not Connected");
        assert_eq!(ConnectionStatus::Connecting.label(), "MATLAB: Establishing Connection");
    }

    #[test]
    fn default_is_disconnected() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
        assert!(!ConnectionStatus::default().is_connected());
    }
}
