//! Externally visible connection state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of the realtime connection as seen by the application.
///
/// Exactly one value is current at a time. Only the session, the
/// reconnection supervisor, and the client facade write it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport and no pending attempt.
    #[default]
    Disconnected,
    /// First attempt of a supervisor run is opening a transport.
    Connecting,
    /// A transport is open and authenticated.
    Connected,
    /// A later attempt of a supervisor run is opening a transport.
    Reconnecting,
}

impl ConnectionState {
    /// Wire-style name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }

    /// Whether `connect()` should be a no-op in this state.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connected | Self::Connecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn active_states() {
        assert!(ConnectionState::Connected.is_active());
        assert!(ConnectionState::Connecting.is_active());
        assert!(!ConnectionState::Reconnecting.is_active());
        assert!(!ConnectionState::Disconnected.is_active());
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }

    #[test]
    fn serde_snake_case() {
        let json = serde_json::to_string(&ConnectionState::Reconnecting).unwrap();
        assert_eq!(json, "\"reconnecting\"");
        let back: ConnectionState = serde_json::from_str("\"connecting\"").unwrap();
        assert_eq!(back, ConnectionState::Connecting);
    }
}
