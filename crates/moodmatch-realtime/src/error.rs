//! Realtime transport errors.
//!
//! These never reach callers of the client facade: the supervisor logs them
//! and folds them into its retry decision.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors from opening or driving a realtime transport.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// The configured endpoint could not be turned into a request.
    #[error("invalid realtime endpoint: {0}")]
    InvalidEndpoint(String),

    /// The token contains bytes that are not allowed in an HTTP header.
    #[error("credential is not a valid header value")]
    InvalidCredential,

    /// Opening the transport took longer than the connect timeout.
    #[error("connect timed out after {timeout_ms}ms")]
    ConnectTimeout {
        /// How long we waited.
        timeout_ms: u64,
    },

    /// Handshake or I/O failure reported by the WebSocket layer.
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),
}

impl RealtimeError {
    /// Whether the server refused the upgrade with 401 or 403.
    pub fn is_auth_rejected(&self) -> bool {
        match self {
            Self::Transport(tungstenite::Error::Http(response)) => {
                let status = response.status().as_u16();
                status == 401 || status == 403
            }
            _ => false,
        }
    }
}
