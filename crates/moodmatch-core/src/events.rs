//! Events delivered to the application.
//!
//! [`DomainEvent`] is the closed set of everything the client can observe:
//! server pushes decoded from the wire, plus the connection lifecycle
//! markers (`ConnectionOpened`, `ConnectionClosed`) and locally generated
//! errors. Events are plain values with no identity beyond their fields.

use serde::{Deserialize, Serialize};

/// Error codes the client itself attaches to [`DomainEvent::Error`].
///
/// Server-originated errors carry whatever code the server sent.
pub mod error_codes {
    /// No heartbeat acknowledgement arrived within the liveness timeout.
    pub const HEARTBEAT_TIMEOUT: &str = "HEARTBEAT_TIMEOUT";
    /// The reconnection budget for the current run is spent.
    pub const RECONNECT_EXHAUSTED: &str = "RECONNECT_EXHAUSTED";
    /// The credential provider had no usable token.
    pub const NO_TOKEN: &str = "NO_TOKEN";
}

/// Everything the realtime client can report to its subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A transport was opened and authenticated.
    ConnectionOpened,

    /// The transport closed, for whatever reason.
    ConnectionClosed,

    /// The server acknowledged a heartbeat.
    HeartbeatAck,

    /// The server paired this user with a partner.
    #[serde(rename_all = "camelCase")]
    MatchFound {
        /// Chat room both users were placed in.
        room_id: String,
        /// Mood the match was made on.
        mood: String,
        /// Partner's user ID.
        partner_id: String,
        /// Partner's nickname, if shared.
        partner_name: Option<String>,
        /// Partner's avatar, if shared.
        partner_avatar: Option<String>,
    },

    /// A chat message arrived.
    #[serde(rename_all = "camelCase")]
    MessageReceived {
        /// Room the message belongs to.
        room_id: String,
        /// Server-assigned message ID.
        message_id: String,
        /// Sender's user ID.
        from_user_id: String,
        /// Message body.
        text: String,
        /// Server timestamp in epoch milliseconds.
        sent_at_epoch_ms: i64,
    },

    /// The partner started or stopped typing.
    #[serde(rename_all = "camelCase")]
    Typing {
        /// Room the indicator applies to.
        room_id: String,
        /// Whether the partner is typing.
        is_typing: bool,
    },

    /// The partner left the room.
    #[serde(rename_all = "camelCase")]
    PartnerLeft {
        /// Room the partner left.
        room_id: String,
    },

    /// The server confirmed this user left the match queue.
    QueueLeft,

    /// A server-reported or client-generated error.
    Error {
        /// Machine-readable code, if any. See [`error_codes`].
        code: Option<String>,
        /// Human-readable message.
        message: String,
    },
}

impl DomainEvent {
    /// Build an error event with a client-side code.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: Some(code.to_owned()),
            message: message.into(),
        }
    }

    /// Short name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionOpened => "connection_opened",
            Self::ConnectionClosed => "connection_closed",
            Self::HeartbeatAck => "heartbeat_ack",
            Self::MatchFound { .. } => "match_found",
            Self::MessageReceived { .. } => "message_received",
            Self::Typing { .. } => "typing",
            Self::PartnerLeft { .. } => "partner_left",
            Self::QueueLeft => "queue_left",
            Self::Error { .. } => "error",
        }
    }

    /// The error code, if this is an [`DomainEvent::Error`] with one.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Error { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Room the event refers to, if any.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::MatchFound { room_id, .. }
            | Self::MessageReceived { room_id, .. }
            | Self::Typing { room_id, .. }
            | Self::PartnerLeft { room_id } => Some(room_id),
            _ => None,
        }
    }
}
