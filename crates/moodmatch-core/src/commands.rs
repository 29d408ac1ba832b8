//! Commands the application sends to the server.

use serde::{Deserialize, Serialize};

/// The closed set of client-to-server commands.
///
/// Constructed by the application, serialized by the realtime codec, never
/// mutated in between.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingCommand {
    /// Post a chat message to a room.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        /// Target room.
        room_id: String,
        /// Message body.
        text: String,
    },

    /// Report whether this user is typing.
    #[serde(rename_all = "camelCase")]
    SetTyping {
        /// Target room.
        room_id: String,
        /// Whether the user is typing.
        is_typing: bool,
    },

    /// Liveness probe; the server answers with `heartbeat_ack`.
    SendHeartbeat,

    /// Enter the match queue for a mood.
    #[serde(rename_all = "camelCase")]
    JoinQueue {
        /// Mood label to match on.
        mood_label: String,
    },

    /// Leave the match queue.
    LeaveQueue,

    /// Leave a chat room.
    #[serde(rename_all = "camelCase")]
    LeaveRoom {
        /// Room to leave.
        room_id: String,
    },
}

impl OutgoingCommand {
    /// Short name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => "send_message",
            Self::SetTyping { .. } => "set_typing",
            Self::SendHeartbeat => "send_heartbeat",
            Self::JoinQueue { .. } => "join_queue",
            Self::LeaveQueue => "leave_queue",
            Self::LeaveRoom { .. } => "leave_room",
        }
    }
}
