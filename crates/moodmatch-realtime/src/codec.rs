//! Wire codec: JSON text frames to [`DomainEvent`]s and [`OutgoingCommand`]s to
//! JSON text frames.
//!
//! Every frame is an envelope `{"type": "...", "payload": ...}`. Payload field
//! names are camelCase. Decoding is total: anything malformed, unknown, or
//! missing a required field yields `None` and is logged at debug level; it
//! never fails the connection.

use moodmatch_core::{DomainEvent, OutgoingCommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

/// Server-to-client frame types.
pub mod inbound {
    /// Partner found; payload is required.
    pub const MATCH_FOUND: &str = "match_found";
    /// Chat message; payload is required.
    pub const MESSAGE: &str = "message";
    /// Typing indicator; payload is required.
    pub const TYPING: &str = "typing";
    /// Partner left the room; payload is required.
    pub const PARTNER_LEFT: &str = "partner_left";
    /// Queue exit confirmed; payload ignored.
    pub const QUEUE_LEFT: &str = "queue_left";
    /// Server error; payload is required.
    pub const ERROR: &str = "error";
    /// Heartbeat acknowledged; payload ignored.
    pub const HEARTBEAT_ACK: &str = "heartbeat_ack";
}

/// Client-to-server frame types.
pub mod outbound {
    /// Post a chat message.
    pub const SEND_MESSAGE: &str = "send_message";
    /// Typing indicator.
    pub const TYPING: &str = "typing";
    /// Liveness probe.
    pub const HEARTBEAT: &str = "heartbeat";
    /// Enter the match queue.
    pub const JOIN_QUEUE: &str = "join_queue";
    /// Leave the match queue.
    pub const LEAVE_QUEUE: &str = "leave_queue";
    /// Leave a room.
    pub const LEAVE_ROOM: &str = "leave_room";
}

/// The envelope every frame travels in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// Frame type discriminator.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific body. Absent and `null` are equivalent.
    #[serde(default)]
    pub payload: Option<Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound payloads
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchFoundPayload {
    room_id: String,
    mood: String,
    partner_id: String,
    #[serde(default)]
    partner_nickname: Option<String>,
    #[serde(default)]
    partner_avatar: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePayload {
    // The server still calls the room a "random" channel.
    random_id: String,
    sender_id: String,
    text: String,
    message_id: String,
    ts: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingPayload {
    room_id: String,
    is_typing: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartnerLeftPayload {
    room_id: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Decode
// ─────────────────────────────────────────────────────────────────────────────

/// Decode one text frame. Returns `None` for anything that is not a known,
/// well-formed server frame.
pub fn decode(raw: &str) -> Option<DomainEvent> {
    match serde_json::from_str::<WireEnvelope>(raw) {
        Ok(envelope) => decode_envelope(envelope),
        Err(e) => {
            debug!(error = %e, len = raw.len(), "dropping malformed frame");
            None
        }
    }
}

/// Map an already-parsed envelope to an event.
pub fn decode_envelope(envelope: WireEnvelope) -> Option<DomainEvent> {
    let WireEnvelope { kind, payload } = envelope;
    match kind.as_str() {
        inbound::MATCH_FOUND => {
            let p: MatchFoundPayload = parse_payload(&kind, payload)?;
            Some(DomainEvent::MatchFound {
                room_id: p.room_id,
                mood: p.mood,
                partner_id: p.partner_id,
                partner_name: p.partner_nickname,
                partner_avatar: p.partner_avatar,
            })
        }
        inbound::MESSAGE => {
            let p: MessagePayload = parse_payload(&kind, payload)?;
            Some(DomainEvent::MessageReceived {
                room_id: p.random_id,
                message_id: p.message_id,
                from_user_id: p.sender_id,
                text: p.text,
                sent_at_epoch_ms: p.ts,
            })
        }
        inbound::TYPING => {
            let p: TypingPayload = parse_payload(&kind, payload)?;
            Some(DomainEvent::Typing {
                room_id: p.room_id,
                is_typing: p.is_typing,
            })
        }
        inbound::PARTNER_LEFT => {
            let p: PartnerLeftPayload = parse_payload(&kind, payload)?;
            Some(DomainEvent::PartnerLeft { room_id: p.room_id })
        }
        inbound::QUEUE_LEFT => Some(DomainEvent::QueueLeft),
        inbound::ERROR => {
            let p: ErrorPayload = parse_payload(&kind, payload)?;
            Some(DomainEvent::Error {
                code: p.code,
                message: p.message,
            })
        }
        inbound::HEARTBEAT_ACK => Some(DomainEvent::HeartbeatAck),
        other => {
            debug!(kind = other, "dropping frame of unknown type");
            None
        }
    }
}

fn parse_payload<T: DeserializeOwned>(kind: &str, payload: Option<Value>) -> Option<T> {
    let Some(value) = payload else {
        debug!(kind, "dropping frame without payload");
        return None;
    };
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(kind, error = %e, "dropping frame with invalid payload");
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Encode
// ─────────────────────────────────────────────────────────────────────────────

/// Build the envelope for a command.
pub fn to_envelope(command: &OutgoingCommand) -> WireEnvelope {
    let (kind, payload) = match command {
        OutgoingCommand::SendMessage { room_id, text } => (
            outbound::SEND_MESSAGE,
            Some(json!({ "roomId": room_id, "text": text })),
        ),
        OutgoingCommand::SetTyping { room_id, is_typing } => (
            outbound::TYPING,
            Some(json!({ "roomId": room_id, "isTyping": is_typing })),
        ),
        OutgoingCommand::SendHeartbeat => (outbound::HEARTBEAT, None),
        OutgoingCommand::JoinQueue { mood_label } => {
            (outbound::JOIN_QUEUE, Some(json!({ "mood": mood_label })))
        }
        OutgoingCommand::LeaveQueue => (outbound::LEAVE_QUEUE, None),
        OutgoingCommand::LeaveRoom { room_id } => {
            (outbound::LEAVE_ROOM, Some(json!({ "roomId": room_id })))
        }
    };
    WireEnvelope {
        kind: kind.to_owned(),
        payload,
    }
}

/// Encode a command as a text frame. Payload-less commands carry
/// `"payload": null`.
pub fn encode(command: &OutgoingCommand) -> String {
    let WireEnvelope { kind, payload } = to_envelope(command);
    json!({ "type": kind, "payload": payload }).to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn encoded(command: &OutgoingCommand) -> Value {
        serde_json::from_str(&encode(command)).unwrap()
    }

    #[test]
    fn decode_match_found_without_optionals() {
        let event = decode(
            r#"{"type":"match_found","payload":{"roomId":"r1","mood":"chill","partnerId":"u2"}}"#,
        );
        assert_eq!(
            event,
            Some(DomainEvent::MatchFound {
                room_id: "r1".into(),
                mood: "chill".into(),
                partner_id: "u2".into(),
                partner_name: None,
                partner_avatar: None,
            })
        );
    }

    #[test]
    fn decode_match_found_with_partner_profile() {
        let event = decode(
            r#"{"type":"match_found","payload":{"roomId":"r1","mood":"chill","partnerId":"u2","partnerNickname":"Ana","partnerAvatar":"🦊"}}"#,
        )
        .unwrap();
        assert_matches!(
            event,
            DomainEvent::MatchFound { partner_name: Some(name), partner_avatar: Some(avatar), .. }
                if name == "Ana" && avatar == "🦊"
        );
    }

    #[test]
    fn decode_message_maps_field_names() {
        let event = decode(
            r#"{"type":"message","payload":{"randomId":"r1","senderId":"u2","text":"hi","messageId":"m1","ts":1700000000000}}"#,
        );
        assert_eq!(
            event,
            Some(DomainEvent::MessageReceived {
                room_id: "r1".into(),
                message_id: "m1".into(),
                from_user_id: "u2".into(),
                text: "hi".into(),
                sent_at_epoch_ms: 1_700_000_000_000,
            })
        );
    }

    #[test]
    fn decode_message_missing_field_is_none() {
        let event = decode(
            r#"{"type":"message","payload":{"randomId":"r1","senderId":"u2","text":"hi","ts":1}}"#,
        );
        assert_eq!(event, None);
    }

    #[test]
    fn decode_typing() {
        let event = decode(r#"{"type":"typing","payload":{"roomId":"r1","isTyping":true}}"#);
        assert_eq!(
            event,
            Some(DomainEvent::Typing {
                room_id: "r1".into(),
                is_typing: true,
            })
        );
    }

    #[test]
    fn decode_partner_left() {
        let event = decode(r#"{"type":"partner_left","payload":{"roomId":"r9"}}"#);
        assert_eq!(
            event,
            Some(DomainEvent::PartnerLeft {
                room_id: "r9".into()
            })
        );
    }

    #[test]
    fn decode_queue_left_ignores_payload() {
        assert_eq!(decode(r#"{"type":"queue_left"}"#), Some(DomainEvent::QueueLeft));
        assert_eq!(
            decode(r#"{"type":"queue_left","payload":{"anything":1}}"#),
            Some(DomainEvent::QueueLeft)
        );
    }

    #[test]
    fn decode_heartbeat_ack_with_null_payload() {
        assert_eq!(
            decode(r#"{"type":"heartbeat_ack","payload":null}"#),
            Some(DomainEvent::HeartbeatAck)
        );
    }

    #[test]
    fn decode_error_with_and_without_code() {
        assert_eq!(
            decode(r#"{"type":"error","payload":{"code":"RATE_LIMIT","message":"slow down"}}"#),
            Some(DomainEvent::Error {
                code: Some("RATE_LIMIT".into()),
                message: "slow down".into(),
            })
        );
        assert_eq!(
            decode(r#"{"type":"error","payload":{"message":"bad"}}"#),
            Some(DomainEvent::Error {
                code: None,
                message: "bad".into(),
            })
        );
    }

    #[test]
    fn decode_required_payload_missing_is_none() {
        assert_eq!(decode(r#"{"type":"match_found"}"#), None);
        assert_eq!(decode(r#"{"type":"typing","payload":null}"#), None);
        assert_eq!(decode(r#"{"type":"error","payload":"oops"}"#), None);
    }

    #[test]
    fn decode_unknown_type_is_none() {
        assert_eq!(decode(r#"{"type":"presence","payload":{}}"#), None);
    }

    #[test]
    fn decode_garbage_is_none() {
        assert_eq!(decode("not json"), None);
        assert_eq!(decode(""), None);
        assert_eq!(decode("[1,2,3]"), None);
        assert_eq!(decode(r#"{"payload":{}}"#), None);
        assert_eq!(decode(r#"{"type":42}"#), None);
    }

    #[test]
    fn decode_ignores_extra_fields() {
        let event = decode(
            r#"{"type":"partner_left","id":"x","payload":{"roomId":"r1","reason":"bye"}}"#,
        );
        assert_eq!(
            event,
            Some(DomainEvent::PartnerLeft {
                room_id: "r1".into()
            })
        );
    }

    #[test]
    fn encode_send_message() {
        let value = encoded(&OutgoingCommand::SendMessage {
            room_id: "r1".into(),
            text: "hello".into(),
        });
        assert_eq!(
            value,
            json!({"type": "send_message", "payload": {"roomId": "r1", "text": "hello"}})
        );
    }

    #[test]
    fn encode_typing() {
        let value = encoded(&OutgoingCommand::SetTyping {
            room_id: "r1".into(),
            is_typing: false,
        });
        assert_eq!(
            value,
            json!({"type": "typing", "payload": {"roomId": "r1", "isTyping": false}})
        );
    }

    #[test]
    fn encode_heartbeat_has_null_payload() {
        let value = encoded(&OutgoingCommand::SendHeartbeat);
        assert_eq!(value, json!({"type": "heartbeat", "payload": null}));
        assert!(value.as_object().unwrap().contains_key("payload"));
    }

    #[test]
    fn encode_join_queue_uses_mood_key() {
        let value = encoded(&OutgoingCommand::JoinQueue {
            mood_label: "happy".into(),
        });
        assert_eq!(value, json!({"type": "join_queue", "payload": {"mood": "happy"}}));
    }

    #[test]
    fn encode_leave_queue_and_room() {
        assert_eq!(
            encoded(&OutgoingCommand::LeaveQueue),
            json!({"type": "leave_queue", "payload": null})
        );
        assert_eq!(
            encoded(&OutgoingCommand::LeaveRoom {
                room_id: "r2".into()
            }),
            json!({"type": "leave_room", "payload": {"roomId": "r2"}})
        );
    }

    #[test]
    fn encode_escapes_text() {
        let command = OutgoingCommand::SendMessage {
            room_id: "r1".into(),
            text: "quote \" and\nnewline".into(),
        };
        let value = encoded(&command);
        assert_eq!(value["payload"]["text"], "quote \" and\nnewline");
    }

    #[test]
    fn encode_is_deterministic() {
        let command = OutgoingCommand::SetTyping {
            room_id: "r1".into(),
            is_typing: true,
        };
        assert_eq!(encode(&command), encode(&command));
    }

    #[test]
    fn envelope_type_matches_command() {
        assert_eq!(to_envelope(&OutgoingCommand::LeaveQueue).kind, "leave_queue");
        assert_eq!(to_envelope(&OutgoingCommand::SendHeartbeat).payload, None);
    }

    proptest! {
        #[test]
        fn decode_never_panics(raw in ".*") {
            let _ = decode(&raw);
        }

        #[test]
        fn decode_never_panics_on_envelopes(kind in "[a-z_]{0,16}", body in ".*") {
            let raw = format!(r#"{{"type":"{kind}","payload":{body}}}"#);
            let _ = decode(&raw);
        }

        #[test]
        fn encoded_messages_keep_text(room in "[a-zA-Z0-9]{1,12}", text in ".*") {
            let command = OutgoingCommand::SendMessage { room_id: room.clone(), text: text.clone() };
            let value: Value = serde_json::from_str(&encode(&command)).unwrap();
            prop_assert_eq!(value["payload"]["roomId"].as_str(), Some(room.as_str()));
            prop_assert_eq!(value["payload"]["text"].as_str(), Some(text.as_str()));
        }
    }
}
