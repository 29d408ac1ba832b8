//! Terminal output.

use moodmatch_core::{ConnectionState, DomainEvent};
use serde_json::json;

/// Writes events and state changes to stdout, as text or JSON lines.
#[derive(Clone, Copy, Debug)]
pub struct Printer {
    json: bool,
}

impl Printer {
    /// `json` selects JSON lines.
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print one event. Heartbeat acks are only shown in JSON mode.
    pub fn event(self, event: &DomainEvent) {
        if self.json {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{line}");
            }
        } else if let Some(line) = describe_event(event) {
            println!("{line}");
        }
    }

    /// Print a connection state change.
    pub fn state(self, state: ConnectionState) {
        if self.json {
            println!("{}", json!({"type": "state", "state": state}));
        } else {
            println!("* {state}");
        }
    }

    /// Print a local notice (not an event).
    pub fn note(self, message: &str) {
        if self.json {
            println!("{}", json!({"type": "note", "message": message}));
        } else {
            println!("! {message}");
        }
    }
}

/// Human-readable line for an event; `None` for events not worth showing.
pub fn describe_event(event: &DomainEvent) -> Option<String> {
    let line = match event {
        DomainEvent::ConnectionOpened => "* connection opened".to_owned(),
        DomainEvent::ConnectionClosed => "* connection closed".to_owned(),
        DomainEvent::HeartbeatAck => return None,
        DomainEvent::MatchFound {
            room_id,
            mood,
            partner_id,
            partner_name,
            partner_avatar,
        } => {
            let who = partner_name.as_deref().unwrap_or(partner_id);
            let avatar = partner_avatar
                .as_deref()
                .map(|a| format!("{a} "))
                .unwrap_or_default();
            format!("* matched with {avatar}{who} feeling {mood} (room {room_id})")
        }
        DomainEvent::MessageReceived {
            from_user_id, text, ..
        } => format!("<{from_user_id}> {text}"),
        DomainEvent::Typing { is_typing, .. } => {
            if *is_typing {
                "* partner is typing...".to_owned()
            } else {
                "* partner stopped typing".to_owned()
            }
        }
        DomainEvent::PartnerLeft { .. } => "* partner left the room".to_owned(),
        DomainEvent::QueueLeft => "* left the queue".to_owned(),
        DomainEvent::Error { code, message } => match code {
            Some(code) => format!("! {message} [{code}]"),
            None => format!("! {message}"),
        },
    };
    Some(line)
}
