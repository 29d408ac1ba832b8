//! Terminal input parsing and per-run chat state.

use moodmatch_core::{DomainEvent, OutgoingCommand};

/// One line of user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Plain text: a chat message for the current room.
    Say(String),
    /// `/typing on|off`
    Typing(bool),
    /// `/leave`
    Leave,
    /// `/join <mood>`
    Join(String),
    /// `/retry`
    Retry,
    /// `/quit`
    Quit,
    /// Blank line.
    Empty,
    /// Unrecognized or malformed slash command.
    Invalid(String),
}

/// Parse one line of input.
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Say(line.to_owned());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    match (name, arg) {
        ("quit" | "exit", _) => Input::Quit,
        ("retry", _) => Input::Retry,
        ("leave", _) => Input::Leave,
        ("typing", "on") => Input::Typing(true),
        ("typing", "off") => Input::Typing(false),
        ("typing", _) => Input::Invalid("usage: /typing on|off".into()),
        ("join", "") => Input::Invalid("usage: /join <mood>".into()),
        ("join", mood) => Input::Join(mood.to_owned()),
        _ => Input::Invalid(format!("unknown command: /{name}")),
    }
}

/// What the user is doing right now: which room they're in, which mood
/// they queue for.
#[derive(Debug, Default)]
pub struct ChatSession {
    room: Option<String>,
    mood: Option<String>,
}

impl ChatSession {
    /// Start with an optional mood to queue for on connect.
    pub fn new(mood: Option<String>) -> Self {
        Self {
            room: None,
            mood: mood.filter(|m| !m.trim().is_empty()),
        }
    }

    /// Current room, if matched.
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    /// Track room membership from server events.
    pub fn observe(&mut self, event: &DomainEvent) {
        match event {
            DomainEvent::MatchFound { room_id, mood, .. } => {
                self.room = Some(room_id.clone());
                self.mood = Some(mood.clone());
            }
            DomainEvent::PartnerLeft { room_id } if self.room.as_deref() == Some(room_id) => {
                self.room = None;
            }
            _ => {}
        }
    }

    /// Command to send when a connection opens: rejoin the queue if we have
    /// a mood and are not in a room.
    pub fn on_connected(&self) -> Option<OutgoingCommand> {
        if self.room.is_some() {
            return None;
        }
        self.mood.as_ref().map(|mood| OutgoingCommand::JoinQueue {
            mood_label: mood.clone(),
        })
    }

    /// Translate a chat input into a command.
    pub fn command_for(&mut self, input: Input) -> Result<OutgoingCommand, String> {
        match input {
            Input::Say(text) => {
                let room_id = self.require_room()?;
                Ok(OutgoingCommand::SendMessage { room_id, text })
            }
            Input::Typing(is_typing) => {
                let room_id = self.require_room()?;
                Ok(OutgoingCommand::SetTyping { room_id, is_typing })
            }
            Input::Leave => Ok(match self.room.take() {
                Some(room_id) => OutgoingCommand::LeaveRoom { room_id },
                None => OutgoingCommand::LeaveQueue,
            }),
            Input::Join(mood) => {
                self.mood = Some(mood.clone());
                Ok(OutgoingCommand::JoinQueue { mood_label: mood })
            }
            Input::Invalid(message) => Err(message),
            Input::Retry | Input::Quit | Input::Empty => {
                Err("not a chat command".into())
            }
        }
    }

    fn require_room(&self) -> Result<String, String> {
        self.room
            .clone()
            .ok_or_else(|| "not in a room yet; /join <mood> first".to_owned())
    }
}
