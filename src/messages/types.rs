use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Display id of the in-progress assistant reply.
pub const TYPING_ID: &str = "typing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Ai,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "You"),
            Sender::Ai => write!(f, "Echo"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Fixed id of the greeting that seeds a new conversation
    pub const INIT: &'static str = "init";

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn init() -> Self {
        Self(Self::INIT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(id: MessageId, text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageId::generate(), text, Sender::User)
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(MessageId::generate(), text, Sender::Ai)
    }

    pub fn greeting(text: impl Into<String>) -> Self {
        Self::new(MessageId::init(), text, Sender::Ai)
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn is_ai(&self) -> bool {
        self.sender == Sender::Ai
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Message::user("hi");
        let b = Message::user("hi");
        assert_ne!(a.id, b.id);
        assert_ne!(a.id.as_str(), TYPING_ID);
    }

    #[test]
    fn test_greeting_uses_fixed_id() {
        let greeting = Message::greeting("Hello!");
        assert_eq!(greeting.id.as_str(), "init");
        assert!(greeting.is_ai());
    }
}
