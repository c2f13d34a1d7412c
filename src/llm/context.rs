//! Conversation history kept by a chat session
//!
//! The hosted API is stateless, so every request carries the full history.
//! A user turn is recorded when a request starts and the model turn only once
//! the reply has streamed completely.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct ChatHistory {
    turns: Vec<Turn>,
    max_turns: usize,
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ChatHistory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: max_turns.max(2),
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Role::User, text.into());
    }

    pub fn push_model(&mut self, text: impl Into<String>) {
        self.push(Role::Model, text.into());
    }

    /// Remove a trailing user turn whose reply never arrived
    pub fn rollback_user(&mut self) -> Option<Turn> {
        match self.turns.last() {
            Some(turn) if turn.role == Role::User => self.turns.pop(),
            _ => None,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn push(&mut self, role: Role, text: String) {
        self.turns.push(Turn { role, text });

        // drop whole exchanges from the front so history keeps starting with a user turn
        while self.turns.len() > self.max_turns {
            let drop = if self.turns.len() >= 2 && self.turns[1].role == Role::Model {
                2
            } else {
                1
            };
            self.turns.drain(..drop);
        }
    }
}
