//! Ordered conversation transcript
//!
//! Completed messages are stored in insertion order. The assistant reply that
//! is still streaming lives in a separate slot, so there can never be more than
//! one of them, and it is always displayed last.

use super::types::{Message, MessageId, Sender, TYPING_ID};
use uuid::Uuid;

/// An assistant reply whose chunks are still arriving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub request_id: Uuid,
    pub text: String,
}

impl PendingReply {
    pub fn display_id(&self) -> &'static str {
        TYPING_ID
    }
}

/// A transcript entry in display order
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    Complete(&'a Message),
    Pending(&'a PendingReply),
}

impl<'a> Entry<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            Entry::Complete(message) => message.id.as_str(),
            Entry::Pending(_) => TYPING_ID,
        }
    }

    pub fn text(&self) -> &'a str {
        match self {
            Entry::Complete(message) => &message.text,
            Entry::Pending(pending) => &pending.text,
        }
    }

    pub fn sender(&self) -> Sender {
        match self {
            Entry::Complete(message) => message.sender,
            Entry::Pending(_) => Sender::Ai,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Entry::Pending(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    pending: Option<PendingReply>,
    revision: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every mutation. Observers compare revisions to detect change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    /// Replace the whole transcript with a single message
    pub fn reset_with(&mut self, message: Message) {
        self.messages.clear();
        self.pending = None;
        self.messages.push(message);
        self.touch();
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending = None;
        self.touch();
    }

    /// Open the pending reply slot. An existing pending reply is replaced.
    pub fn begin_pending(&mut self) -> Uuid {
        let request_id = Uuid::new_v4();
        if let Some(previous) = self.pending.replace(PendingReply {
            request_id,
            text: String::new(),
        }) {
            tracing::debug!(
                "Pending reply {} superseded by {}",
                previous.request_id,
                request_id
            );
        }
        self.touch();
        request_id
    }

    pub fn pending(&self) -> Option<&PendingReply> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self, request_id: Uuid) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| pending.request_id == request_id)
    }

    /// Append a streamed chunk to the pending reply owned by `request_id`
    pub fn append_chunk(&mut self, request_id: Uuid, chunk: &str) -> bool {
        match self.pending.as_mut() {
            Some(pending) if pending.request_id == request_id => {
                pending.text.push_str(chunk);
                self.touch();
                true
            }
            _ => false,
        }
    }

    /// Turn the pending reply into a permanent AI message at the same position
    pub fn complete_pending(&mut self, request_id: Uuid) -> Option<Message> {
        if !self.is_pending(request_id) {
            return None;
        }
        let pending = self.pending.take()?;
        let message = Message::new(MessageId::generate(), pending.text, Sender::Ai);
        self.messages.push(message.clone());
        self.touch();
        Some(message)
    }

    pub fn discard_pending(&mut self, request_id: Uuid) -> bool {
        if !self.is_pending(request_id) {
            return false;
        }
        self.pending = None;
        self.touch();
        true
    }

    pub fn entries(&self) -> impl Iterator<Item = Entry<'_>> {
        self.messages
            .iter()
            .map(Entry::Complete)
            .chain(self.pending.iter().map(Entry::Pending))
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent assistant message that is no longer streaming
    pub fn last_complete_ai(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|message| message.is_ai())
    }

    /// Number of entries including the pending reply
    pub fn len(&self) -> usize {
        self.messages.len() + usize::from(self.pending.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
