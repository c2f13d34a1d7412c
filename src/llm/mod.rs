//! Hosted chat model integration
//!
//! The conversation core talks to the model through two small traits:
//!
//! - [`ChatClient`] opens a session configured with a system prompt
//! - [`ChatSession`] turns one user utterance into a lazy stream of text chunks
//!
//! [`gemini::GeminiClient`] is the hosted implementation. Tests substitute
//! scripted clients.

pub mod config;
pub mod context;
pub mod gemini;
pub mod prompts;
pub mod sse;

pub use config::ChatConfig;
pub use context::{ChatHistory, Role, Turn};
pub use gemini::{GeminiClient, GeminiSession};
pub use prompts::{GREETING, SYSTEM_PROMPT};

use crate::Result;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Incremental reply fragments, terminated by completion or by an error item
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

pub trait ChatClient: Send + Sync {
    /// Open a new stateful conversation
    fn create_session(&self, system_prompt: &str) -> Result<Arc<dyn ChatSession>>;
}

pub trait ChatSession: Send + Sync {
    /// Send a user message and stream the reply.
    ///
    /// Nothing is sent until the returned stream is polled. The stream is
    /// finite and cannot be restarted.
    fn send_streaming(&self, text: &str) -> ChunkStream;
}
