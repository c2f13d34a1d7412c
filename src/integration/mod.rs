//! Wiring between the chat model, speech adapters and the transcript

pub mod config;
pub mod controller;

pub use config::{TutorConfig, VoiceOutputConfig};
pub use controller::{
    ControllerEvent, ConversationController, ConversationState, StreamEvent, INIT_ERROR_MESSAGE,
    NOT_INITIALIZED_MESSAGE,
};
