#[cfg(feature = "audio-io")]
pub mod audio;
pub mod integration;
pub mod llm;
pub mod messages;
pub mod speech;
pub mod ui;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TutorError {
    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Chat is not initialized.")]
    NotInitialized,

    #[error("Session error: {0}")]
    Session(String),

    #[error("Send error: {0}")]
    Send(String),

    #[error("Voice input error: {0}")]
    VoiceInput(String),

    #[error("Voice output error: {0}")]
    VoiceOutput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TutorError {
    fn from(e: reqwest::Error) -> Self {
        TutorError::Send(e.to_string())
    }
}

impl TutorError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Chat stays down until the app is restarted
            TutorError::Init(_) => false,
            TutorError::NotInitialized => false,
            TutorError::Session(_) => false,
            // A single exchange failed, the conversation continues
            TutorError::Send(_) => true,
            // Voice features degrade to text-only
            TutorError::VoiceInput(_) => true,
            TutorError::VoiceOutput(_) => true,
            TutorError::Config(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            TutorError::Init(_) | TutorError::Session(_) => {
                "Failed to initialize chat session. Please check your API key and refresh.".to_string()
            }
            TutorError::NotInitialized => "Chat is not initialized.".to_string(),
            TutorError::Send(_) => "Sorry, I encountered an error. Please try again.".to_string(),
            TutorError::VoiceInput(_) => {
                "Speech recognition failed. You can keep typing your messages.".to_string()
            }
            TutorError::VoiceOutput(_) => {
                "Text-to-speech failed. Replies will be shown as text.".to_string()
            }
            TutorError::Config(_) => "Configuration error. Please check settings.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(TutorError::Send("timeout".into()).is_recoverable());
        assert!(TutorError::VoiceOutput("espeak exited".into()).is_recoverable());
        assert!(!TutorError::Init("missing key".into()).is_recoverable());
        assert!(!TutorError::NotInitialized.is_recoverable());
    }

    #[test]
    fn test_every_error_has_a_message() {
        let errors = [
            TutorError::Init("x".into()),
            TutorError::NotInitialized,
            TutorError::Session("x".into()),
            TutorError::Send("x".into()),
            TutorError::VoiceInput("x".into()),
            TutorError::VoiceOutput("x".into()),
            TutorError::Config("x".into()),
        ];
        for error in errors {
            assert!(!error.to_string().is_empty());
            assert!(!error.user_message().is_empty());
        }
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            TutorError::NotInitialized.user_message(),
            "Chat is not initialized."
        );
        assert_eq!(
            TutorError::Session("no key".into()).user_message(),
            "Failed to initialize chat session. Please check your API key and refresh."
        );
    }
}
