//! Configuration for the tutor application
//!
//! Provides centralized configuration for all components.

use crate::llm::config::ChatConfig;
use crate::llm::prompts::{FALLBACK_REPLY, GREETING, SYSTEM_PROMPT};
use crate::speech::recognition::VoiceInputConfig;
use crate::speech::voices::VoiceGender;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Voice output settings
#[derive(Clone, Debug)]
pub struct VoiceOutputConfig {
    /// Speak replies when the app starts
    pub enabled: bool,

    /// Preferred voice gender
    pub gender: VoiceGender,

    /// TTS program override (`espeak-ng`, `espeak`, `say`)
    pub engine: Option<String>,

    /// Speaking rate in words per minute
    pub rate_wpm: u32,
}

impl Default for VoiceOutputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gender: VoiceGender::Female,
            engine: None,
            rate_wpm: 165,
        }
    }
}

/// Configuration for the complete application
#[derive(Clone, Debug)]
pub struct TutorConfig {
    /// Hosted model configuration
    pub chat: ChatConfig,

    /// Speech recognition configuration
    pub voice_input: VoiceInputConfig,

    /// Speech synthesis configuration
    pub voice_output: VoiceOutputConfig,

    /// Persona passed once at session creation
    pub system_prompt: String,

    /// First assistant message of a conversation
    pub greeting: String,

    /// Assistant message substituted for a failed exchange
    pub fallback_reply: String,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            chat: ChatConfig::default(),
            voice_input: VoiceInputConfig::default(),
            voice_output: VoiceOutputConfig::default(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            greeting: GREETING.to_string(),
            fallback_reply: FALLBACK_REPLY.to_string(),
        }
    }
}

impl TutorConfig {
    /// Defaults overridden from the process environment
    ///
    /// - `GEMINI_API_KEY` / `API_KEY`: model credential
    /// - `ECHO_MODEL`: hosted model id
    /// - `ECHO_WHISPER_MODEL`: Whisper model file for local recognition
    /// - `ECHO_TTS_ENGINE`: TTS program
    /// - `ECHO_VOICE_GENDER`: `female` or `male`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.chat = ChatConfig::from_env();

        if let Some(model) = env_var("ECHO_MODEL") {
            config.chat.model_id = model;
        }
        if let Some(path) = env_var("ECHO_WHISPER_MODEL") {
            config.voice_input.whisper_model = Some(PathBuf::from(path));
        }
        if let Some(engine) = env_var("ECHO_TTS_ENGINE") {
            config.voice_output.engine = Some(engine);
        }
        if let Some(gender) = env_var("ECHO_VOICE_GENDER") {
            match gender.parse() {
                Ok(gender) => config.voice_output.gender = gender,
                Err(e) => warn!("Ignoring ECHO_VOICE_GENDER: {}", e),
            }
        }

        config
    }

    pub fn with_chat(mut self, chat: ChatConfig) -> Self {
        self.chat = chat;
        self
    }

    pub fn with_voice_input(mut self, voice_input: VoiceInputConfig) -> Self {
        self.voice_input = voice_input;
        self
    }

    pub fn with_voice_output(mut self, voice_output: VoiceOutputConfig) -> Self {
        self.voice_output = voice_output;
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_silence_timeout(mut self, timeout: Duration) -> Self {
        self.voice_input.silence_timeout = timeout;
        self
    }

    /// Start with speech output off
    pub fn without_voice_output(mut self) -> Self {
        self.voice_output.enabled = false;
        self
    }

    /// Never submit voice transcripts automatically
    pub fn without_auto_send(mut self) -> Self {
        self.voice_input.auto_send = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.chat.validate()?;
        self.voice_input.validate()?;

        if self.system_prompt.trim().is_empty() {
            return Err("System prompt must not be empty".to_string());
        }
        if self.fallback_reply.trim().is_empty() {
            return Err("Fallback reply must not be empty".to_string());
        }
        if !(80..=450).contains(&self.voice_output.rate_wpm) {
            return Err(format!(
                "Speaking rate out of range: {} wpm",
                self.voice_output.rate_wpm
            ));
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
