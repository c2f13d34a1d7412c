//! Voice input adapter
//!
//! [`VoiceInput`] wraps a platform [`SpeechRecognizer`], keeps the live
//! transcript and ends an utterance after a quiet period so the conversation
//! can submit it without a button press.

use crate::{Result, TutorError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const UNSUPPORTED_MESSAGE: &str = "Speech recognition is not supported on this device.";

/// One recognized span of speech
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSegment {
    pub text: String,
    /// Final segments will not be revised again
    pub is_final: bool,
}

impl RecognitionSegment {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Notifications from the recognition backend.
///
/// Backends emit `Started` before any `Result`, and `Ended` last. An `Error`
/// may precede `Ended`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    /// New segments since the previous result
    Result(Vec<RecognitionSegment>),
    Error(String),
    Ended,
}

/// Platform speech recognition capability
pub trait SpeechRecognizer: Send {
    fn is_available(&self) -> bool;

    /// Begin continuous capture with interim results
    fn start(&mut self, language: &str) -> Result<()>;

    /// Stop capture. The backend flushes a final result and then reports `Ended`.
    fn stop(&mut self);

    fn events(&self) -> Receiver<RecognitionEvent>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceInputState {
    pub listening: bool,
    /// Finalized text followed by the current interim text
    pub transcript: String,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceInputEvent {
    /// Capture ended. `manual` is set when the user stopped it.
    UtteranceEnded { transcript: String, manual: bool },
}

#[derive(Clone, Debug)]
pub struct VoiceInputConfig {
    /// Recognition language tag
    pub language: String,

    /// Quiet period after the last result before capture stops on its own
    pub silence_timeout: Duration,

    /// Submit the transcript automatically when the utterance ends
    pub auto_send: bool,

    /// Whisper model file for local recognition
    pub whisper_model: Option<std::path::PathBuf>,

    /// How often interim transcriptions are produced while capturing
    pub partial_interval: Duration,
}

impl Default for VoiceInputConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            silence_timeout: Duration::from_millis(1200),
            auto_send: true,
            whisper_model: None,
            partial_interval: Duration::from_millis(800),
        }
    }
}

impl VoiceInputConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.language.trim().is_empty() {
            return Err("Recognition language must not be empty".to_string());
        }
        if self.silence_timeout.is_zero() {
            return Err("Silence timeout must be greater than 0".to_string());
        }
        if self.partial_interval.is_zero() {
            return Err("Partial transcription interval must be greater than 0".to_string());
        }
        Ok(())
    }
}

pub struct VoiceInput {
    recognizer: Box<dyn SpeechRecognizer>,
    events: Receiver<RecognitionEvent>,
    config: VoiceInputConfig,
    state: VoiceInputState,
    /// Between `Started` and `Ended`
    in_session: bool,
    final_transcript: String,
    manual_stop: bool,
    silence_deadline: Option<Instant>,
}

impl VoiceInput {
    pub fn new(recognizer: Box<dyn SpeechRecognizer>, config: VoiceInputConfig) -> Self {
        let events = recognizer.events();
        info!(
            "Voice input using {} (available: {})",
            recognizer.name(),
            recognizer.is_available()
        );

        Self {
            recognizer,
            events,
            config,
            state: VoiceInputState::default(),
            in_session: false,
            final_transcript: String::new(),
            manual_stop: false,
            silence_deadline: None,
        }
    }

    pub fn state(&self) -> &VoiceInputState {
        &self.state
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_available()
    }

    pub fn is_listening(&self) -> bool {
        self.state.listening
    }

    pub fn config(&self) -> &VoiceInputConfig {
        &self.config
    }

    /// Begin a new utterance. Does nothing while already listening.
    pub fn start_listening(&mut self) -> Result<()> {
        if self.state.listening {
            return Ok(());
        }

        self.state.transcript.clear();
        self.final_transcript.clear();
        self.state.last_error = None;
        self.manual_stop = false;
        self.silence_deadline = None;

        if !self.is_supported() {
            self.state.last_error = Some(UNSUPPORTED_MESSAGE.to_string());
            return Err(TutorError::VoiceInput(UNSUPPORTED_MESSAGE.to_string()));
        }

        if let Err(e) = self.recognizer.start(&self.config.language) {
            warn!("Failed to start recognition: {}", e);
            self.state.last_error = Some(e.to_string());
            return Err(e);
        }

        // reflected immediately so a double click cannot start twice
        self.state.listening = true;
        Ok(())
    }

    /// Stop at the user's request. The utterance will not be auto-sent.
    pub fn stop_listening(&mut self) {
        if !self.state.listening {
            return;
        }
        self.manual_stop = true;
        self.silence_deadline = None;
        self.recognizer.stop();
    }

    pub fn clear_transcript(&mut self) {
        self.state.transcript.clear();
        self.final_transcript.clear();
    }

    /// Apply backend events and the silence timer.
    pub fn poll(&mut self, now: Instant) -> Vec<VoiceInputEvent> {
        let mut out = Vec::new();

        while let Ok(event) = self.events.try_recv() {
            if let Some(ended) = self.handle_event(event, now) {
                out.push(ended);
            }
        }

        if let Some(deadline) = self.silence_deadline {
            if now >= deadline && self.state.listening {
                debug!("Silence timeout, stopping recognition");
                self.silence_deadline = None;
                self.recognizer.stop();
            }
        }

        out
    }

    /// Time until the silence timer fires, if armed
    pub fn time_until_deadline(&self, now: Instant) -> Option<Duration> {
        self.silence_deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    fn handle_event(&mut self, event: RecognitionEvent, now: Instant) -> Option<VoiceInputEvent> {
        match event {
            RecognitionEvent::Started => {
                debug!("Recognition started");
                self.in_session = true;
                self.state.listening = true;
                None
            }
            RecognitionEvent::Result(segments) => {
                if !self.in_session {
                    debug!("Dropping recognition result outside of a session");
                    return None;
                }
                let mut interim = String::new();
                for segment in segments {
                    if segment.is_final {
                        self.final_transcript.push_str(&segment.text);
                        self.final_transcript.push(' ');
                    } else {
                        interim.push_str(&segment.text);
                    }
                }
                self.state.transcript = format!("{}{}", self.final_transcript, interim);

                if self.config.auto_send && !self.manual_stop {
                    self.silence_deadline = Some(now + self.config.silence_timeout);
                }
                None
            }
            RecognitionEvent::Error(error) => {
                warn!("Speech recognition error: {}", error);
                self.state.last_error = Some(format!("Speech recognition error: {}", error));
                self.state.listening = false;
                None
            }
            RecognitionEvent::Ended => {
                let was_in_session = self.in_session;
                self.in_session = false;
                self.state.listening = false;
                self.silence_deadline = None;
                if !was_in_session && self.final_transcript.is_empty() {
                    return None;
                }

                let manual = std::mem::take(&mut self.manual_stop);
                let transcript = self.final_transcript.trim().to_string();
                debug!("Utterance ended (manual: {}): {:?}", manual, transcript);
                Some(VoiceInputEvent::UtteranceEnded { transcript, manual })
            }
        }
    }
}

impl Drop for VoiceInput {
    fn drop(&mut self) {
        if self.state.listening {
            self.recognizer.stop();
        }
    }
}

/// Backend for systems without speech recognition
pub struct UnavailableRecognizer {
    events: (Sender<RecognitionEvent>, Receiver<RecognitionEvent>),
}

impl UnavailableRecognizer {
    pub fn new() -> Self {
        Self { events: unbounded() }
    }
}

impl Default for UnavailableRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechRecognizer for UnavailableRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    fn start(&mut self, _language: &str) -> Result<()> {
        Err(TutorError::VoiceInput(UNSUPPORTED_MESSAGE.to_string()))
    }

    fn stop(&mut self) {}

    fn events(&self) -> Receiver<RecognitionEvent> {
        self.events.1.clone()
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
