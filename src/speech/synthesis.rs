//! Voice output adapter
//!
//! [`VoiceOutput`] owns a platform [`SpeechSynthesizer`] and the state the
//! conversation reads: whether speech is enabled, which voice is selected,
//! whether an utterance is playing and which message was spoken last.

use super::voices::{has_voice_options, select_voice, Voice, VoiceGender};
use crate::messages::MessageId;
use crate::{Result, TutorError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

pub type UtteranceId = u64;

/// A request to speak one piece of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub voice: Voice,
}

/// Notifications from the synthesis backend
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisEvent {
    Started(UtteranceId),
    Finished(UtteranceId),
    Failed { id: UtteranceId, error: String },
    /// The voice catalog was (re)loaded
    VoicesChanged(Vec<Voice>),
}

/// Platform speech synthesis capability
pub trait SpeechSynthesizer: Send {
    /// Start loading the voice catalog. The result arrives as [`SynthesisEvent::VoicesChanged`].
    fn load_voices(&mut self);

    /// Start speaking. Progress is reported through [`SpeechSynthesizer::events`].
    fn speak(&mut self, utterance: Utterance) -> Result<()>;

    /// Stop the active utterance, if any
    fn stop(&mut self);

    fn events(&self) -> Receiver<SynthesisEvent>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceOutputState {
    pub enabled: bool,
    pub gender: VoiceGender,
    pub selected_voice: Option<Voice>,
    pub speaking: bool,
    pub last_spoken_message_id: Option<MessageId>,
    pub last_error: Option<String>,
}

impl Default for VoiceOutputState {
    fn default() -> Self {
        Self {
            enabled: true,
            gender: VoiceGender::default(),
            selected_voice: None,
            speaking: false,
            last_spoken_message_id: None,
            last_error: None,
        }
    }
}

pub struct VoiceOutput {
    synthesizer: Box<dyn SpeechSynthesizer>,
    events: Receiver<SynthesisEvent>,
    state: VoiceOutputState,
    catalog: Vec<Voice>,
    active_utterance: Option<UtteranceId>,
    next_utterance: UtteranceId,
}

impl VoiceOutput {
    pub fn new(mut synthesizer: Box<dyn SpeechSynthesizer>, enabled: bool, gender: VoiceGender) -> Self {
        let events = synthesizer.events();
        info!("Voice output using {}", synthesizer.name());
        synthesizer.load_voices();

        Self {
            synthesizer,
            events,
            state: VoiceOutputState {
                enabled,
                gender,
                ..Default::default()
            },
            catalog: Vec::new(),
            active_utterance: None,
            next_utterance: 1,
        }
    }

    pub fn state(&self) -> &VoiceOutputState {
        &self.state
    }

    pub fn catalog(&self) -> &[Voice] {
        &self.catalog
    }

    pub fn is_speaking(&self) -> bool {
        self.state.speaking
    }

    pub fn has_voice_options(&self) -> bool {
        has_voice_options(&self.catalog)
    }

    /// Speak `text` with `voice`. Returns false if refused or failed to start.
    pub fn speak(&mut self, text: &str, voice: &Voice) -> bool {
        if self.state.speaking || text.trim().is_empty() {
            return false;
        }

        self.synthesizer.stop();

        let id = self.next_utterance;
        self.next_utterance += 1;

        let utterance = Utterance {
            id,
            text: text.to_string(),
            voice: voice.clone(),
        };
        match self.synthesizer.speak(utterance) {
            Ok(()) => {
                debug!("Speaking utterance {} with {}", id, voice.name);
                self.active_utterance = Some(id);
                self.state.speaking = true;
                self.state.last_error = None;
                true
            }
            Err(e) => {
                warn!("Failed to start speech: {}", e);
                self.active_utterance = None;
                self.state.speaking = false;
                self.state.last_error = Some(e.to_string());
                false
            }
        }
    }

    /// Stop any utterance immediately
    pub fn cancel(&mut self) {
        self.synthesizer.stop();
        if self.active_utterance.take().is_some() {
            debug!("Speech cancelled");
        }
        self.state.speaking = false;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.cancel();
        }
        self.state.enabled = enabled;
    }

    pub fn toggle_enabled(&mut self) -> bool {
        self.set_enabled(!self.state.enabled);
        self.state.enabled
    }

    /// Change the preferred voice gender. Speech in progress is cut off and the
    /// last message becomes eligible to be spoken again with the new voice.
    pub fn set_gender(&mut self, gender: VoiceGender) {
        if self.state.speaking {
            self.cancel();
            self.state.last_spoken_message_id = None;
        }
        self.state.gender = gender;
        self.reselect_voice();
    }

    pub fn update_catalog(&mut self, voices: Vec<Voice>) {
        info!("Voice catalog updated: {} voices", voices.len());
        self.catalog = voices;
        self.reselect_voice();
    }

    pub fn mark_spoken(&mut self, id: MessageId) {
        self.state.last_spoken_message_id = Some(id);
    }

    /// App moved to the background
    pub fn suspend(&mut self) {
        self.cancel();
    }

    /// Apply pending backend events. Returns true if the state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            changed |= self.handle_event(event);
        }
        changed
    }

    fn handle_event(&mut self, event: SynthesisEvent) -> bool {
        match event {
            SynthesisEvent::VoicesChanged(voices) => {
                self.update_catalog(voices);
                true
            }
            SynthesisEvent::Started(id) => {
                if self.active_utterance == Some(id) {
                    debug!("Utterance {} started", id);
                }
                false
            }
            SynthesisEvent::Finished(id) => {
                if self.active_utterance != Some(id) {
                    return false;
                }
                self.active_utterance = None;
                self.state.speaking = false;
                true
            }
            SynthesisEvent::Failed { id, error } => {
                if self.active_utterance != Some(id) {
                    return false;
                }
                warn!("Speech synthesis failed: {}", error);
                self.active_utterance = None;
                self.state.speaking = false;
                self.state.last_error = Some(TutorError::VoiceOutput(error).to_string());
                true
            }
        }
    }

    fn reselect_voice(&mut self) {
        self.state.selected_voice = select_voice(&self.catalog, self.state.gender);
        match &self.state.selected_voice {
            Some(voice) => debug!("Selected voice {} ({})", voice.name, voice.language),
            None => debug!("No voice available"),
        }
    }
}

impl Drop for VoiceOutput {
    fn drop(&mut self) {
        self.synthesizer.stop();
    }
}

/// Backend for systems without speech synthesis
pub struct SilentSynthesizer {
    events: (Sender<SynthesisEvent>, Receiver<SynthesisEvent>),
}

impl SilentSynthesizer {
    pub fn new() -> Self {
        Self { events: unbounded() }
    }
}

impl Default for SilentSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for SilentSynthesizer {
    fn load_voices(&mut self) {
        let _ = self.events.0.send(SynthesisEvent::VoicesChanged(Vec::new()));
    }

    fn speak(&mut self, _utterance: Utterance) -> Result<()> {
        Err(TutorError::VoiceOutput("Speech synthesis is not available".to_string()))
    }

    fn stop(&mut self) {}

    fn events(&self) -> Receiver<SynthesisEvent> {
        self.events.1.clone()
    }

    fn name(&self) -> &str {
        "silent"
    }
}
