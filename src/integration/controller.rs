//! Conversation controller
//!
//! Owns the transcript and drives the request/response cycle. Replies stream
//! on the tokio runtime and reach the controller as [`StreamEvent`]s over a
//! channel; the UI thread applies them in [`ConversationController::poll`],
//! so all state is mutated from one thread.

use crate::integration::config::TutorConfig;
use crate::llm::{ChatClient, ChatSession};
use crate::messages::{Message, Transcript};
use crate::speech::recognition::{SpeechRecognizer, VoiceInput, VoiceInputEvent, VoiceInputState};
use crate::speech::synthesis::{SpeechSynthesizer, VoiceOutput, VoiceOutputState};
use crate::speech::voices::VoiceGender;
use crate::{Result, TutorError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const INIT_ERROR_MESSAGE: &str =
    "Failed to initialize chat session. Please check your API key and refresh.";
pub const NOT_INITIALIZED_MESSAGE: &str = "Chat is not initialized.";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";
const STREAM_DROPPED_MESSAGE: &str = "The reply stream ended unexpectedly.";

/// Progress of one streamed reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk { request_id: Uuid, text: String },
    Completed { request_id: Uuid },
    Failed { request_id: Uuid, error: String },
}

impl StreamEvent {
    pub fn request_id(&self) -> Uuid {
        match self {
            StreamEvent::Chunk { request_id, .. }
            | StreamEvent::Completed { request_id }
            | StreamEvent::Failed { request_id, .. } => *request_id,
        }
    }
}

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    StateChanged,
    /// A finished voice utterance was submitted
    AutoSent(String),
    Error(String),
}

#[derive(Debug, Default)]
pub struct ConversationState {
    pub transcript: Transcript,
    /// True exactly while a reply is in flight
    pub loading: bool,
    pub error: Option<String>,
}

pub struct ConversationController {
    config: TutorConfig,
    client: Arc<dyn ChatClient>,
    session: Option<Arc<dyn ChatSession>>,
    runtime: Handle,
    state: ConversationState,
    stream_tx: Sender<StreamEvent>,
    stream_rx: Receiver<StreamEvent>,
    voice_output: VoiceOutput,
    voice_input: VoiceInput,
}

impl ConversationController {
    pub fn new(
        config: TutorConfig,
        client: Arc<dyn ChatClient>,
        synthesizer: Box<dyn SpeechSynthesizer>,
        recognizer: Box<dyn SpeechRecognizer>,
        runtime: Handle,
    ) -> Self {
        let (stream_tx, stream_rx) = unbounded();
        let voice_output = VoiceOutput::new(
            synthesizer,
            config.voice_output.enabled,
            config.voice_output.gender,
        );
        let voice_input = VoiceInput::new(recognizer, config.voice_input.clone());

        Self {
            config,
            client,
            session: None,
            runtime,
            state: ConversationState::default(),
            stream_tx,
            stream_rx,
            voice_output,
            voice_input,
        }
    }

    /// Open a chat session and seed the transcript with the greeting
    pub fn initialize(&mut self) -> Result<()> {
        self.state.loading = true;
        self.state.error = None;
        let result = self.client.create_session(&self.config.system_prompt);
        self.state.loading = false;

        match result {
            Ok(session) => {
                self.session = Some(session);
                self.state
                    .transcript
                    .reset_with(Message::greeting(self.config.greeting.clone()));
                info!("Chat session ready");
                self.evaluate_voice_trigger();
                Ok(())
            }
            Err(e) => {
                error!("Failed to initialize chat session: {}", e);
                self.session = None;
                self.state.transcript.clear();
                self.state.error = Some(INIT_ERROR_MESSAGE.to_string());
                Err(TutorError::Init(e.to_string()))
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Submit a user message and start streaming the reply.
    ///
    /// Returns the request id of the pending reply. A send while another
    /// reply is still loading supersedes it.
    pub fn send_message(&mut self, text: &str) -> Result<Uuid> {
        let Some(session) = self.session.clone() else {
            self.state.error = Some(NOT_INITIALIZED_MESSAGE.to_string());
            return Err(TutorError::NotInitialized);
        };

        self.voice_output.cancel();
        self.state.loading = true;
        self.state.transcript.push(Message::user(text));
        let request_id = self.state.transcript.begin_pending();

        debug!("Sending message (request {})", request_id);
        self.spawn_stream(session, request_id, text.to_string());

        Ok(request_id)
    }

    fn spawn_stream(&self, session: Arc<dyn ChatSession>, request_id: Uuid, text: String) {
        let tx = self.stream_tx.clone();

        self.runtime.spawn(async move {
            let mut guard = StreamGuard::new(request_id, tx);
            let mut stream = session.send_streaming(&text);

            while let Some(item) = stream.next().await {
                match item {
                    Ok(chunk) => guard.send(StreamEvent::Chunk {
                        request_id,
                        text: chunk,
                    }),
                    Err(e) => {
                        guard.finish(StreamEvent::Failed {
                            request_id,
                            error: e.to_string(),
                        });
                        return;
                    }
                }
            }

            guard.finish(StreamEvent::Completed { request_id });
        });
    }

    /// Apply everything that happened since the last call.
    ///
    /// Call once per UI frame.
    pub fn poll(&mut self, now: Instant) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        let mut changed = false;

        while let Ok(event) = self.stream_rx.try_recv() {
            changed |= self.apply_stream_event(event, &mut events);
        }

        changed |= self.voice_output.poll();

        let input_before = self.voice_input.state().clone();
        for event in self.voice_input.poll(now) {
            match event {
                VoiceInputEvent::UtteranceEnded { transcript, manual } => {
                    if let Some(sent) = self.handle_utterance_end(transcript, manual) {
                        events.push(ControllerEvent::AutoSent(sent));
                    }
                }
            }
        }
        changed |= *self.voice_input.state() != input_before;

        changed |= self.evaluate_voice_trigger();

        if changed {
            events.push(ControllerEvent::StateChanged);
        }
        events
    }

    /// Apply one stream event. Events for superseded requests are dropped.
    pub fn apply_stream_event(&mut self, event: StreamEvent, events: &mut Vec<ControllerEvent>) -> bool {
        match event {
            StreamEvent::Chunk { request_id, text } => {
                let applied = self.state.transcript.append_chunk(request_id, &text);
                if !applied {
                    debug!("Discarding chunk for stale request {}", request_id);
                }
                applied
            }
            StreamEvent::Completed { request_id } => {
                match self.state.transcript.complete_pending(request_id) {
                    Some(message) => {
                        debug!("Reply {} complete as message {}", request_id, message.id);
                        self.state.loading = false;
                        true
                    }
                    None => {
                        debug!("Ignoring completion of stale request {}", request_id);
                        false
                    }
                }
            }
            StreamEvent::Failed { request_id, error } => {
                if !self.state.transcript.discard_pending(request_id) {
                    debug!("Ignoring failure of stale request {}: {}", request_id, error);
                    return false;
                }
                warn!("Reply failed: {}", error);
                let error = if error.trim().is_empty() {
                    UNKNOWN_ERROR_MESSAGE.to_string()
                } else {
                    error
                };
                self.state
                    .transcript
                    .push(Message::ai(self.config.fallback_reply.clone()));
                self.state.error = Some(error.clone());
                self.state.loading = false;
                events.push(ControllerEvent::Error(error));
                true
            }
        }
    }

    fn handle_utterance_end(&mut self, transcript: String, manual: bool) -> Option<String> {
        if manual || transcript.is_empty() || !self.config.voice_input.auto_send {
            return None;
        }
        if self.state.loading {
            debug!("Not auto-sending while a reply is loading");
            return None;
        }

        match self.send_message(&transcript) {
            Ok(_) => {
                info!("Auto-sent voice input");
                self.voice_input.clear_transcript();
                Some(transcript)
            }
            Err(e) => {
                warn!("Auto-send failed: {}", e);
                None
            }
        }
    }

    /// Speak the newest completed assistant message once.
    ///
    /// Returns true if speech was requested.
    fn evaluate_voice_trigger(&mut self) -> bool {
        let output = self.voice_output.state();
        if !output.enabled || output.speaking || self.state.loading {
            return false;
        }
        let Some(voice) = output.selected_voice.clone() else {
            return false;
        };
        let Some(message) = self.state.transcript.last_complete_ai() else {
            return false;
        };
        if output.last_spoken_message_id.as_ref() == Some(&message.id) {
            return false;
        }

        let id = message.id.clone();
        let text = message.text.clone();
        self.voice_output.speak(&text, &voice);
        self.voice_output.mark_spoken(id);
        true
    }

    pub fn toggle_voice_output(&mut self) -> bool {
        let enabled = !self.voice_output.state().enabled;
        self.set_voice_output_enabled(enabled);
        enabled
    }

    /// Turning voice output off cuts off speech immediately
    pub fn set_voice_output_enabled(&mut self, enabled: bool) {
        self.voice_output.set_enabled(enabled);
        self.evaluate_voice_trigger();
    }

    pub fn set_voice_gender(&mut self, gender: VoiceGender) {
        if self.voice_output.state().gender == gender {
            return;
        }
        self.voice_output.set_gender(gender);
        self.evaluate_voice_trigger();
    }

    pub fn start_listening(&mut self) -> Result<()> {
        self.voice_input.start_listening()
    }

    pub fn stop_listening(&mut self) {
        self.voice_input.stop_listening();
    }

    /// The user typed into the message field
    pub fn input_edited(&mut self) {
        if self.voice_input.is_listening() {
            debug!("Typing while listening, stopping voice input");
            self.voice_input.stop_listening();
        }
    }

    /// The app lost focus or was minimized
    pub fn on_background(&mut self) {
        if self.voice_output.is_speaking() {
            info!("Backgrounded, cancelling speech");
        }
        self.voice_output.suspend();
    }

    pub fn shutdown(&mut self) {
        info!("Shutting down conversation");
        self.voice_output.cancel();
        self.voice_input.stop_listening();
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.state.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn voice_output(&self) -> &VoiceOutputState {
        self.voice_output.state()
    }

    pub fn voice_input(&self) -> &VoiceInputState {
        self.voice_input.state()
    }

    pub fn has_voice_options(&self) -> bool {
        self.voice_output.has_voice_options()
    }

    pub fn voice_input_supported(&self) -> bool {
        self.voice_input.is_supported()
    }

    /// Whether something is in progress that needs regular polling
    pub fn is_busy(&self) -> bool {
        self.state.loading || self.voice_output.is_speaking() || self.voice_input.is_listening()
    }
}

impl Drop for ConversationController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Guarantees a terminal event for every streamed request, even if the task
/// is dropped or panics
struct StreamGuard {
    request_id: Uuid,
    tx: Sender<StreamEvent>,
    finished: bool,
}

impl StreamGuard {
    fn new(request_id: Uuid, tx: Sender<StreamEvent>) -> Self {
        Self {
            request_id,
            tx,
            finished: false,
        }
    }

    fn send(&self, event: StreamEvent) {
        if self.tx.send(event).is_err() {
            debug!("Controller gone, dropping stream event");
        }
    }

    fn finish(&mut self, event: StreamEvent) {
        self.finished = true;
        self.send(event);
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.tx.send(StreamEvent::Failed {
                request_id: self.request_id,
                error: STREAM_DROPPED_MESSAGE.to_string(),
            });
        }
    }
}
