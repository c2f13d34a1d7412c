//! Scripted backends shared by the integration tests

#![allow(dead_code)]

use echo_tutor::integration::{ConversationController, ControllerEvent, TutorConfig};
use echo_tutor::llm::{ChatClient, ChatSession, ChunkStream};
use echo_tutor::speech::{
    RecognitionEvent, SpeechRecognizer, SpeechSynthesizer, SynthesisEvent, Utterance, Voice,
    VoiceGender,
};
use echo_tutor::{Result, TutorError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::channel::mpsc::{unbounded as chunk_channel, UnboundedSender};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// How a scripted session answers one message
pub enum Reply {
    /// Emit these items and finish
    Items(Vec<Result<String>>),
    /// Emit whatever the test pushes, finish when the sender is dropped
    Gated(futures::channel::mpsc::UnboundedReceiver<Result<String>>),
}

impl Reply {
    pub fn chunks(chunks: &[&str]) -> Self {
        Reply::Items(chunks.iter().map(|c| Ok(c.to_string())).collect())
    }

    pub fn failing_after(chunks: &[&str], error: &str) -> Self {
        let mut items: Vec<Result<String>> = chunks.iter().map(|c| Ok(c.to_string())).collect();
        items.push(Err(TutorError::Send(error.to_string())));
        Reply::Items(items)
    }

    pub fn gated() -> (Self, UnboundedSender<Result<String>>) {
        let (tx, rx) = chunk_channel();
        (Reply::Gated(rx), tx)
    }
}

#[derive(Default)]
pub struct ScriptedClient {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    pub sent: Arc<Mutex<Vec<String>>>,
    pub system_prompts: Arc<Mutex<Vec<String>>>,
    fail_sessions: bool,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose sessions can never be opened
    pub fn unavailable() -> Self {
        Self {
            fail_sessions: true,
            ..Self::default()
        }
    }

    pub fn push_reply(&self, reply: Reply) {
        self.replies.lock().push_back(reply);
    }
}

impl ChatClient for ScriptedClient {
    fn create_session(&self, system_prompt: &str) -> Result<Arc<dyn ChatSession>> {
        self.system_prompts.lock().push(system_prompt.to_string());
        if self.fail_sessions {
            return Err(TutorError::Session("API key not set".to_string()));
        }
        Ok(Arc::new(ScriptedSession {
            replies: Arc::clone(&self.replies),
            sent: Arc::clone(&self.sent),
        }))
    }
}

struct ScriptedSession {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ChatSession for ScriptedSession {
    fn send_streaming(&self, text: &str) -> ChunkStream {
        self.sent.lock().push(text.to_string());
        match self.replies.lock().pop_front() {
            Some(Reply::Items(items)) => Box::pin(futures::stream::iter(items)),
            Some(Reply::Gated(rx)) => Box::pin(rx),
            None => Box::pin(futures::stream::iter(vec![Err(TutorError::Send(
                "no scripted reply".to_string(),
            ))])),
        }
    }
}

#[derive(Default)]
pub struct SynthCalls {
    pub spoken: Vec<Utterance>,
    pub stops: usize,
}

/// Records utterances; the test decides when they finish
pub struct RecordingSynth {
    calls: Arc<Mutex<SynthCalls>>,
    voices: Vec<Voice>,
    tx: Sender<SynthesisEvent>,
    rx: Receiver<SynthesisEvent>,
}

impl SpeechSynthesizer for RecordingSynth {
    fn load_voices(&mut self) {
        let _ = self.tx.send(SynthesisEvent::VoicesChanged(self.voices.clone()));
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        let _ = self.tx.send(SynthesisEvent::Started(utterance.id));
        self.calls.lock().spoken.push(utterance);
        Ok(())
    }

    fn stop(&mut self) {
        self.calls.lock().stops += 1;
    }

    fn events(&self) -> Receiver<SynthesisEvent> {
        self.rx.clone()
    }

    fn name(&self) -> &str {
        "recording"
    }
}

#[derive(Default)]
pub struct MicCalls {
    pub starts: usize,
    pub stops: usize,
}

pub struct ScriptedRecognizer {
    calls: Arc<Mutex<MicCalls>>,
    rx: Receiver<RecognitionEvent>,
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self, _language: &str) -> Result<()> {
        self.calls.lock().starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.calls.lock().stops += 1;
    }

    fn events(&self) -> Receiver<RecognitionEvent> {
        self.rx.clone()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn english_voices() -> Vec<Voice> {
    vec![
        Voice::new("en-us", "English (America)", "en-US")
            .with_gender(VoiceGender::Male)
            .as_default(),
        Voice::new("en-us+f3", "English (America) female", "en-US").with_gender(VoiceGender::Female),
        Voice::new("fr-fr", "French", "fr-FR"),
    ]
}

/// A controller wired to scripted backends, plus the handles to drive them
pub struct Harness {
    pub controller: ConversationController,
    pub client: Arc<ScriptedClient>,
    pub synth: Arc<Mutex<SynthCalls>>,
    pub synth_events: Sender<SynthesisEvent>,
    pub mic: Arc<Mutex<MicCalls>>,
    pub mic_events: Sender<RecognitionEvent>,
}

impl Harness {
    pub fn new(config: TutorConfig, client: ScriptedClient) -> Self {
        Self::with_voices(config, client, english_voices())
    }

    pub fn with_voices(config: TutorConfig, client: ScriptedClient, voices: Vec<Voice>) -> Self {
        let client = Arc::new(client);
        let synth = Arc::new(Mutex::new(SynthCalls::default()));
        let (synth_events, synth_rx) = unbounded();
        let mic = Arc::new(Mutex::new(MicCalls::default()));
        let (mic_events, mic_rx) = unbounded();

        let synthesizer = RecordingSynth {
            calls: Arc::clone(&synth),
            voices,
            tx: synth_events.clone(),
            rx: synth_rx,
        };
        let recognizer = ScriptedRecognizer {
            calls: Arc::clone(&mic),
            rx: mic_rx,
        };

        let controller = ConversationController::new(
            config,
            Arc::clone(&client) as Arc<dyn ChatClient>,
            Box::new(synthesizer),
            Box::new(recognizer),
            Handle::current(),
        );

        Self {
            controller,
            client,
            synth,
            synth_events,
            mic,
            mic_events,
        }
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.synth.lock().spoken.iter().map(|u| u.text.clone()).collect()
    }

    /// Report the most recent utterance as finished
    pub fn finish_speech(&self) {
        let id = self.synth.lock().spoken.last().map(|u| u.id);
        if let Some(id) = id {
            let _ = self.synth_events.send(SynthesisEvent::Finished(id));
        }
    }

    /// Poll until `done` holds or a second passes
    pub async fn poll_until(
        &mut self,
        done: impl Fn(&ConversationController) -> bool,
    ) -> Vec<ControllerEvent> {
        let deadline = Instant::now() + Duration::from_secs(1);
        let mut events = Vec::new();
        loop {
            events.extend(self.controller.poll(Instant::now()));
            if done(&self.controller) || Instant::now() >= deadline {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Poll until the in-flight reply has been applied
    pub async fn settle(&mut self) -> Vec<ControllerEvent> {
        self.poll_until(|c| !c.is_loading()).await
    }
}
