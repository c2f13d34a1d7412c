//! Local speech recognition with Whisper
//!
//! Microphone audio is captured on a worker thread. The whole utterance so far
//! is re-transcribed every `partial_interval` to produce interim results, and
//! once more on stop to produce the final result.

use super::recognition::{RecognitionEvent, RecognitionSegment, SpeechRecognizer, VoiceInputConfig};
use crate::audio::{resample_audio, AudioInput, RECOGNITION_SAMPLE_RATE};
use crate::{Result, TutorError};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Whisper's context window
const MAX_UTTERANCE: Duration = Duration::from_secs(30);

pub struct WhisperRecognizer {
    context: Arc<WhisperContext>,
    partial_interval: Duration,
    n_threads: i32,
    events: (Sender<RecognitionEvent>, Receiver<RecognitionEvent>),
    capture: CaptureSlot,
}

impl WhisperRecognizer {
    pub fn new(model_path: &Path, config: &VoiceInputConfig) -> Result<Self> {
        info!("Loading Whisper model from: {:?}", model_path);

        if !model_path.exists() {
            return Err(TutorError::VoiceInput(format!(
                "Model file not found: {:?}",
                model_path
            )));
        }

        let path = model_path
            .to_str()
            .ok_or_else(|| TutorError::VoiceInput("Invalid model path".to_string()))?;
        let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| TutorError::VoiceInput(format!("Failed to load Whisper model: {:?}", e)))?;

        info!("Whisper model loaded");

        let n_threads = thread::available_parallelism()
            .map(|n| n.get().min(8) as i32)
            .unwrap_or(4);

        Ok(Self {
            context: Arc::new(context),
            partial_interval: config.partial_interval,
            n_threads,
            events: unbounded(),
            capture: CaptureSlot::default(),
        })
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&mut self, language: &str) -> Result<()> {
        if self.capture.is_busy() {
            if self.capture.is_stopping() {
                return Err(TutorError::VoiceInput(
                    "Still transcribing the previous utterance".to_string(),
                ));
            }
            return Ok(());
        }

        // whisper takes the bare language code
        let language = language.split(['-', '_']).next().unwrap_or("en").to_string();
        let context = Arc::clone(&self.context);
        let partial_interval = self.partial_interval;
        let n_threads = self.n_threads;
        let events = self.events.0.clone();

        self.capture.spawn(move |stop| {
            CaptureWorker {
                context,
                language,
                partial_interval,
                n_threads,
                events,
                stop,
            }
            .run()
        })
    }

    fn stop(&mut self) {
        self.capture.signal_stop();
    }

    fn events(&self) -> Receiver<RecognitionEvent> {
        self.events.1.clone()
    }

    fn name(&self) -> &str {
        "whisper"
    }
}

impl Drop for WhisperRecognizer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The capture thread of the current utterance, if any
#[derive(Default)]
struct CaptureSlot {
    worker: Option<(Arc<AtomicBool>, JoinHandle<()>)>,
}

impl CaptureSlot {
    /// A worker is still capturing or finishing its last transcription
    fn is_busy(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }

    fn is_stopping(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|(stop, _)| stop.load(Ordering::SeqCst))
    }

    fn spawn(&mut self, run: impl FnOnce(Arc<AtomicBool>) + Send + 'static) -> Result<()> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("whisper-capture".to_string())
            .spawn(move || run(flag))
            .map_err(|e| TutorError::VoiceInput(format!("Failed to spawn capture thread: {}", e)))?;
        self.worker = Some((stop, handle));
        Ok(())
    }

    fn signal_stop(&self) {
        if let Some((stop, _)) = &self.worker {
            stop.store(true, Ordering::SeqCst);
        }
    }
}

struct CaptureWorker {
    context: Arc<WhisperContext>,
    language: String,
    partial_interval: Duration,
    n_threads: i32,
    events: Sender<RecognitionEvent>,
    stop: Arc<AtomicBool>,
}

impl CaptureWorker {
    fn run(self) {
        // the cpal stream is not Send, so it lives on this thread
        let mut input = match AudioInput::new() {
            Ok(input) => input,
            Err(e) => return self.fail(e),
        };
        let (audio_tx, audio_rx) = bounded(64);
        if let Err(e) = input.start(audio_tx) {
            return self.fail(e);
        }

        let _ = self.events.send(RecognitionEvent::Started);

        let rate = input.sample_rate();
        let max_samples = (rate as u64 * MAX_UTTERANCE.as_secs()) as usize;
        let mut captured: Vec<f32> = Vec::new();
        let mut last_partial = Instant::now();
        let mut last_text = String::new();

        while !self.stop.load(Ordering::SeqCst) {
            match audio_rx.recv_timeout(Duration::from_millis(50)) {
                Ok(block) => captured.extend(block),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if captured.len() >= max_samples {
                debug!("Utterance reached maximum length");
                break;
            }

            if last_partial.elapsed() >= self.partial_interval && !captured.is_empty() {
                last_partial = Instant::now();
                match self.transcribe(&captured, rate) {
                    Ok(text) if !text.is_empty() && text != last_text => {
                        last_text = text.clone();
                        let _ = self
                            .events
                            .send(RecognitionEvent::Result(vec![RecognitionSegment::interim(text)]));
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Interim transcription failed: {}", e),
                }
            }
        }

        input.stop();
        while let Ok(block) = audio_rx.try_recv() {
            captured.extend(block);
        }

        match self.transcribe(&captured, rate) {
            Ok(text) if !text.is_empty() => {
                let _ = self
                    .events
                    .send(RecognitionEvent::Result(vec![RecognitionSegment::final_text(text)]));
            }
            Ok(_) => {}
            Err(e) => {
                let _ = self.events.send(RecognitionEvent::Error(e.to_string()));
            }
        }

        self.stop.store(true, Ordering::SeqCst);
        let _ = self.events.send(RecognitionEvent::Ended);
    }

    fn fail(&self, error: TutorError) {
        warn!("Capture failed: {}", error);
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.events.send(RecognitionEvent::Error(error.to_string()));
        let _ = self.events.send(RecognitionEvent::Ended);
    }

    fn transcribe(&self, samples: &[f32], rate: u32) -> Result<String> {
        let audio = resample_audio(samples, rate, RECOGNITION_SAMPLE_RATE)?;
        // too short to hold a word
        if audio.len() < RECOGNITION_SAMPLE_RATE as usize / 4 {
            return Ok(String::new());
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(self.n_threads);
        params.set_translate(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_suppress_blank(true);
        params.set_language(Some(self.language.as_str()));

        let mut state = self
            .context
            .create_state()
            .map_err(|e| TutorError::VoiceInput(format!("Failed to create state: {:?}", e)))?;

        state
            .full(params, &audio)
            .map_err(|e| TutorError::VoiceInput(format!("Transcription failed: {:?}", e)))?;

        let segments = state
            .full_n_segments()
            .map_err(|e| TutorError::VoiceInput(format!("Failed to get segments: {:?}", e)))?;

        let mut text = String::new();
        for i in 0..segments {
            let segment = state.full_get_segment_text(i).map_err(|e| {
                TutorError::VoiceInput(format!("Failed to get segment text: {:?}", e))
            })?;
            text.push_str(&segment);
        }

        Ok(clean_transcript(&text))
    }
}

/// Drop non-speech annotations such as `[BLANK_AUDIO]` or `(music)`
pub fn clean_transcript(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => cleaned.push(c),
            _ => {}
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
