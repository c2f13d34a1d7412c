//! Speech synthesis through a command-line engine
//!
//! Uses `espeak-ng` on Linux and Windows and `say` on macOS. Each utterance is
//! one child process that reads its text from stdin. Only one child runs at a
//! time.

use super::synthesis::{SpeechSynthesizer, SynthesisEvent, Utterance, UtteranceId};
use super::voices::{Voice, VoiceGender};
use crate::{Result, TutorError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtsEngine {
    /// `espeak-ng` or a compatible program such as `espeak`
    Espeak { program: String },
    /// macOS `say`
    Say,
}

impl TtsEngine {
    /// Platform default engine
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            TtsEngine::Say
        } else {
            TtsEngine::Espeak {
                program: "espeak-ng".to_string(),
            }
        }
    }

    /// Engine for a program name
    pub fn from_program(program: &str) -> Self {
        match program {
            "say" => TtsEngine::Say,
            other => TtsEngine::Espeak {
                program: other.to_string(),
            },
        }
    }

    pub fn program(&self) -> &str {
        match self {
            TtsEngine::Espeak { program } => program,
            TtsEngine::Say => "say",
        }
    }

    fn list_voices_args(&self) -> Vec<String> {
        match self {
            TtsEngine::Espeak { .. } => vec!["--voices=en".to_string()],
            TtsEngine::Say => vec!["-v".to_string(), "?".to_string()],
        }
    }

    fn speak_args(&self, voice: &Voice, rate_wpm: u32) -> Vec<String> {
        match self {
            TtsEngine::Espeak { .. } => vec![
                "-v".to_string(),
                voice.id.clone(),
                "-s".to_string(),
                rate_wpm.to_string(),
                "--stdin".to_string(),
            ],
            TtsEngine::Say => vec![
                "-v".to_string(),
                voice.id.clone(),
                "-r".to_string(),
                rate_wpm.to_string(),
                "-f".to_string(),
                "-".to_string(),
            ],
        }
    }

    fn parse_voices(&self, output: &str) -> Vec<Voice> {
        match self {
            TtsEngine::Espeak { .. } => parse_espeak_voices(output),
            TtsEngine::Say => parse_say_voices(output),
        }
    }
}

pub struct CommandSynthesizer {
    engine: TtsEngine,
    rate_wpm: u32,
    runtime: Handle,
    events: (Sender<SynthesisEvent>, Receiver<SynthesisEvent>),
    current: Option<(UtteranceId, oneshot::Sender<()>)>,
}

impl CommandSynthesizer {
    pub fn new(engine: TtsEngine, rate_wpm: u32, runtime: Handle) -> Self {
        info!("Command TTS engine: {}", engine.program());
        Self {
            engine,
            rate_wpm,
            runtime,
            events: unbounded(),
            current: None,
        }
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn load_voices(&mut self) {
        let engine = self.engine.clone();
        let tx = self.events.0.clone();

        self.runtime.spawn(async move {
            let output = Command::new(engine.program())
                .args(engine.list_voices_args())
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output()
                .await;

            let voices = match output {
                Ok(output) if output.status.success() => {
                    engine.parse_voices(&String::from_utf8_lossy(&output.stdout))
                }
                Ok(output) => {
                    warn!("{} voice listing exited with {}", engine.program(), output.status);
                    Vec::new()
                }
                Err(e) => {
                    warn!("Failed to list voices with {}: {}", engine.program(), e);
                    Vec::new()
                }
            };
            let _ = tx.send(SynthesisEvent::VoicesChanged(voices));
        });
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        self.stop();

        let mut child = {
            let _guard = self.runtime.enter();
            Command::new(self.engine.program())
                .args(self.engine.speak_args(&utterance.voice, self.rate_wpm))
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| {
                    TutorError::VoiceOutput(format!(
                        "Failed to start {}: {}",
                        self.engine.program(),
                        e
                    ))
                })?
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.current = Some((utterance.id, cancel_tx));

        let tx = self.events.0.clone();
        let program = self.engine.program().to_string();
        let id = utterance.id;
        let text = utterance.text;

        self.runtime.spawn(async move {
            let _ = tx.send(SynthesisEvent::Started(id));

            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(text.as_bytes()).await {
                    warn!("Failed to write utterance to {}: {}", program, e);
                }
                // closing stdin lets the engine start speaking
                drop(stdin);
            }

            tokio::select! {
                status = child.wait() => {
                    let event = match status {
                        Ok(status) if status.success() => SynthesisEvent::Finished(id),
                        Ok(status) => SynthesisEvent::Failed {
                            id,
                            error: format!("{} exited with {}", program, status),
                        },
                        Err(e) => SynthesisEvent::Failed {
                            id,
                            error: e.to_string(),
                        },
                    };
                    let _ = tx.send(event);
                }
                _ = cancel_rx => {
                    let _ = child.kill().await;
                    debug!("Utterance {} stopped", id);
                }
            }
        });

        Ok(())
    }

    fn stop(&mut self) {
        if let Some((id, cancel)) = self.current.take() {
            debug!("Stopping utterance {}", id);
            let _ = cancel.send(());
        }
    }

    fn events(&self) -> Receiver<SynthesisEvent> {
        self.events.1.clone()
    }

    fn name(&self) -> &str {
        self.engine.program()
    }
}

impl Drop for CommandSynthesizer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Parse `espeak-ng --voices` output.
///
/// espeak voices are mostly male, so each voice also gets a female variant
/// (`+f3`).
pub fn parse_espeak_voices(output: &str) -> Vec<Voice> {
    let mut voices = Vec::new();

    for line in output.lines().skip(1) {
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < 4 {
            continue;
        }
        let code = columns[1];
        let gender = match columns[2].rsplit('/').next() {
            Some("F") => Some(VoiceGender::Female),
            Some("M") => Some(VoiceGender::Male),
            _ => None,
        };
        let name = columns[3].replace('_', " ");
        let language = normalize_language(code);

        let mut voice = Voice::new(code, name.clone(), language.clone());
        voice.gender = gender;
        voice.is_default = code == "en-us";
        voices.push(voice);

        if gender != Some(VoiceGender::Female) {
            voices.push(
                Voice::new(format!("{}+f3", code), format!("{} (female)", name), language)
                    .with_gender(VoiceGender::Female),
            );
        }
    }

    voices
}

/// Parse `say -v ?` output: `Name   en_US    # sample sentence`
pub fn parse_say_voices(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter_map(|line| {
            let (left, _) = line.split_once('#')?;
            let left = left.trim_end();
            let (name, code) = left.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Voice::new(name, name, normalize_language(code)))
        })
        .collect()
}

/// `en_us` / `en-gb-x-rp` style tags to `en-US` / `en-GB-x-rp`
fn normalize_language(code: &str) -> String {
    let mut parts = code.split(['-', '_']);
    let mut tag = parts.next().unwrap_or_default().to_ascii_lowercase();
    if let Some(region) = parts.next() {
        tag.push('-');
        if region.len() == 2 {
            tag.push_str(&region.to_ascii_uppercase());
        } else {
            tag.push_str(region);
        }
    }
    for rest in parts {
        tag.push('-');
        tag.push_str(rest);
    }
    tag
}
