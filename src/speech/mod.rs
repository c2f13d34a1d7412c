//! Speech input and output
//!
//! This module provides:
//! - [`VoiceInput`], the recognition adapter with silence-based end of utterance
//! - [`VoiceOutput`], the synthesis adapter with voice selection
//! - Platform backends: command-line TTS and, with the `whisper` feature, local recognition

pub mod command_tts;
pub mod recognition;
pub mod synthesis;
pub mod voices;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use command_tts::{CommandSynthesizer, TtsEngine};
pub use recognition::{
    RecognitionEvent, RecognitionSegment, SpeechRecognizer, UnavailableRecognizer, VoiceInput,
    VoiceInputConfig, VoiceInputEvent, VoiceInputState,
};
pub use synthesis::{
    SilentSynthesizer, SpeechSynthesizer, SynthesisEvent, Utterance, UtteranceId, VoiceOutput,
    VoiceOutputState,
};
pub use voices::{has_voice_options, select_voice, Voice, VoiceGender};
#[cfg(feature = "whisper")]
pub use whisper::WhisperRecognizer;
