//! Microphone capture for local speech recognition

pub mod input;
pub mod resampler;

pub use input::AudioInput;
pub use resampler::{resample_audio, AudioResampler};

/// Sample rate expected by the recognition model
pub const RECOGNITION_SAMPLE_RATE: u32 = 16_000;
