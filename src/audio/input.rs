use crate::{Result, TutorError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Default input device producing mono f32 frames
pub struct AudioInput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    /// Read by the audio callback
    capturing: Arc<AtomicBool>,
}

impl AudioInput {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| TutorError::VoiceInput("No microphone available".into()))?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_input_config()
            .map_err(|e| TutorError::VoiceInput(format!("Failed to get input config: {}", e)))?
            .into();

        Ok(Self {
            device,
            config,
            stream: None,
            capturing: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Start capturing and forward mono sample blocks to `audio_tx`
    pub fn start(&mut self, audio_tx: Sender<Vec<f32>>) -> Result<()> {
        if self.stream.is_some() {
            warn!("Microphone already open");
            return Ok(());
        }

        let channels = self.config.channels as usize;
        let capturing = Arc::clone(&self.capturing);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !capturing.load(Ordering::Relaxed) {
                        return;
                    }

                    let samples = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };

                    if let Err(e) = audio_tx.try_send(samples) {
                        debug!("Dropped audio block: {}", e);
                    }
                },
                |err| error!("Audio input stream error: {}", err),
                None,
            )
            .map_err(|e| TutorError::VoiceInput(format!("Failed to open microphone: {}", e)))?;

        self.capturing.store(true, Ordering::Relaxed);
        if let Err(e) = stream.play() {
            self.capturing.store(false, Ordering::Relaxed);
            return Err(TutorError::VoiceInput(format!("Failed to start microphone: {}", e)));
        }
        self.stream = Some(stream);

        info!("Microphone capture started");
        Ok(())
    }

    pub fn stop(&mut self) {
        self.capturing.store(false, Ordering::Relaxed);
        // dropping the stream closes the device
        if self.stream.take().is_some() {
            info!("Microphone capture stopped");
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Relaxed)
    }
}

impl Drop for AudioInput {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_capture_state() {
        // CI machines usually have no microphone
        if let Ok(mut input) = AudioInput::new() {
            assert!(input.sample_rate() > 0);
            assert!(!input.is_capturing());

            let (tx, _rx) = bounded(10);
            if input.start(tx).is_ok() {
                assert!(input.is_capturing());
                input.stop();
                assert!(!input.is_capturing());
            }
        }
    }
}
