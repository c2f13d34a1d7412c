use crate::{Result, TutorError};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

const CHUNK_FRAMES: usize = 1024;

/// Mono sample rate converter
pub struct AudioResampler {
    resampler: SincFixedIn<f32>,
    ratio: f64,
}

impl AudioResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(TutorError::Config(
                "Sample rates must be greater than 0".into(),
            ));
        }

        let ratio = output_rate as f64 / input_rate as f64;
        let params = SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window: WindowFunction::BlackmanHarris2,
        };

        let resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_FRAMES, 1)
            .map_err(|e| TutorError::VoiceInput(format!("Failed to create resampler: {}", e)))?;

        debug!("Created resampler: {} Hz -> {} Hz", input_rate, output_rate);

        Ok(Self { resampler, ratio })
    }

    pub fn resample(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let mut output = Vec::with_capacity((input.len() as f64 * self.ratio * 1.1) as usize);

        for chunk in input.chunks(CHUNK_FRAMES) {
            // the last chunk is zero padded to the fixed input size
            let mut block = vec![0.0f32; CHUNK_FRAMES];
            block[..chunk.len()].copy_from_slice(chunk);

            let processed = self
                .resampler
                .process(&[block], None)
                .map_err(|e| TutorError::VoiceInput(format!("Resampling failed: {}", e)))?;

            let produced = &processed[0];
            let keep = if chunk.len() < CHUNK_FRAMES {
                ((chunk.len() as f64) * self.ratio).ceil() as usize
            } else {
                produced.len()
            };
            output.extend_from_slice(&produced[..keep.min(produced.len())]);
        }

        Ok(output)
    }
}

/// Resample a mono buffer in one step
pub fn resample_audio(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    if input_rate == output_rate || input.is_empty() {
        return Ok(input.to_vec());
    }
    AudioResampler::new(input_rate, output_rate)?.resample(input)
}
