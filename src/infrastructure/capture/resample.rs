//! Streaming conversion of captured PCM to the 16kHz speech rate

use rubato::{FftFixedIn, Resampler};

use crate::application::ports::CaptureError;

/// Mono resampler fed from successive buffer drains.
///
/// Samples that do not fill a whole resampler chunk are held until the
/// next drain, or padded out by [`PcmResampler::flush`].
pub struct PcmResampler {
    inner: FftFixedIn<f32>,
    source_rate: u32,
    target_rate: u32,
    pending: Vec<f32>,
    consumed: u64,
    produced: u64,
}

impl PcmResampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self, CaptureError> {
        let inner = FftFixedIn::<f32>::new(
            source_rate as usize,
            target_rate as usize,
            1024, // Chunk size
            2,    // Sub-chunks
            1,    // Mono
        )
        .map_err(|e| CaptureError::StartFailed(format!("Resampler init failed: {}", e)))?;

        Ok(Self {
            inner,
            source_rate,
            target_rate,
            pending: Vec::new(),
            consumed: 0,
            produced: 0,
        })
    }

    /// Resample every whole chunk available, keeping the remainder
    pub fn process(&mut self, samples: &[i16]) -> Result<Vec<i16>, CaptureError> {
        self.consumed += samples.len() as u64;
        self.pending
            .extend(samples.iter().map(|&s| s as f32 / 32768.0));

        let mut output = Vec::new();
        loop {
            let frames_needed = self.inner.input_frames_next();
            if self.pending.len() < frames_needed {
                break;
            }
            let chunk: Vec<f32> = self.pending.drain(..frames_needed).collect();
            self.run(chunk, &mut output)?;
        }
        Ok(output)
    }

    /// Resample what is left, padding with silence, and start a new phase
    pub fn flush(&mut self, samples: &[i16]) -> Result<Vec<i16>, CaptureError> {
        let mut output = self.process(samples)?;
        if !self.pending.is_empty() {
            let mut chunk = std::mem::take(&mut self.pending);
            chunk.resize(self.inner.input_frames_next(), 0.0);
            self.run(chunk, &mut output)?;
        }

        // Trim the padding back to the expected length
        let expected = (self.consumed as f64 * self.target_rate as f64 / self.source_rate as f64)
            .ceil() as u64;
        let allowed = expected.saturating_sub(self.produced - output.len() as u64);
        output.truncate(allowed as usize);

        self.consumed = 0;
        self.produced = 0;
        Ok(output)
    }

    fn run(&mut self, chunk: Vec<f32>, output: &mut Vec<i16>) -> Result<(), CaptureError> {
        let resampled = self
            .inner
            .process(&[chunk], None)
            .map_err(|e| CaptureError::DeviceLost(format!("Resampling failed: {}", e)))?;
        let before = output.len();
        output.extend(resampled[0].iter().map(|&s| (s * 32767.0) as i16));
        self.produced += (output.len() - before) as u64;
        Ok(())
    }
}
