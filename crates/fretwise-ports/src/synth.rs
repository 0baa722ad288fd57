use crate::types::*;

#[derive(thiserror::Error, Debug)]
pub enum SynthError {
    #[error("unsupported sample rate: {0}")]
    UnsupportedSampleRate(u32),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Thread model:
/// - set_sample_rate is called from the core thread (can lock internally)
/// - pluck/render are called from the audio thread (must be realtime-safe)
pub trait SynthPort: Send + Sync {
    fn set_sample_rate(&self, sample_rate_hz: u32) -> Result<(), SynthError>;

    /// Start a plucked voice for a MIDI note. Voices decay on their own.
    fn pluck(&self, event: PluckEvent, at: SampleTime);

    /// Called by audio thread: render frames to out_l/out_r
    fn render(&self, frames: usize, out_l: &mut [f32], out_r: &mut [f32]);
}
