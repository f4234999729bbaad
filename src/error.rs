//! Library error type
//!
//! Only construction-time work can fail (reading wavetable files). Everything
//! that runs on a control tick clamps or ignores bad input instead.

use thiserror::Error;

/// Errors raised while building waveform sources
#[derive(Debug, Error)]
pub enum SynthError {
    /// The WAV container could not be opened or decoded
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    /// Wavetables must be mono 16-bit integer PCM
    #[error("unsupported wav format: {channels} channel(s), {bits}-bit (expected mono 16-bit PCM)")]
    UnsupportedWavFormat { channels: u16, bits: u16 },

    /// The file holds fewer frames than a single wave
    #[error("wavetable has {frames} frames, need at least {wave_size}")]
    WavetableTooShort { frames: usize, wave_size: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SynthError>;
