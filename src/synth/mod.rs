//! Synthesis building blocks
//!
//! Waveform tables, wavetables, envelope and LFO descriptors, filter specs,
//! and the engine trait the voice engine drives.

mod engine;
mod envelope;
mod filter;
mod headless;
mod lfo;
mod waveform;
mod wavetable;

pub use engine::{hz_to_midi, midi_to_hz, EnvelopeHandle, ModHandle, OscHandle, SynthEngine};
pub use envelope::EnvParams;
pub use filter::{Coefficients, FilterSpec, FilterType, MIN_CUTOFF_HZ};
pub use headless::{HeadlessEngine, OscState};
pub use lfo::{LfoParams, ModSource};
pub use waveform::{
    lerp, lerp_into, lfo_ramp_down_pos, lfo_ramp_up_pos, lfo_triangle, lfo_triangle_pos,
    make_waveform, saw_down, saw_up, Sample, SharedWave, Waveform, LFO_PEAK,
};
pub use wavetable::Wavetable;
