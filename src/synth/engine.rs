//! Synthesis engine capability surface
//!
//! The voice engine and drone controller never render audio themselves. They
//! drive something implementing `SynthEngine`, which owns oscillators,
//! envelopes and modulation sources and hands back opaque handles.

use super::envelope::EnvParams;
use super::filter::{FilterSpec, FilterType};
use super::lfo::LfoParams;
use super::waveform::SharedWave;

/// Handle to an engine oscillator (a sounding "note" object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OscHandle(pub u32);

/// Handle to an engine envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvelopeHandle(pub u32);

/// Handle to an engine modulation source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModHandle(pub u32);

/// What the core needs from a synthesis engine
pub trait SynthEngine {
    /// Output sample rate in Hz
    fn sample_rate(&self) -> f64;

    /// Create an oscillator playing `waveform` (not yet sounding)
    fn create_oscillator(
        &mut self,
        frequency: f64,
        waveform: &SharedWave,
        envelope: Option<EnvelopeHandle>,
        filter: Option<FilterSpec>,
    ) -> OscHandle;

    /// Start oscillators sounding
    fn press(&mut self, oscillators: &[OscHandle]);

    /// Release oscillators into their envelope release stage
    fn release(&mut self, oscillators: &[OscHandle]);

    fn set_frequency(&mut self, oscillator: OscHandle, hz: f64);

    fn set_amplitude(&mut self, oscillator: OscHandle, level: f64);

    fn set_filter(&mut self, oscillator: OscHandle, filter: Option<FilterSpec>);

    /// Route a modulation source to the oscillator's pitch bend (in octaves)
    fn set_bend(&mut self, oscillator: OscHandle, source: Option<ModHandle>);

    fn create_envelope(&mut self, params: &EnvParams) -> EnvelopeHandle;

    fn create_modulation(&mut self, params: &LfoParams) -> ModHandle;

    /// Current output of a modulation source
    fn modulation_value(&self, source: ModHandle) -> f64;

    fn set_modulation_scale(&mut self, source: ModHandle, scale: f64);

    /// Add a source to the set the engine ticks on its own
    fn attach(&mut self, source: ModHandle);

    /// Remove a source from the ticked set
    fn detach(&mut self, source: ModHandle);

    /// Detach a source for good. Its handle must not be used afterwards.
    fn free_modulation(&mut self, source: ModHandle) {
        self.detach(source);
    }

    /// Move engine time forward. Engines with their own clock ignore this.
    fn advance(&mut self, _dt: f64) {}

    fn low_pass_filter(&self, cutoff: f64, q: f64) -> FilterSpec {
        FilterSpec::new(FilterType::LowPass, self.sample_rate(), cutoff, q)
    }

    fn high_pass_filter(&self, cutoff: f64, q: f64) -> FilterSpec {
        FilterSpec::new(FilterType::HighPass, self.sample_rate(), cutoff, q)
    }

    fn band_pass_filter(&self, cutoff: f64, q: f64) -> FilterSpec {
        FilterSpec::new(FilterType::BandPass, self.sample_rate(), cutoff, q)
    }

    fn filter(&self, filter_type: FilterType, cutoff: f64, q: f64) -> FilterSpec {
        match filter_type {
            FilterType::LowPass => self.low_pass_filter(cutoff, q),
            FilterType::HighPass => self.high_pass_filter(cutoff, q),
            FilterType::BandPass => self.band_pass_filter(cutoff, q),
        }
    }
}

/// Convert a (possibly fractional) MIDI note number to Hz
pub fn midi_to_hz(note: f64) -> f64 {
    440.0 * 2f64.powf((note - 69.0) / 12.0)
}

/// Convert Hz to a fractional MIDI note number
pub fn hz_to_midi(hz: f64) -> f64 {
    12.0 * (hz.log2() - 440f64.log2()) + 69.0
}
