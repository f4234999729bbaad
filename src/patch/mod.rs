//! Patches
//!
//! A `Patch` is the serializable parameter set for one sound. Range
//! invariants hold whichever way a patch is built: setters clamp, and
//! deserialization clamps the same fields on the way in.

mod wave_select;

pub use wave_select::{builtin_wave_selects, wave_selects, WaveSelect};

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::synth::{EnvParams, FilterType};

/// Patch cutoff bounds in Hz
pub const MIN_FILTER_HZ: f64 = 20.0;
pub const MAX_FILTER_HZ: f64 = 20000.0;

/// Resonance bounds
pub const MIN_FILTER_Q: f64 = 0.1;
pub const MAX_FILTER_Q: f64 = 20.0;

/// Largest secondary oscillator ratio
pub const MAX_DETUNE: f64 = 4.0;

/// Filter selection for a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterKind {
    #[default]
    #[serde(rename = "lp", alias = "lpf")]
    LowPass,
    #[serde(rename = "hp", alias = "hpf")]
    HighPass,
    #[serde(rename = "bp", alias = "bpf")]
    BandPass,
    #[serde(rename = "none")]
    None,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [
        FilterKind::LowPass,
        FilterKind::HighPass,
        FilterKind::BandPass,
        FilterKind::None,
    ];

    /// Parse a filter tag. Unknown tags mean no filter.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "lp" | "lpf" => FilterKind::LowPass,
            "hp" | "hpf" => FilterKind::HighPass,
            "bp" | "bpf" => FilterKind::BandPass,
            "none" | "" => FilterKind::None,
            other => {
                warn!("unknown filter type '{}', using none", other);
                FilterKind::None
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::LowPass => "lp",
            FilterKind::HighPass => "hp",
            FilterKind::BandPass => "bp",
            FilterKind::None => "none",
        }
    }

    /// Engine filter type, `None` when unfiltered
    pub fn filter_type(&self) -> Option<FilterType> {
        match self {
            FilterKind::LowPass => Some(FilterType::LowPass),
            FilterKind::HighPass => Some(FilterType::HighPass),
            FilterKind::BandPass => Some(FilterType::BandPass),
            FilterKind::None => None,
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|k| k == self).unwrap_or(0)
    }

    /// Kind at `index`, clamped to the last one
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }
}

/// Parameter set describing one sound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patch {
    pub name: String,
    pub wave: WaveSelect,
    /// 0 = primary wave, 1 = secondary (or wavetable scan position)
    #[serde(deserialize_with = "de_unit")]
    wave_mix: f64,
    /// How many waves the wave LFO sweeps across
    #[serde(deserialize_with = "de_non_negative")]
    wave_mix_lfo_amount: f64,
    /// Secondary oscillator ratio; 0 disables it
    #[serde(deserialize_with = "de_detune")]
    detune: f64,
    pub filt_type: FilterKind,
    #[serde(deserialize_with = "de_cutoff")]
    filt_f: f64,
    #[serde(deserialize_with = "de_q")]
    filt_q: f64,
    #[serde(deserialize_with = "de_unit")]
    filt_env_amount: f64,
    #[serde(deserialize_with = "de_env")]
    pub filt_env_params: EnvParams,
    #[serde(deserialize_with = "de_env")]
    pub amp_env_params: EnvParams,
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            name: "init".to_string(),
            wave: WaveSelect::default(),
            wave_mix: 0.0,
            wave_mix_lfo_amount: 3.0,
            detune: 1.01,
            filt_type: FilterKind::LowPass,
            filt_f: 8000.0,
            filt_q: 1.2,
            filt_env_amount: 0.5,
            filt_env_params: EnvParams::default(),
            amp_env_params: EnvParams::default(),
        }
    }
}

impl Patch {
    /// Default patch with a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn wave_mix(&self) -> f64 {
        self.wave_mix
    }

    /// Set wave mix, clamped to 0-1
    pub fn set_wave_mix(&mut self, mix: f64) {
        self.wave_mix = clamp_unit(mix);
    }

    pub fn wave_mix_lfo_amount(&self) -> f64 {
        self.wave_mix_lfo_amount
    }

    pub fn set_wave_mix_lfo_amount(&mut self, amount: f64) {
        self.wave_mix_lfo_amount = non_negative(amount);
    }

    pub fn detune(&self) -> f64 {
        self.detune
    }

    /// Set the secondary oscillator ratio (0 = off)
    pub fn set_detune(&mut self, ratio: f64) {
        self.detune = clamp_detune(ratio);
    }

    /// Whether voices get a secondary oscillator
    pub fn has_secondary(&self) -> bool {
        self.detune > 0.0
    }

    pub fn filt_f(&self) -> f64 {
        self.filt_f
    }

    /// Set cutoff, clamped to 20 Hz..20 kHz
    pub fn set_filt_f(&mut self, hz: f64) {
        self.filt_f = clamp_cutoff(hz);
    }

    pub fn filt_q(&self) -> f64 {
        self.filt_q
    }

    pub fn set_filt_q(&mut self, q: f64) {
        self.filt_q = clamp_q(q);
    }

    pub fn filt_env_amount(&self) -> f64 {
        self.filt_env_amount
    }

    pub fn set_filt_env_amount(&mut self, amount: f64) {
        self.filt_env_amount = clamp_unit(amount);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Short summary for logs and small displays
    pub fn summary(&self) -> String {
        format!(
            "{} {:.2}:mix detun:{:.3} {:.2}:wlfo filter:{} {:.0} q:{:.1}",
            self.wave,
            self.wave_mix,
            self.detune,
            self.wave_mix_lfo_amount,
            self.filt_type.name(),
            self.filt_f,
            self.filt_q
        )
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn clamp_unit(v: f64) -> f64 {
    finite_or(v, 0.0).clamp(0.0, 1.0)
}

fn non_negative(v: f64) -> f64 {
    finite_or(v, 0.0).max(0.0)
}

fn clamp_detune(v: f64) -> f64 {
    finite_or(v, 0.0).clamp(0.0, MAX_DETUNE)
}

fn clamp_cutoff(v: f64) -> f64 {
    finite_or(v, MAX_FILTER_HZ).clamp(MIN_FILTER_HZ, MAX_FILTER_HZ)
}

fn clamp_q(v: f64) -> f64 {
    finite_or(v, MIN_FILTER_Q).clamp(MIN_FILTER_Q, MAX_FILTER_Q)
}

fn de_unit<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    f64::deserialize(d).map(clamp_unit)
}

fn de_non_negative<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    f64::deserialize(d).map(non_negative)
}

fn de_detune<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    f64::deserialize(d).map(clamp_detune)
}

fn de_cutoff<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    f64::deserialize(d).map(clamp_cutoff)
}

fn de_q<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    f64::deserialize(d).map(clamp_q)
}

fn de_env<'de, D: Deserializer<'de>>(d: D) -> Result<EnvParams, D::Error> {
    EnvParams::deserialize(d).map(|env| env.sanitized())
}
