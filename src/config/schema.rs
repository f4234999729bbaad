//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::app::{DroneAppSettings, WaveAppSettings};
use crate::drone::{DroneMapping, DroneSettings};
use crate::instrument::InstrumentSettings;
use crate::mapping::ScalerRange;
use crate::patch::{wave_selects, FilterKind, Patch};
use crate::synth::{Sample, Waveform};

/// Main configuration for wavedrone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Engine output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Control and display tick periods
    #[serde(default)]
    pub timing: TimingConfig,

    /// Waveform buffer settings
    #[serde(default)]
    pub waves: WavesConfig,

    /// Knob pickup domains
    #[serde(default)]
    pub scaler: ScalerConfig,

    /// Drone synth settings
    #[serde(default)]
    pub drone: DroneConfig,

    /// Wave synth settings
    #[serde(default)]
    pub instrument: InstrumentConfig,
}

impl SynthConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }

        if self.timing.control_period_ms == 0 || self.timing.display_period_ms == 0 {
            bail!("Tick periods must be greater than 0 ms");
        }

        if self.waves.size < 4 || self.waves.size % 2 != 0 {
            bail!("Wave size must be an even number of at least 4 samples");
        }
        if self.waves.amplitude <= 0 || self.waves.amplitude > i32::from(Sample::MAX) {
            bail!("Wave amplitude must be between 1 and {}", Sample::MAX);
        }

        let s = &self.scaler;
        if s.knob_min >= s.knob_max {
            bail!("Scaler knob_min must be below knob_max");
        }
        if s.value_min >= s.value_max {
            bail!("Scaler value_min must be below value_max");
        }
        if s.dead_zone < 0.0 {
            bail!("Scaler dead_zone must not be negative");
        }

        let d = &self.drone;
        if d.voices == 0 {
            bail!("Drone needs at least one voice");
        }
        if d.note_range <= 0.0 {
            bail!("Drone note_range must be greater than 0");
        }
        if d.min_detune < 0.0 || d.max_detune_spread < 0.0 {
            bail!("Drone detune settings must not be negative");
        }
        if d.converge_rate <= 0.0 || d.converge_rate > 1.0 {
            bail!("Drone converge_rate must be in (0, 1]");
        }
        if d.hold_secs < 0.0 {
            bail!("Drone hold_secs must not be negative");
        }
        if d.filter_f <= 0.0 || d.filter_q <= 0.0 {
            bail!("Drone filter frequency and q must be greater than 0");
        }

        let i = &self.instrument;
        if i.pad_notes.is_empty() {
            bail!("Instrument needs at least one pad note");
        }
        if let Some(note) = i.pad_notes.iter().find(|&&n| n > 127) {
            bail!("Pad note {} is outside the MIDI range", note);
        }
        if i.patches.is_empty() {
            bail!("Instrument needs at least one patch");
        }
        if i.touch_pressure_max == 0 {
            bail!("touch_pressure_max must be greater than 0");
        }

        Ok(())
    }

    pub fn sample_rate(&self) -> f64 {
        f64::from(self.audio.sample_rate)
    }

    pub fn scaler_range(&self) -> ScalerRange {
        ScalerRange {
            knob_min: self.scaler.knob_min,
            knob_max: self.scaler.knob_max,
            value_min: self.scaler.value_min,
            value_max: self.scaler.value_max,
        }
    }

    /// Drone controller settings. The control range follows the scaler's
    /// value domain.
    pub fn drone_settings(&self) -> DroneSettings {
        let d = &self.drone;
        DroneSettings {
            voices: d.voices,
            mapping: DroneMapping {
                control_min: self.scaler.value_min,
                control_max: self.scaler.value_max,
                note_offset: d.note_offset,
                note_range: d.note_range,
                min_detune: d.min_detune,
                max_detune_spread: d.max_detune_spread,
            },
            wave: d.wave,
            wave_size: self.waves.size,
            wave_amplitude: self.wave_amplitude(),
            filter: d.filter,
            filter_f: d.filter_f,
            filter_q: d.filter_q,
            pitch_lfo_rate: d.pitch_lfo_rate,
            pitch_lfo_scale: d.pitch_lfo_scale,
        }
    }

    pub fn drone_app_settings(&self) -> DroneAppSettings {
        DroneAppSettings {
            range: self.scaler_range(),
            dead_zone: self.scaler.dead_zone,
            hold_secs: self.drone.hold_secs,
            converge_rate: self.drone.converge_rate,
        }
    }

    pub fn instrument_settings(&self) -> InstrumentSettings {
        InstrumentSettings {
            wave_size: self.waves.size,
            wave_amplitude: self.wave_amplitude(),
            filter_mod_depth: self.instrument.filter_mod_depth,
        }
    }

    /// Wave app settings; the wave knob offers the built-ins plus every
    /// wavetable in `waves.dir`
    pub fn wave_app_settings(&self) -> WaveAppSettings {
        WaveAppSettings {
            pad_notes: self.instrument.pad_notes.clone(),
            range: self.scaler_range(),
            dead_zone: self.scaler.dead_zone,
            touch_pressure_max: self.instrument.touch_pressure_max,
            wave_selects: wave_selects(self.waves.dir.as_deref()),
        }
    }

    fn wave_amplitude(&self) -> Sample {
        Sample::try_from(self.waves.amplitude).unwrap_or(Sample::MAX)
    }
}

/// Engine output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 25600)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { sample_rate: default_sample_rate() }
    }
}

fn default_sample_rate() -> u32 { 25600 }

/// Tick timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Control tick period in ms (default: 10)
    #[serde(default = "default_control_period_ms")]
    pub control_period_ms: u64,

    /// Display tick period in ms (default: 100)
    #[serde(default = "default_display_period_ms")]
    pub display_period_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            control_period_ms: default_control_period_ms(),
            display_period_ms: default_display_period_ms(),
        }
    }
}

fn default_control_period_ms() -> u64 { 10 }
fn default_display_period_ms() -> u64 { 100 }

/// Waveform buffers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WavesConfig {
    /// Samples per single-cycle wave (default: 256)
    #[serde(default = "default_wave_size")]
    pub size: usize,

    /// Peak sample value (default: 20000)
    #[serde(default = "default_wave_amplitude")]
    pub amplitude: i32,

    /// Directory searched for wavetable files
    pub dir: Option<PathBuf>,
}

impl Default for WavesConfig {
    fn default() -> Self {
        Self {
            size: default_wave_size(),
            amplitude: default_wave_amplitude(),
            dir: None,
        }
    }
}

fn default_wave_size() -> usize { 256 }
fn default_wave_amplitude() -> i32 { 20000 }

/// Knob pickup domains
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerConfig {
    /// Lowest raw knob reading (default: 0)
    #[serde(default)]
    pub knob_min: f64,

    /// Highest raw knob reading (default: 255)
    #[serde(default = "default_domain_max")]
    pub knob_max: f64,

    /// Lowest parameter value (default: 0)
    #[serde(default)]
    pub value_min: f64,

    /// Highest parameter value (default: 255)
    #[serde(default = "default_domain_max")]
    pub value_max: f64,

    /// Knob movement ignored as noise (default: 1)
    #[serde(default = "default_dead_zone")]
    pub dead_zone: f64,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self {
            knob_min: 0.0,
            knob_max: default_domain_max(),
            value_min: 0.0,
            value_max: default_domain_max(),
            dead_zone: default_dead_zone(),
        }
    }
}

fn default_domain_max() -> f64 { 255.0 }
fn default_dead_zone() -> f64 { 1.0 }

/// Drone synth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneConfig {
    /// Oscillator pairs (default: 4)
    #[serde(default = "default_drone_voices")]
    pub voices: usize,

    /// Lowest note, as a MIDI number (default: 12)
    #[serde(default = "default_note_offset")]
    pub note_offset: f64,

    /// Semitones covered by the center knob (default: 63.75)
    #[serde(default = "default_note_range")]
    pub note_range: f64,

    /// Semitones between a pair at zero spread (default: 0.001)
    #[serde(default = "default_min_detune")]
    pub min_detune: f64,

    /// Extra semitones at full spread (default: 12)
    #[serde(default = "default_max_detune_spread")]
    pub max_detune_spread: f64,

    /// Oscillator wave (default: saw)
    #[serde(default = "default_drone_wave")]
    pub wave: Waveform,

    /// Filter type (default: lp)
    #[serde(default)]
    pub filter: FilterKind,

    /// Filter cutoff in Hz (default: 2000)
    #[serde(default = "default_drone_filter_f")]
    pub filter_f: f64,

    /// Filter resonance (default: 0.7)
    #[serde(default = "default_drone_filter_q")]
    pub filter_q: f64,

    /// Fraction of the gap closed per tick while converging (default: 0.01)
    #[serde(default = "default_converge_rate")]
    pub converge_rate: f64,

    /// Key hold before converging starts, in seconds (default: 1.0)
    #[serde(default = "default_hold_secs")]
    pub hold_secs: f64,

    /// Pitch LFO rate in Hz (default: 0.1)
    #[serde(default = "default_pitch_lfo_rate")]
    pub pitch_lfo_rate: f64,

    /// Pitch LFO depth in octaves (default: 0.02)
    #[serde(default = "default_pitch_lfo_scale")]
    pub pitch_lfo_scale: f64,
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            voices: default_drone_voices(),
            note_offset: default_note_offset(),
            note_range: default_note_range(),
            min_detune: default_min_detune(),
            max_detune_spread: default_max_detune_spread(),
            wave: default_drone_wave(),
            filter: FilterKind::default(),
            filter_f: default_drone_filter_f(),
            filter_q: default_drone_filter_q(),
            converge_rate: default_converge_rate(),
            hold_secs: default_hold_secs(),
            pitch_lfo_rate: default_pitch_lfo_rate(),
            pitch_lfo_scale: default_pitch_lfo_scale(),
        }
    }
}

fn default_drone_voices() -> usize { 4 }
fn default_note_offset() -> f64 { 12.0 }
fn default_note_range() -> f64 { 63.75 }
fn default_min_detune() -> f64 { 0.001 }
fn default_max_detune_spread() -> f64 { 12.0 }
fn default_drone_wave() -> Waveform { Waveform::Saw }
fn default_drone_filter_f() -> f64 { 2000.0 }
fn default_drone_filter_q() -> f64 { 0.7 }
fn default_converge_rate() -> f64 { 0.01 }
fn default_hold_secs() -> f64 { 1.0 }
fn default_pitch_lfo_rate() -> f64 { 0.1 }
fn default_pitch_lfo_scale() -> f64 { 0.02 }

/// Wave synth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Note played by each touch pad (default: [40, 48, 52, 55])
    #[serde(default = "default_pad_notes")]
    pub pad_notes: Vec<u8>,

    /// Largest filter envelope sweep in Hz (default: 8000)
    #[serde(default = "default_filter_mod_depth")]
    pub filter_mod_depth: f64,

    /// Raw pad pressure read as full level (default: 1000)
    #[serde(default = "default_touch_pressure_max")]
    pub touch_pressure_max: u16,

    /// Patch bank; pad i loads patch i (default: one init patch)
    #[serde(default = "default_patches")]
    pub patches: Vec<Patch>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            pad_notes: default_pad_notes(),
            filter_mod_depth: default_filter_mod_depth(),
            touch_pressure_max: default_touch_pressure_max(),
            patches: default_patches(),
        }
    }
}

fn default_pad_notes() -> Vec<u8> { vec![40, 48, 52, 55] }
fn default_filter_mod_depth() -> f64 { 8000.0 }
fn default_touch_pressure_max() -> u16 { 1000 }
fn default_patches() -> Vec<Patch> { vec![Patch::default()] }
