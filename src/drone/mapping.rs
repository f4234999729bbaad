//! Control point to drone pitch

use serde::{Deserialize, Serialize};

use crate::mapping::{LinearMapper, Mapper};
use crate::synth::midi_to_hz;

/// Pure mapping from a (center, spread) control point to a note pair.
///
/// `center` picks the base note across `note_offset..note_offset+note_range`;
/// `spread` adds `min_detune` to `min_detune + max_detune_spread` semitones
/// to the second note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneMapping {
    pub control_min: f64,
    pub control_max: f64,
    pub note_offset: f64,
    pub note_range: f64,
    /// Semitones between the pair at zero spread
    pub min_detune: f64,
    /// Extra semitones at full spread
    pub max_detune_spread: f64,
}

impl Default for DroneMapping {
    fn default() -> Self {
        Self {
            control_min: 0.0,
            control_max: 255.0,
            note_offset: 12.0,
            note_range: 63.75,
            min_detune: 0.001,
            max_detune_spread: 12.0,
        }
    }
}

impl DroneMapping {
    fn center_mapper(&self) -> LinearMapper {
        LinearMapper::new(
            "center",
            self.control_min,
            self.control_max,
            self.note_offset,
            self.note_offset + self.note_range,
        )
    }

    /// Clamp a control value into the control range
    pub fn clamp_control(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.control_min;
        }
        value.clamp(self.control_min, self.control_max)
    }

    /// Base note for a center control value
    pub fn note_for(&self, center: f64) -> f64 {
        self.center_mapper().map(center)
    }

    /// Semitones between the pair for a spread control value
    pub fn detune_for(&self, spread: f64) -> f64 {
        let span = self.control_max - self.control_min;
        let fraction = if span > 0.0 {
            (self.clamp_control(spread) - self.control_min) / span
        } else {
            0.0
        };
        self.min_detune + fraction * self.max_detune_spread
    }

    /// Both notes of the pair
    pub fn notes(&self, center: f64, spread: f64) -> (f64, f64) {
        let note = self.note_for(center);
        (note, note + self.detune_for(spread))
    }

    /// Both frequencies of the pair in Hz
    pub fn frequencies(&self, center: f64, spread: f64) -> (f64, f64) {
        let (a, b) = self.notes(center, spread);
        (midi_to_hz(a), midi_to_hz(b))
    }

    /// Center control value that yields `note`, clamped to the control range
    pub fn center_for_note(&self, note: f64) -> f64 {
        self.center_mapper().inverse().map(note)
    }

    /// Spread control value that yields `semitones` between the pair
    pub fn spread_for_detune(&self, semitones: f64) -> f64 {
        if self.max_detune_spread <= 0.0 {
            return self.control_min;
        }
        let fraction = (semitones - self.min_detune) / self.max_detune_spread;
        self.clamp_control(self.control_min + fraction * (self.control_max - self.control_min))
    }
}
