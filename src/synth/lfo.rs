//! Modulation sources
//!
//! `LfoParams` describes a looping or one-shot LFO. `ModSource` is the
//! control-rate state the headless engine keeps for each one; its value is
//! `offset + scale * waveform(phase)` with the waveform normalized to ±1.

use serde::{Deserialize, Serialize};

use super::waveform::{lfo_triangle, Sample, LFO_PEAK};

/// Settings for a modulation source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LfoParams {
    /// Cycles per second
    pub rate: f64,
    pub scale: f64,
    pub offset: f64,
    /// Starting phase (0.0-1.0)
    pub phase_offset: f64,
    /// Run through the waveform once and hold the last value
    pub once: bool,
    /// Shape; `None` means the default bipolar triangle
    pub waveform: Option<Vec<Sample>>,
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            scale: 1.0,
            offset: 0.0,
            phase_offset: 0.0,
            once: false,
            waveform: None,
        }
    }
}

impl LfoParams {
    /// A looping LFO
    pub fn looping(rate: f64, scale: f64, offset: f64) -> Self {
        Self {
            rate,
            scale,
            offset,
            ..Self::default()
        }
    }

    /// A single pass over `waveform`, used to fake a filter envelope
    pub fn one_shot(rate: f64, scale: f64, offset: f64, waveform: Vec<Sample>) -> Self {
        Self {
            rate,
            scale,
            offset,
            once: true,
            waveform: Some(waveform),
            ..Self::default()
        }
    }

    pub fn with_phase_offset(mut self, phase: f64) -> Self {
        self.phase_offset = phase.rem_euclid(1.0);
        self
    }
}

/// Running state of one modulation source
#[derive(Debug, Clone)]
pub struct ModSource {
    rate: f64,
    scale: f64,
    offset: f64,
    once: bool,
    waveform: Vec<Sample>,
    phase: f64,
    finished: bool,
}

impl ModSource {
    pub fn new(params: &LfoParams) -> Self {
        let waveform = match &params.waveform {
            Some(w) if !w.is_empty() => w.clone(),
            _ => lfo_triangle(),
        };
        Self {
            rate: params.rate.max(0.0),
            scale: params.scale,
            offset: params.offset,
            once: params.once,
            waveform,
            phase: params.phase_offset.rem_euclid(1.0),
            finished: false,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Whether a one-shot source has reached its end
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance by `dt` seconds
    pub fn advance(&mut self, dt: f64) {
        if self.finished {
            return;
        }
        self.phase += self.rate * dt;
        if self.once {
            if self.phase >= 1.0 {
                self.phase = 1.0;
                self.finished = true;
            }
        } else {
            self.phase = self.phase.rem_euclid(1.0);
        }
    }

    /// Current output value
    pub fn value(&self) -> f64 {
        self.offset + self.scale * self.raw()
    }

    /// Waveform value at the current phase, normalized to ±1.
    ///
    /// Looping sources interpolate around the wrap back to the first point;
    /// one-shot sources end exactly on the last point.
    fn raw(&self) -> f64 {
        let n = self.waveform.len();
        if n == 1 {
            return self.waveform[0] as f64 / LFO_PEAK as f64;
        }
        let (pos, wrap) = if self.once {
            (self.phase * (n - 1) as f64, false)
        } else {
            (self.phase * n as f64, true)
        };
        let i = (pos.floor() as usize).min(n - 1);
        let j = if wrap { (i + 1) % n } else { (i + 1).min(n - 1) };
        let frac = pos - i as f64;
        let a = self.waveform[i] as f64;
        let b = self.waveform[j] as f64;
        (a + (b - a) * frac) / LFO_PEAK as f64
    }
}
