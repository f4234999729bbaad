//! Amplitude envelope parameters
//!
//! A plain value object. The synthesis engine turns it into its own envelope
//! object each time a voice starts, so patch edits never touch a cached one.

use serde::{Deserialize, Serialize};

/// Attack-Decay-Sustain-Release envelope settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvParams {
    /// Seconds to reach `attack_level`
    pub attack_time: f64,
    /// Seconds to fall to `sustain_level`
    pub decay_time: f64,
    /// Seconds to fade out after release
    pub release_time: f64,
    pub attack_level: f64,
    pub sustain_level: f64,
}

impl Default for EnvParams {
    fn default() -> Self {
        Self {
            attack_time: 0.1,
            decay_time: 0.01,
            release_time: 0.2,
            attack_level: 1.0,
            sustain_level: 1.0,
        }
    }
}

impl EnvParams {
    /// Create envelope settings, clamping times and levels
    pub fn new(attack: f64, decay: f64, release: f64, attack_level: f64, sustain_level: f64) -> Self {
        let mut env = Self::default();
        env.configure(attack, decay, release, attack_level, sustain_level);
        env
    }

    /// Set attack time in seconds
    pub fn set_attack(&mut self, seconds: f64) {
        self.attack_time = seconds.max(0.0);
    }

    /// Set decay time in seconds
    pub fn set_decay(&mut self, seconds: f64) {
        self.decay_time = seconds.max(0.0);
    }

    /// Set release time in seconds
    pub fn set_release(&mut self, seconds: f64) {
        self.release_time = seconds.max(0.0);
    }

    /// Set peak level (0.0-1.0)
    pub fn set_attack_level(&mut self, level: f64) {
        self.attack_level = level.clamp(0.0, 1.0);
    }

    /// Set sustain level (0.0-1.0)
    pub fn set_sustain_level(&mut self, level: f64) {
        self.sustain_level = level.clamp(0.0, 1.0);
    }

    /// Configure all parameters at once
    pub fn configure(&mut self, attack: f64, decay: f64, release: f64, attack_level: f64, sustain_level: f64) {
        self.set_attack(attack);
        self.set_decay(decay);
        self.set_release(release);
        self.set_attack_level(attack_level);
        self.set_sustain_level(sustain_level);
    }

    /// Copy with every field forced into range
    pub fn sanitized(&self) -> Self {
        Self::new(
            self.attack_time,
            self.decay_time,
            self.release_time,
            self.attack_level,
            self.sustain_level,
        )
    }
}
