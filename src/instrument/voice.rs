//! One sounding note

use crate::synth::{EnvelopeHandle, ModHandle, OscHandle};

/// The engine objects behind one note: a primary oscillator, an optional
/// detuned secondary sharing its envelope and waveform buffer, and the
/// one-shot modulation source standing in for a filter envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub(crate) note: u8,
    pub(crate) velocity: u8,
    pub(crate) frequency: f64,
    pub(crate) level: f64,
    pub(crate) primary: OscHandle,
    pub(crate) secondary: Option<OscHandle>,
    pub(crate) filter_env: ModHandle,
    pub(crate) amp_env: EnvelopeHandle,
}

impl Voice {
    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Primary oscillator frequency in Hz
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Amplitude applied to the oscillators (0.0-1.0)
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn primary(&self) -> OscHandle {
        self.primary
    }

    pub fn secondary(&self) -> Option<OscHandle> {
        self.secondary
    }

    pub fn filter_env(&self) -> ModHandle {
        self.filter_env
    }

    pub fn amp_env(&self) -> EnvelopeHandle {
        self.amp_env
    }

    /// Every oscillator of this voice, primary first
    pub fn oscillators(&self) -> Vec<OscHandle> {
        std::iter::once(self.primary).chain(self.secondary).collect()
    }
}

/// Amplitude for a MIDI velocity
pub fn velocity_level(velocity: u8) -> f64 {
    f64::from(velocity.min(127)) / 127.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oscillators_order() {
        let voice = Voice {
            note: 60,
            velocity: 127,
            frequency: 261.6,
            level: 1.0,
            primary: OscHandle(3),
            secondary: Some(OscHandle(4)),
            filter_env: ModHandle(5),
            amp_env: EnvelopeHandle(2),
        };
        assert_eq!(voice.oscillators(), vec![OscHandle(3), OscHandle(4)]);

        let single = Voice { secondary: None, ..voice };
        assert_eq!(single.oscillators(), vec![OscHandle(3)]);
    }

    #[test]
    fn test_velocity_level() {
        assert_eq!(velocity_level(127), 1.0);
        assert_eq!(velocity_level(0), 0.0);
        assert_eq!(velocity_level(200), 1.0);
        assert!((velocity_level(64) - 0.5039).abs() < 1e-3);
    }
}
