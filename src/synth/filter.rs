//! Biquad filter specifications
//!
//! A `FilterSpec` is the immutable filter object assigned to oscillators: its
//! type, cutoff and Q, plus the normalized biquad coefficients an engine
//! renders with. A fresh spec is built for every voice on every control tick.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Lowest cutoff a filter will accept
pub const MIN_CUTOFF_HZ: f64 = 20.0;

/// Filter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
}

/// Biquad filter coefficients, normalized by a0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Default for Coefficients {
    fn default() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

/// A ready-to-use filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    filter_type: FilterType,
    sample_rate: f64,
    cutoff: f64,
    resonance: f64,
    coeffs: Coefficients,
}

impl FilterSpec {
    /// Build a filter. Cutoff is clamped to 20 Hz..Nyquist/2 and Q to
    /// 0.01..20 so the coefficients stay stable.
    pub fn new(filter_type: FilterType, sample_rate: f64, cutoff: f64, resonance: f64) -> Self {
        let max_cutoff = (sample_rate / 4.0).max(MIN_CUTOFF_HZ);
        let cutoff = if cutoff.is_nan() { MIN_CUTOFF_HZ } else { cutoff.clamp(MIN_CUTOFF_HZ, max_cutoff) };
        let resonance = if resonance.is_nan() { 0.707 } else { resonance.clamp(0.01, 20.0) };

        let mut spec = Self {
            filter_type,
            sample_rate,
            cutoff,
            resonance,
            coeffs: Coefficients::default(),
        };
        spec.calculate_coefficients();
        spec
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Cutoff frequency in Hz after clamping
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Q factor after clamping
    pub fn resonance(&self) -> f64 {
        self.resonance
    }

    pub fn coefficients(&self) -> Coefficients {
        self.coeffs
    }

    /// Magnitude response at `hz`
    pub fn gain_at(&self, hz: f64) -> f64 {
        let w = 2.0 * PI * hz / self.sample_rate;
        let c = self.coeffs;
        // H(z) evaluated on the unit circle, z^-1 = e^{-jw}
        let (c1, s1) = (w.cos(), -w.sin());
        let (c2, s2) = ((2.0 * w).cos(), -(2.0 * w).sin());
        let num_re = c.b0 + c.b1 * c1 + c.b2 * c2;
        let num_im = c.b1 * s1 + c.b2 * s2;
        let den_re = 1.0 + c.a1 * c1 + c.a2 * c2;
        let den_im = c.a1 * s1 + c.a2 * s2;
        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }

    fn calculate_coefficients(&mut self) {
        let omega = 2.0 * PI * self.cutoff / self.sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * self.resonance);

        let (b0, b1, b2) = match self.filter_type {
            FilterType::LowPass => {
                let b1 = 1.0 - cos_omega;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterType::HighPass => {
                let b1 = -(1.0 + cos_omega);
                (-b1 / 2.0, b1, -b1 / 2.0)
            }
            FilterType::BandPass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        self.coeffs = Coefficients {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        };
    }
}
