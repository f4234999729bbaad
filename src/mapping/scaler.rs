//! Knob pickup
//!
//! When a physical knob starts editing a parameter whose stored value does
//! not match the knob's position, jumping straight to the knob would cause
//! an audible step. `ParamScaler` instead moves the value in the direction
//! the knob turns, by the knob's share of its remaining travel applied to
//! the value's remaining travel. Knob and value meet exactly at the knob's
//! end stops, and once they meet the value follows the knob 1:1.

use log::trace;
use serde::{Deserialize, Serialize};

/// Distance under which value and knob count as matched
pub const MATCH_TOLERANCE: f64 = 0.5;

/// Knob and value domains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerRange {
    pub knob_min: f64,
    pub knob_max: f64,
    pub value_min: f64,
    pub value_max: f64,
}

impl Default for ScalerRange {
    fn default() -> Self {
        Self {
            knob_min: 0.0,
            knob_max: 255.0,
            value_min: 0.0,
            value_max: 255.0,
        }
    }
}

/// Knob-pickup state for one parameter axis
#[derive(Debug, Clone, PartialEq)]
pub struct ParamScaler {
    value: f64,
    last_control_position: f64,
    dead_zone: f64,
    range: ScalerRange,
    matched: bool,
}

impl ParamScaler {
    /// New scaler on the default 0-255 domains
    pub fn new(value: f64, control_position: f64) -> Self {
        Self::with_range(value, control_position, ScalerRange::default())
    }

    pub fn with_range(value: f64, control_position: f64, range: ScalerRange) -> Self {
        Self {
            value: value.clamp(range.value_min, range.value_max),
            last_control_position: control_position.clamp(range.knob_min, range.knob_max),
            dead_zone: 1.0,
            range,
            matched: false,
        }
    }

    pub fn with_dead_zone(mut self, dead_zone: f64) -> Self {
        self.dead_zone = dead_zone.max(0.0);
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn last_control_position(&self) -> f64 {
        self.last_control_position
    }

    pub fn dead_zone(&self) -> f64 {
        self.dead_zone
    }

    pub fn range(&self) -> ScalerRange {
        self.range
    }

    /// Whether the value has caught up with the knob
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    /// Re-anchor the value and/or knob position, e.g. when the knob starts
    /// editing a different parameter. `None` leaves that field alone.
    pub fn reset(&mut self, value: Option<f64>, control_position: Option<f64>) {
        if let Some(v) = value {
            self.value = v.clamp(self.range.value_min, self.range.value_max);
        }
        if let Some(p) = control_position {
            self.last_control_position = p.clamp(self.range.knob_min, self.range.knob_max);
        }
        self.matched = false;
    }

    /// Feed a new knob position and get the value to use
    pub fn update(&mut self, control_position: f64) -> f64 {
        let r = self.range;
        let position = control_position.clamp(r.knob_min, r.knob_max);
        let delta = position - self.last_control_position;

        if delta == 0.0 || delta.abs() < self.dead_zone {
            return self.value;
        }
        self.last_control_position = position;

        let target = map_knob(position, &r);
        let mut next = if self.matched {
            target
        } else if delta > 0.0 {
            let knob_runway = r.knob_max - position;
            if knob_runway <= 0.0 {
                r.value_max
            } else {
                self.value + delta / knob_runway * (r.value_max - self.value)
            }
        } else {
            let knob_runway = position - r.knob_min;
            if knob_runway <= 0.0 {
                r.value_min
            } else {
                self.value + delta / knob_runway * (self.value - r.value_min)
            }
        };

        if !self.matched && (next - target).abs() <= MATCH_TOLERANCE {
            self.matched = true;
            next = target;
        }

        // never step against the knob
        next = if delta > 0.0 {
            next.max(self.value)
        } else {
            next.min(self.value)
        };
        self.value = next.clamp(r.value_min, r.value_max);

        trace!(
            "scaler knob:{:.1} delta:{:.1} value:{:.2} matched:{}",
            position,
            delta,
            self.value,
            self.matched
        );
        self.value
    }
}

fn map_knob(position: f64, r: &ScalerRange) -> f64 {
    super::map_range(position, r.knob_min, r.knob_max, r.value_min, r.value_max)
}
