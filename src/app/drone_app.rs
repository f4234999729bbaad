//! Drone synth app
//!
//! Two knobs edit the (center, spread) point of whichever pad is touched.
//! Each pad remembers its own point, and touching a pad re-anchors the knob
//! scalers on it so nothing jumps. Pressing the key while touching a pad
//! mutes or unmutes that voice; holding the key glides every voice toward
//! voice 0.

use log::{debug, info, warn};

use super::input::InputEvent;
use super::scheduler::TickHost;
use crate::drone::DroneController;
use crate::mapping::{ParamScaler, ScalerRange};
use crate::synth::SynthEngine;

/// App behaviour knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DroneAppSettings {
    pub range: ScalerRange,
    pub dead_zone: f64,
    /// Key hold time before voices start converging
    pub hold_secs: f64,
    /// Fraction of the gap closed per control tick while converging
    pub converge_rate: f64,
}

impl Default for DroneAppSettings {
    fn default() -> Self {
        Self {
            range: ScalerRange::default(),
            dead_zone: 1.0,
            hold_secs: 1.0,
            converge_rate: 0.01,
        }
    }
}

pub struct DroneApp<E: SynthEngine> {
    drone: DroneController<E>,
    settings: DroneAppSettings,
    knobs: [f64; 2],
    scalers: [ParamScaler; 2],
    /// Per-voice (center, spread) as last left by the knobs
    saved: Vec<[f64; 2]>,
    touched: Option<usize>,
    key_held_for: Option<f64>,
    status: String,
}

impl<E: SynthEngine> DroneApp<E> {
    pub fn new(drone: DroneController<E>, settings: DroneAppSettings) -> Self {
        let saved: Vec<[f64; 2]> = (0..drone.voice_count())
            .filter_map(|i| drone.pair(i).map(|p| [p.center(), p.spread()]))
            .collect();
        let knob = settings.range.knob_min;
        let scaler = ParamScaler::with_range(0.0, knob, settings.range).with_dead_zone(settings.dead_zone);
        Self {
            drone,
            settings,
            knobs: [knob; 2],
            scalers: [scaler.clone(), scaler],
            saved,
            touched: None,
            key_held_for: None,
            status: String::new(),
        }
    }

    pub fn drone(&self) -> &DroneController<E> {
        &self.drone
    }

    pub fn drone_mut(&mut self) -> &mut DroneController<E> {
        &mut self.drone
    }

    pub fn touched(&self) -> Option<usize> {
        self.touched
    }

    /// Saved (center, spread) of a voice
    pub fn saved(&self, voice: usize) -> Option<[f64; 2]> {
        self.saved.get(voice).copied()
    }

    pub fn scalers(&self) -> &[ParamScaler; 2] {
        &self.scalers
    }

    /// Last display line
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Latest raw knob positions
    pub fn set_knobs(&mut self, knobs: [f64; 2]) {
        self.knobs = knobs;
    }

    pub fn on_pad(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pressed(i) => {
                let Some(&[center, spread]) = self.saved.get(i) else {
                    warn!("pad {} has no drone voice", i);
                    return;
                };
                self.touched = Some(i);
                self.scalers[0].reset(Some(center), Some(self.knobs[0]));
                self.scalers[1].reset(Some(spread), Some(self.knobs[1]));
                debug!("editing voice {} from {:.1}/{:.1}", i, center, spread);
            }
            InputEvent::Released(i) => {
                if self.touched != Some(i) {
                    return;
                }
                if let Some(saved) = self.saved.get_mut(i) {
                    *saved = [self.scalers[0].value(), self.scalers[1].value()];
                }
                self.touched = None;
            }
            InputEvent::Held(..) => {}
        }
    }

    pub fn on_key(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pressed(_) => {
                self.key_held_for = Some(0.0);
                if let Some(voice) = self.touched {
                    self.drone.toggle_voice_mute(voice);
                }
            }
            InputEvent::Released(_) => self.key_held_for = None,
            InputEvent::Held(..) => {}
        }
    }

    fn converge(&mut self) {
        self.drone.converge_frequencies(0, self.settings.converge_rate);
        for (saved, center) in self.saved.iter_mut().zip(self.drone.center_values()) {
            saved[0] = center;
        }
    }
}

impl<E: SynthEngine> TickHost for DroneApp<E> {
    fn on_control_tick(&mut self, dt: f64) {
        if let Some(voice) = self.touched {
            let center = self.scalers[0].update(self.knobs[0]);
            let spread = self.scalers[1].update(self.knobs[1]);
            self.drone.set_voice_frequencies(voice, center, spread);
        }

        if let Some(held) = self.key_held_for.as_mut() {
            *held += dt;
            if *held > self.settings.hold_secs {
                self.converge();
            }
        }

        self.drone.engine_mut().advance(dt);
    }

    fn on_display_tick(&mut self) {
        let status = match self.touched.and_then(|i| self.drone.pair(i).map(|p| (i, p))) {
            Some((i, pair)) => format!(
                "voice {} {:.1}/{:.1} {}",
                i,
                pair.center(),
                pair.spread(),
                if pair.is_muted() { "muted" } else { "on" }
            ),
            None => format!("dronesynth {} voices", self.drone.voice_count()),
        };
        if status != self.status {
            info!("{}", status);
            self.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drone::DroneSettings;
    use crate::synth::HeadlessEngine;

    fn app() -> DroneApp<HeadlessEngine> {
        let drone = DroneController::new(HeadlessEngine::new(25600.0), DroneSettings::default());
        DroneApp::new(drone, DroneAppSettings::default())
    }

    #[test]
    fn test_touch_anchors_saved_values() {
        let mut app = app();
        app.set_knobs([10.0, 200.0]);
        app.on_pad(InputEvent::Pressed(1));

        assert_eq!(app.touched(), Some(1));
        assert_eq!(app.scalers()[0].value(), 127.5);
        assert_eq!(app.scalers()[0].last_control_position(), 10.0);
        assert_eq!(app.scalers()[1].value(), 0.0);

        // knobs still: nothing moves
        app.on_control_tick(0.01);
        assert_eq!(app.drone().pair(1).unwrap().center(), 127.5);
    }

    #[test]
    fn test_knobs_move_touched_voice_only() {
        let mut app = app();
        app.set_knobs([127.0, 0.0]);
        app.on_pad(InputEvent::Pressed(2));
        app.set_knobs([140.0, 0.0]);
        app.on_control_tick(0.01);

        let center = app.drone().pair(2).unwrap().center();
        assert!(center > 127.5);
        assert_eq!(app.drone().pair(0).unwrap().center(), 127.5);

        app.on_pad(InputEvent::Released(2));
        assert_eq!(app.touched(), None);
        assert_eq!(app.saved(2).unwrap()[0], center);
    }

    #[test]
    fn test_key_with_pad_toggles_mute() {
        let mut app = app();
        app.on_pad(InputEvent::Pressed(3));
        app.on_key(InputEvent::Pressed(0));
        assert!(app.drone().pair(3).unwrap().is_muted());
        app.on_key(InputEvent::Released(0));
        app.on_key(InputEvent::Pressed(0));
        assert!(!app.drone().pair(3).unwrap().is_muted());
    }

    #[test]
    fn test_key_hold_converges() {
        let mut app = app();
        app.drone_mut().set_voice_frequencies(0, 96.0, 0.0);
        app.drone_mut().set_voice_frequencies(1, 192.0, 0.0);

        app.on_key(InputEvent::Pressed(0));
        for _ in 0..90 {
            app.on_control_tick(0.01);
        }
        // not held long enough yet
        assert_eq!(app.drone().pair(1).unwrap().center(), 192.0);

        for _ in 0..60 {
            app.on_control_tick(0.01);
        }
        let center = app.drone().pair(1).unwrap().center();
        assert!(center < 192.0 && center > 96.0);
        assert_eq!(app.saved(1).unwrap()[0], center);

        app.on_key(InputEvent::Released(0));
        app.on_control_tick(0.01);
        assert_eq!(app.drone().pair(1).unwrap().center(), center);
    }

    #[test]
    fn test_unknown_pad_ignored() {
        let mut app = app();
        app.on_pad(InputEvent::Pressed(7));
        assert_eq!(app.touched(), None);
    }

    #[test]
    fn test_display_status() {
        let mut app = app();
        app.on_display_tick();
        assert_eq!(app.status(), "dronesynth 4 voices");
        app.on_pad(InputEvent::Pressed(0));
        app.on_display_tick();
        assert_eq!(app.status(), "voice 0 127.5/0.0 on");
    }
}
