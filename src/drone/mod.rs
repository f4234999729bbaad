//! Drone controller
//!
//! A fixed set of always-sounding oscillator pairs. Each pair's pitch comes
//! from a (center, spread) control point run through `DroneMapping`; nothing
//! is triggered or released while the controller lives. Every oscillator
//! also gets a slow pitch LFO with its own starting phase so the pairs drift
//! against each other.

mod mapping;

pub use mapping::DroneMapping;

use log::{debug, trace, warn};

use crate::patch::FilterKind;
use crate::synth::{
    hz_to_midi, make_waveform, FilterSpec, LfoParams, ModHandle, OscHandle, Sample, SharedWave,
    SynthEngine, Waveform,
};

/// Everything a drone controller is built with
#[derive(Debug, Clone, PartialEq)]
pub struct DroneSettings {
    pub voices: usize,
    pub mapping: DroneMapping,
    pub wave: Waveform,
    pub wave_size: usize,
    pub wave_amplitude: Sample,
    pub filter: FilterKind,
    pub filter_f: f64,
    pub filter_q: f64,
    pub pitch_lfo_rate: f64,
    /// Pitch LFO depth in octaves
    pub pitch_lfo_scale: f64,
}

impl Default for DroneSettings {
    fn default() -> Self {
        Self {
            voices: 4,
            mapping: DroneMapping::default(),
            wave: Waveform::Saw,
            wave_size: 256,
            wave_amplitude: 20000,
            filter: FilterKind::LowPass,
            filter_f: 2000.0,
            filter_q: 0.7,
            pitch_lfo_rate: 0.1,
            pitch_lfo_scale: 0.02,
        }
    }
}

/// One always-on oscillator pair
#[derive(Debug, Clone, PartialEq)]
pub struct DronePair {
    oscillators: [OscHandle; 2],
    pitch_lfos: [ModHandle; 2],
    center: f64,
    spread: f64,
    frequencies: [f64; 2],
    level: f64,
    muted: bool,
}

impl DronePair {
    pub fn oscillators(&self) -> [OscHandle; 2] {
        self.oscillators
    }

    pub fn pitch_lfos(&self) -> [ModHandle; 2] {
        self.pitch_lfos
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn spread(&self) -> f64 {
        self.spread
    }

    pub fn frequencies(&self) -> [f64; 2] {
        self.frequencies
    }

    /// Level restored when unmuted
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn amplitude(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }
}

/// Always-on drone voices driven by continuous controls
pub struct DroneController<E: SynthEngine> {
    engine: E,
    settings: DroneSettings,
    waveform: SharedWave,
    filter: Option<FilterSpec>,
    pairs: Vec<DronePair>,
}

impl<E: SynthEngine> DroneController<E> {
    /// Create and press every pair. All pairs start at mid-range center
    /// with zero spread.
    pub fn new(mut engine: E, settings: DroneSettings) -> Self {
        let waveform = SharedWave::new(make_waveform(
            settings.wave,
            settings.wave_size,
            settings.wave_amplitude,
        ));
        let filter = make_filter(&engine, settings.filter, settings.filter_f, settings.filter_q);

        let mapping = &settings.mapping;
        let center = (mapping.control_min + mapping.control_max) / 2.0;
        let spread = mapping.control_min;
        let (f1, f2) = mapping.frequencies(center, spread);

        let lfo_count = (settings.voices * 2).max(1) as f64;
        let mut pairs = Vec::with_capacity(settings.voices);
        for i in 0..settings.voices {
            let mut oscillators = [OscHandle(0); 2];
            let mut pitch_lfos = [ModHandle(0); 2];
            for (j, freq) in [f1, f2].into_iter().enumerate() {
                let phase = (i * 2 + j) as f64 / lfo_count;
                let lfo = engine.create_modulation(
                    &LfoParams::looping(settings.pitch_lfo_rate, settings.pitch_lfo_scale, 0.0)
                        .with_phase_offset(phase),
                );
                let osc = engine.create_oscillator(freq, &waveform, None, filter);
                engine.set_bend(osc, Some(lfo));
                engine.attach(lfo);
                oscillators[j] = osc;
                pitch_lfos[j] = lfo;
            }
            engine.press(&oscillators);
            pairs.push(DronePair {
                oscillators,
                pitch_lfos,
                center,
                spread,
                frequencies: [f1, f2],
                level: 1.0,
                muted: false,
            });
        }

        debug!("drone started with {} voices at {:.2}/{:.2} Hz", settings.voices, f1, f2);
        Self {
            engine,
            settings,
            waveform,
            filter,
            pairs,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn settings(&self) -> &DroneSettings {
        &self.settings
    }

    pub fn mapping(&self) -> &DroneMapping {
        &self.settings.mapping
    }

    pub fn waveform(&self) -> &SharedWave {
        &self.waveform
    }

    pub fn filter(&self) -> Option<FilterSpec> {
        self.filter
    }

    pub fn voice_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn pair(&self, voice: usize) -> Option<&DronePair> {
        self.pairs.get(voice)
    }

    /// Point a voice at a new (center, spread) control point. Frequencies
    /// glide; nothing is retriggered.
    pub fn set_voice_frequencies(&mut self, voice: usize, center: f64, spread: f64) {
        let mapping = &self.settings.mapping;
        let (center, spread) = (mapping.clamp_control(center), mapping.clamp_control(spread));
        let Some(pair) = self.pairs.get_mut(voice) else {
            warn!("no drone voice {}", voice);
            return;
        };
        pair.center = center;
        pair.spread = spread;
        apply_frequencies(&mut self.engine, mapping, pair);
    }

    /// Set a voice from two note numbers. The notes are turned back into a
    /// control point, so they are limited to what the controls can reach.
    pub fn set_voice_notes(&mut self, voice: usize, notes: [f64; 2]) {
        let mapping = &self.settings.mapping;
        let center = mapping.center_for_note(notes[0]);
        let spread = mapping.spread_for_detune(notes[1] - mapping.note_for(center));
        self.set_voice_frequencies(voice, center, spread);
    }

    /// Set a voice pair from frequencies in Hz
    pub fn set_voice_hz(&mut self, voice: usize, hz: [f64; 2]) {
        self.set_voice_notes(voice, [hz_to_midi(hz[0]), hz_to_midi(hz[1])]);
    }

    /// Flip a voice between silent and its level
    pub fn toggle_voice_mute(&mut self, voice: usize) {
        let Some(pair) = self.pairs.get_mut(voice) else {
            warn!("no drone voice {}", voice);
            return;
        };
        pair.muted = !pair.muted;
        debug!("drone voice {} {}", voice, if pair.muted { "muted" } else { "unmuted" });
        for osc in pair.oscillators {
            self.engine.set_amplitude(osc, pair.amplitude());
        }
    }

    /// Set a voice's level (0.0-1.0). A muted voice stays silent until
    /// unmuted.
    pub fn set_voice_level(&mut self, voice: usize, level: f64) {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        let Some(pair) = self.pairs.get_mut(voice) else {
            warn!("no drone voice {}", voice);
            return;
        };
        pair.level = level;
        for osc in pair.oscillators {
            self.engine.set_amplitude(osc, pair.amplitude());
        }
    }

    /// Move every other voice's center a fraction `rate` of the way to the
    /// target voice's center and re-derive its frequencies. Call repeatedly
    /// to glide everything to unison with the target.
    pub fn converge_frequencies(&mut self, target: usize, rate: f64) {
        let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        let Some(goal) = self.pairs.get(target).map(|p| p.center) else {
            warn!("no drone voice {} to converge on", target);
            return;
        };
        let mapping = &self.settings.mapping;
        for (i, pair) in self.pairs.iter_mut().enumerate() {
            if i == target {
                continue;
            }
            // rate*goal + (1-rate)*center
            pair.center += rate * (goal - pair.center);
            apply_frequencies(&mut self.engine, mapping, pair);
        }
        trace!("converged toward voice {} at rate {}", target, rate);
    }

    /// Depth of every pitch LFO, in octaves
    pub fn set_pitch_lfo_amount(&mut self, scale: f64) {
        for pair in &self.pairs {
            for lfo in pair.pitch_lfos {
                self.engine.set_modulation_scale(lfo, scale);
            }
        }
    }

    /// Replace the filter on every oscillator
    pub fn set_filter(&mut self, kind: FilterKind, cutoff: f64, q: f64) {
        self.settings.filter = kind;
        self.settings.filter_f = cutoff;
        self.settings.filter_q = q;
        self.filter = make_filter(&self.engine, kind, cutoff, q);
        for pair in &self.pairs {
            for osc in pair.oscillators {
                self.engine.set_filter(osc, self.filter);
            }
        }
    }

    /// Current (unbent) frequencies of every pair
    pub fn frequencies(&self) -> Vec<[f64; 2]> {
        self.pairs.iter().map(|p| p.frequencies).collect()
    }

    pub fn center_values(&self) -> Vec<f64> {
        self.pairs.iter().map(|p| p.center).collect()
    }

    /// One line per voice: `0: 65.41, 65.45`
    pub fn frequency_report(&self) -> String {
        self.pairs
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}: {:.2}, {:.2}", i, p.frequencies[0], p.frequencies[1]))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn apply_frequencies<E: SynthEngine>(engine: &mut E, mapping: &DroneMapping, pair: &mut DronePair) {
    let (f1, f2) = mapping.frequencies(pair.center, pair.spread);
    pair.frequencies = [f1, f2];
    engine.set_frequency(pair.oscillators[0], f1);
    engine.set_frequency(pair.oscillators[1], f2);
}

fn make_filter<E: SynthEngine>(engine: &E, kind: FilterKind, cutoff: f64, q: f64) -> Option<FilterSpec> {
    let filter_type = kind.filter_type();
    if filter_type.is_none() {
        debug!("drone running unfiltered");
    }
    filter_type.map(|t| engine.filter(t, cutoff, q))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{FilterType, HeadlessEngine};

    fn drone() -> DroneController<HeadlessEngine> {
        DroneController::new(HeadlessEngine::new(25600.0), DroneSettings::default())
    }

    #[test]
    fn test_new_presses_every_pair() {
        let drone = drone();
        assert_eq!(drone.voice_count(), 4);
        assert_eq!(drone.engine().sounding(), 8);
        assert_eq!(drone.engine().press_calls(), 4);
        assert_eq!(drone.engine().attached().len(), 8);

        let pair = drone.pair(0).unwrap();
        let osc = drone.engine().oscillator(pair.oscillators()[0]).unwrap();
        assert!(osc.waveform.ptr_eq(drone.waveform()));
        assert_eq!(osc.filter.unwrap().filter_type(), FilterType::LowPass);
        assert_eq!(osc.bend, Some(pair.pitch_lfos()[0]));
    }

    #[test]
    fn test_pitch_lfo_phases_differ() {
        let drone = drone();
        let a = drone.engine().modulation(drone.pair(0).unwrap().pitch_lfos()[1]).unwrap();
        let b = drone.engine().modulation(drone.pair(1).unwrap().pitch_lfos()[0]).unwrap();
        assert_ne!(a.phase(), b.phase());
    }

    #[test]
    fn test_set_voice_frequencies() {
        let mut drone = drone();
        drone.set_voice_frequencies(2, 96.0, 0.0);

        let pair = drone.pair(2).unwrap();
        let [f1, f2] = pair.frequencies();
        assert!((f1 - 65.406).abs() < 1e-3);
        assert!((f2 - f1) < 0.01);
        assert_eq!(drone.engine().oscillator(pair.oscillators()[0]).unwrap().frequency, f1);
        assert_eq!(drone.engine().oscillator(pair.oscillators()[1]).unwrap().frequency, f2);
        assert_eq!(drone.engine().press_calls(), 4);
    }

    #[test]
    fn test_unknown_voice_is_ignored() {
        let mut drone = drone();
        let before = drone.frequencies();
        drone.set_voice_frequencies(9, 10.0, 10.0);
        drone.toggle_voice_mute(9);
        drone.converge_frequencies(9, 0.5);
        assert_eq!(drone.frequencies(), before);
    }

    #[test]
    fn test_toggle_mute() {
        let mut drone = drone();
        let [a, b] = drone.pair(1).unwrap().oscillators();

        drone.toggle_voice_mute(1);
        assert_eq!(drone.engine().oscillator(a).unwrap().amplitude, 0.0);
        assert_eq!(drone.engine().oscillator(b).unwrap().amplitude, 0.0);

        drone.toggle_voice_mute(1);
        assert_eq!(drone.engine().oscillator(a).unwrap().amplitude, 1.0);
        assert!(!drone.pair(1).unwrap().is_muted());
    }

    #[test]
    fn test_level_survives_mute() {
        let mut drone = drone();
        let [a, _] = drone.pair(0).unwrap().oscillators();
        drone.set_voice_level(0, 0.4);
        drone.toggle_voice_mute(0);
        drone.set_voice_level(0, 0.6);
        assert_eq!(drone.engine().oscillator(a).unwrap().amplitude, 0.0);
        drone.toggle_voice_mute(0);
        assert_eq!(drone.engine().oscillator(a).unwrap().amplitude, 0.6);
    }

    #[test]
    fn test_converge_monotonic_without_overshoot() {
        let mut drone = drone();
        let mapping = drone.mapping().clone();
        for (i, note) in [36.0, 48.0, 36.0, 60.0].into_iter().enumerate() {
            drone.set_voice_frequencies(i, mapping.center_for_note(note), 0.0);
        }
        let target = drone.center_values()[0];

        let mut previous = drone.center_values();
        for _ in 0..1000 {
            drone.converge_frequencies(0, 0.05);
            let current = drone.center_values();
            assert_eq!(current[0], target);
            for i in 1..4 {
                let before = (previous[i] - target).abs();
                let after = (current[i] - target).abs();
                assert!(after <= before, "voice {} moved away", i);
                // never crosses the target
                assert!((previous[i] - target) * (current[i] - target) >= 0.0);
            }
            previous = current;
        }

        for center in drone.center_values() {
            assert!((center - target).abs() < 1e-9);
        }
        let freqs = drone.frequencies();
        for pair in &freqs[1..] {
            assert!((pair[0] - freqs[0][0]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_set_voice_notes() {
        let mut drone = drone();
        drone.set_voice_notes(0, [48.0, 55.0]);
        let pair = drone.pair(0).unwrap();
        assert!((pair.center() - 144.0).abs() < 1e-9);

        let (n1, n2) = drone.mapping().notes(pair.center(), pair.spread());
        assert!((n1 - 48.0).abs() < 1e-9);
        assert!((n2 - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_pitch_lfo_amount() {
        let mut drone = drone();
        drone.set_pitch_lfo_amount(0.5);
        for pair in [drone.pair(0).unwrap(), drone.pair(3).unwrap()] {
            for lfo in pair.pitch_lfos() {
                assert_eq!(drone.engine().modulation(lfo).unwrap().scale(), 0.5);
            }
        }
    }

    #[test]
    fn test_set_filter() {
        let mut drone = drone();
        drone.set_filter(FilterKind::HighPass, 400.0, 2.0);
        let [a, b] = drone.pair(2).unwrap().oscillators();
        for osc in [a, b] {
            let filter = drone.engine().oscillator(osc).unwrap().filter.unwrap();
            assert_eq!(filter.filter_type(), FilterType::HighPass);
            assert_eq!(filter.cutoff(), 400.0);
        }

        drone.set_filter(FilterKind::None, 400.0, 2.0);
        assert!(drone.engine().oscillator(a).unwrap().filter.is_none());
    }

    #[test]
    fn test_frequency_report() {
        let mut drone = drone();
        drone.set_voice_frequencies(0, 96.0, 0.0);
        let report = drone.frequency_report();
        assert_eq!(report.lines().count(), 4);
        assert!(report.starts_with("0: 65.41, 65.41"));
    }
}
