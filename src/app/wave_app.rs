//! Wave synth app
//!
//! Pads play notes through an `Instrument`. Tapping the key cycles what the
//! two knobs edit; holding the key and touching a pad loads that pad's
//! patch instead of playing it. Pad pressure sets the held note's level.

use std::collections::BTreeSet;
use std::fmt;

use log::{debug, info, warn};

use super::input::{pressure_level, InputEvent};
use super::scheduler::TickHost;
use crate::instrument::Instrument;
use crate::mapping::{map_range, ParamScaler, ScalerRange};
use crate::patch::{builtin_wave_selects, FilterKind, Patch, WaveSelect};
use crate::synth::SynthEngine;

/// Detune knob span (secondary oscillator ratio)
const DETUNE_RANGE: (f64, f64) = (1.0, 1.1);
/// Wave LFO amount knob span, in waves
const WAVE_LFO_RANGE: (f64, f64) = (0.0, 4.0);
const FILTER_F_RANGE: (f64, f64) = (20.0, 8000.0);
const FILTER_Q_RANGE: (f64, f64) = (0.1, 4.0);
/// Filter envelope attack knob span in seconds
const FILTER_ATTACK_RANGE: (f64, f64) = (0.0, 2.0);

/// What the two knobs are editing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KnobMode {
    /// Wave selection and wave mix
    #[default]
    Wave,
    /// Detune and wave LFO amount
    Detune,
    /// Filter cutoff and resonance
    Filter,
    /// Filter type and filter envelope attack
    FilterEnv,
}

impl KnobMode {
    pub fn next(self) -> Self {
        match self {
            KnobMode::Wave => KnobMode::Detune,
            KnobMode::Detune => KnobMode::Filter,
            KnobMode::Filter => KnobMode::FilterEnv,
            KnobMode::FilterEnv => KnobMode::Wave,
        }
    }
}

impl fmt::Display for KnobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KnobMode::Wave => "wave",
            KnobMode::Detune => "detune",
            KnobMode::Filter => "filter",
            KnobMode::FilterEnv => "filter env",
        };
        write!(f, "{}", name)
    }
}

/// App behaviour knobs
#[derive(Debug, Clone, PartialEq)]
pub struct WaveAppSettings {
    /// Note played by each pad
    pub pad_notes: Vec<u8>,
    pub range: ScalerRange,
    pub dead_zone: f64,
    /// Raw pressure reading treated as full level
    pub touch_pressure_max: u16,
    /// Choices for the wave knob
    pub wave_selects: Vec<WaveSelect>,
}

impl Default for WaveAppSettings {
    fn default() -> Self {
        Self {
            pad_notes: vec![40, 48, 52, 55],
            range: ScalerRange::default(),
            dead_zone: 1.0,
            touch_pressure_max: 1000,
            wave_selects: builtin_wave_selects(),
        }
    }
}

pub struct WaveApp<E: SynthEngine> {
    instrument: Instrument<E>,
    patches: Vec<Patch>,
    settings: WaveAppSettings,
    mode: KnobMode,
    knobs: [f64; 2],
    scalers: [ParamScaler; 2],
    /// Scaler values last written to the patch, per knob
    applied: [f64; 2],
    key_held: bool,
    patch_loaded_during_hold: bool,
    /// Pads whose current touch loaded a patch rather than a note
    loading_pads: BTreeSet<usize>,
    status: String,
}

impl<E: SynthEngine> WaveApp<E> {
    pub fn new(instrument: Instrument<E>, patches: Vec<Patch>, settings: WaveAppSettings) -> Self {
        let knob = settings.range.knob_min;
        let scaler = ParamScaler::with_range(0.0, knob, settings.range).with_dead_zone(settings.dead_zone);
        let mut app = Self {
            instrument,
            patches,
            settings,
            mode: KnobMode::default(),
            knobs: [knob; 2],
            scalers: [scaler.clone(), scaler],
            applied: [0.0; 2],
            key_held: false,
            patch_loaded_during_hold: false,
            loading_pads: BTreeSet::new(),
            status: String::new(),
        };
        app.anchor_scalers();
        app
    }

    pub fn instrument(&self) -> &Instrument<E> {
        &self.instrument
    }

    pub fn instrument_mut(&mut self) -> &mut Instrument<E> {
        &mut self.instrument
    }

    pub fn mode(&self) -> KnobMode {
        self.mode
    }

    pub fn scalers(&self) -> &[ParamScaler; 2] {
        &self.scalers
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_knobs(&mut self, knobs: [f64; 2]) {
        self.knobs = knobs;
    }

    pub fn on_pad(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pressed(i) => {
                if self.key_held {
                    self.patch_loaded_during_hold = true;
                    self.loading_pads.insert(i);
                    self.load_patch(i);
                } else if let Some(note) = self.pad_note(i) {
                    self.instrument.note_on(note, 127);
                }
            }
            InputEvent::Released(i) => {
                if self.loading_pads.remove(&i) {
                    return;
                }
                if let Some(note) = self.pad_note(i) {
                    self.instrument.note_off(note);
                }
            }
            InputEvent::Held(i, raw) => {
                if self.loading_pads.contains(&i) {
                    return;
                }
                let level = pressure_level(raw, self.settings.touch_pressure_max);
                if let Some(note) = self.pad_note(i) {
                    if self.instrument.voice(note).is_some() {
                        self.instrument.set_note_level(note, level);
                    }
                }
            }
        }
    }

    pub fn on_key(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pressed(_) => {
                self.key_held = true;
                self.patch_loaded_during_hold = false;
            }
            InputEvent::Released(_) => {
                self.key_held = false;
                if !self.patch_loaded_during_hold {
                    self.mode = self.mode.next();
                    info!("knob mode: {}", self.mode);
                    self.anchor_scalers();
                }
            }
            InputEvent::Held(..) => {}
        }
    }

    fn pad_note(&self, pad: usize) -> Option<u8> {
        let note = self.settings.pad_notes.get(pad).copied();
        if note.is_none() {
            warn!("pad {} has no note", pad);
        }
        note
    }

    fn load_patch(&mut self, index: usize) {
        let Some(patch) = self.patches.get(index).cloned() else {
            warn!("no patch {}", index);
            return;
        };
        match self.instrument.load_patch(patch) {
            Ok(()) => self.anchor_scalers(),
            Err(e) => warn!("cannot load patch {}: {}", index, e),
        }
    }

    /// Re-anchor both scalers on the current mode's parameter values
    fn anchor_scalers(&mut self) {
        let values = self.mode_values();
        for (i, scaler) in self.scalers.iter_mut().enumerate() {
            scaler.reset(Some(values[i]), Some(self.knobs[i]));
        }
        self.applied = [self.scalers[0].value(), self.scalers[1].value()];
        debug!("{} knobs anchored at {:.1}/{:.1}", self.mode, self.applied[0], self.applied[1]);
    }

    fn to_param(&self, value: f64, (lo, hi): (f64, f64)) -> f64 {
        let r = &self.settings.range;
        map_range(value, r.value_min, r.value_max, lo, hi)
    }

    fn to_value(&self, param: f64, (lo, hi): (f64, f64)) -> f64 {
        let r = &self.settings.range;
        map_range(param, lo, hi, r.value_min, r.value_max)
    }

    fn wave_index(&self) -> usize {
        let wave = &self.instrument.patch().wave;
        self.settings
            .wave_selects
            .iter()
            .position(|w| w == wave)
            .unwrap_or(0)
    }

    fn index_span(count: usize) -> (f64, f64) {
        (0.0, count.saturating_sub(1) as f64)
    }

    /// Current parameters of this mode, in the scaler value domain
    fn mode_values(&self) -> [f64; 2] {
        let patch = self.instrument.patch();
        match self.mode {
            KnobMode::Wave => [
                self.to_value(
                    self.wave_index() as f64,
                    Self::index_span(self.settings.wave_selects.len()),
                ),
                self.to_value(patch.wave_mix(), (0.0, 1.0)),
            ],
            KnobMode::Detune => [
                self.to_value(patch.detune(), DETUNE_RANGE),
                self.to_value(patch.wave_mix_lfo_amount(), WAVE_LFO_RANGE),
            ],
            KnobMode::Filter => [
                self.to_value(patch.filt_f(), FILTER_F_RANGE),
                self.to_value(patch.filt_q(), FILTER_Q_RANGE),
            ],
            KnobMode::FilterEnv => [
                self.to_value(
                    patch.filt_type.index() as f64,
                    Self::index_span(FilterKind::ALL.len()),
                ),
                self.to_value(patch.filt_env_params.attack_time, FILTER_ATTACK_RANGE),
            ],
        }
    }

    /// Write one knob's value into the live patch. Only the parameter
    /// under that knob changes.
    fn apply(&mut self, knob: usize, value: f64) {
        match (self.mode, knob) {
            (KnobMode::Wave, 0) => {
                let span = Self::index_span(self.settings.wave_selects.len());
                let index = self.to_param(value, span).round().max(0.0) as usize;
                let Some(select) = self.settings.wave_selects.get(index) else {
                    return;
                };
                if *select == self.instrument.patch().wave {
                    return;
                }
                let mut patch = self.instrument.patch().clone();
                patch.wave = select.clone();
                info!("wave select {}", select);
                if let Err(e) = self.instrument.load_patch(patch) {
                    warn!("cannot load wave {}: {}", select, e);
                }
            }
            (KnobMode::Wave, _) => {
                let mix = self.to_param(value, (0.0, 1.0));
                self.instrument.patch_mut().set_wave_mix(mix);
            }
            (KnobMode::Detune, 0) => {
                let detune = self.to_param(value, DETUNE_RANGE);
                self.instrument.patch_mut().set_detune(detune);
                self.instrument.redetune();
            }
            (KnobMode::Detune, _) => {
                let amount = self.to_param(value, WAVE_LFO_RANGE);
                self.instrument.patch_mut().set_wave_mix_lfo_amount(amount);
            }
            (KnobMode::Filter, 0) => {
                let cutoff = self.to_param(value, FILTER_F_RANGE);
                self.instrument.patch_mut().set_filt_f(cutoff);
            }
            (KnobMode::Filter, _) => {
                let q = self.to_param(value, FILTER_Q_RANGE);
                self.instrument.patch_mut().set_filt_q(q);
            }
            (KnobMode::FilterEnv, 0) => {
                let span = Self::index_span(FilterKind::ALL.len());
                let kind = FilterKind::from_index(self.to_param(value, span).round().max(0.0) as usize);
                self.instrument.patch_mut().filt_type = kind;
            }
            (KnobMode::FilterEnv, _) => {
                let attack = self.to_param(value, FILTER_ATTACK_RANGE);
                self.instrument.patch_mut().filt_env_params.set_attack(attack);
            }
        }
    }
}

impl<E: SynthEngine> TickHost for WaveApp<E> {
    fn on_control_tick(&mut self, dt: f64) {
        for knob in 0..2 {
            let value = self.scalers[knob].update(self.knobs[knob]);
            if value != self.applied[knob] {
                self.apply(knob, value);
                self.applied[knob] = value;
            }
        }

        self.instrument.update();
        self.instrument.engine_mut().advance(dt);
    }

    fn on_display_tick(&mut self) {
        let patch = self.instrument.patch();
        let status = format!("[{}] {}: {}", self.mode, patch.name, patch.summary());
        if status != self.status {
            info!("{}", status);
            self.status = status;
        }
    }
}
