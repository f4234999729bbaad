//! Headless control-rate engine
//!
//! Keeps the full state a real synthesis engine would hold (oscillators,
//! envelopes, modulation sources) and ticks modulation sources when
//! `advance` is called, but renders no audio. Used by the CLI simulations
//! and by tests, which also read its press/release call counts.
//!
//! Released oscillators are dropped once their envelope's release time has
//! passed on the `advance` clock, together with envelopes nothing plays.

use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use super::engine::{EnvelopeHandle, ModHandle, OscHandle, SynthEngine};
use super::envelope::EnvParams;
use super::filter::FilterSpec;
use super::lfo::{LfoParams, ModSource};
use super::waveform::SharedWave;

/// Most recent releases kept for `released()`
pub const RELEASED_LOG_LIMIT: usize = 4096;

/// State of one engine oscillator
#[derive(Debug, Clone)]
pub struct OscState {
    pub frequency: f64,
    pub amplitude: f64,
    pub waveform: SharedWave,
    pub envelope: Option<EnvelopeHandle>,
    pub filter: Option<FilterSpec>,
    pub bend: Option<ModHandle>,
    pub pressed: bool,
}

/// A `SynthEngine` with no audio output
#[derive(Debug)]
pub struct HeadlessEngine {
    sample_rate: f64,
    next_id: u32,
    oscillators: BTreeMap<OscHandle, OscState>,
    envelopes: BTreeMap<EnvelopeHandle, EnvParams>,
    modulations: BTreeMap<ModHandle, ModSource>,
    attached: BTreeSet<ModHandle>,
    press_calls: usize,
    release_calls: usize,
    released: Vec<OscHandle>,
    /// Released oscillators and the release time they have left
    releasing: BTreeMap<OscHandle, f64>,
}

impl HeadlessEngine {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            next_id: 0,
            oscillators: BTreeMap::new(),
            envelopes: BTreeMap::new(),
            modulations: BTreeMap::new(),
            attached: BTreeSet::new(),
            press_calls: 0,
            release_calls: 0,
            released: Vec::new(),
            releasing: BTreeMap::new(),
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn oscillator(&self, handle: OscHandle) -> Option<&OscState> {
        self.oscillators.get(&handle)
    }

    pub fn envelope(&self, handle: EnvelopeHandle) -> Option<&EnvParams> {
        self.envelopes.get(&handle)
    }

    pub fn modulation(&self, handle: ModHandle) -> Option<&ModSource> {
        self.modulations.get(&handle)
    }

    /// Oscillators the engine still holds, sounding or releasing
    pub fn oscillator_count(&self) -> usize {
        self.oscillators.len()
    }

    pub fn envelope_count(&self) -> usize {
        self.envelopes.len()
    }

    pub fn modulation_count(&self) -> usize {
        self.modulations.len()
    }

    /// Oscillators currently pressed
    pub fn sounding(&self) -> usize {
        self.oscillators.values().filter(|o| o.pressed).count()
    }

    /// Modulation sources currently ticked by the engine
    pub fn attached(&self) -> &BTreeSet<ModHandle> {
        &self.attached
    }

    pub fn press_calls(&self) -> usize {
        self.press_calls
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls
    }

    /// Oscillators passed to `release`, oldest first, up to the last
    /// `RELEASED_LOG_LIMIT`
    pub fn released(&self) -> &[OscHandle] {
        &self.released
    }

    /// Frequency including pitch bend (bend is in octaves)
    pub fn effective_frequency(&self, handle: OscHandle) -> Option<f64> {
        let osc = self.oscillators.get(&handle)?;
        let bend = osc.bend.map(|m| self.modulation_value(m)).unwrap_or(0.0);
        Some(osc.frequency * 2f64.powf(bend))
    }

    fn prune_released(&mut self, dt: f64) {
        let mut finished = Vec::new();
        for (handle, remaining) in self.releasing.iter_mut() {
            *remaining -= dt;
            if *remaining <= 0.0 {
                finished.push(*handle);
            }
        }
        if finished.is_empty() {
            return;
        }

        for handle in &finished {
            self.releasing.remove(handle);
            self.oscillators.remove(handle);
        }
        let live: BTreeSet<EnvelopeHandle> =
            self.oscillators.values().filter_map(|o| o.envelope).collect();
        self.envelopes.retain(|handle, _| live.contains(handle));
        trace!("dropped {} released oscillators", finished.len());
    }
}

impl SynthEngine for HeadlessEngine {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn create_oscillator(
        &mut self,
        frequency: f64,
        waveform: &SharedWave,
        envelope: Option<EnvelopeHandle>,
        filter: Option<FilterSpec>,
    ) -> OscHandle {
        let handle = OscHandle(self.next_id());
        self.oscillators.insert(
            handle,
            OscState {
                frequency,
                amplitude: 1.0,
                waveform: waveform.clone(),
                envelope,
                filter,
                bend: None,
                pressed: false,
            },
        );
        handle
    }

    fn press(&mut self, oscillators: &[OscHandle]) {
        self.press_calls += 1;
        for handle in oscillators {
            if let Some(osc) = self.oscillators.get_mut(handle) {
                osc.pressed = true;
                self.releasing.remove(handle);
            }
        }
    }

    fn release(&mut self, oscillators: &[OscHandle]) {
        self.release_calls += 1;
        for handle in oscillators {
            if let Some(osc) = self.oscillators.get_mut(handle) {
                osc.pressed = false;
                let release_time = osc
                    .envelope
                    .and_then(|env| self.envelopes.get(&env))
                    .map_or(0.0, |env| env.release_time);
                self.releasing.insert(*handle, release_time);
            }
            self.released.push(*handle);
        }
        if self.released.len() > RELEASED_LOG_LIMIT {
            let excess = self.released.len() - RELEASED_LOG_LIMIT;
            self.released.drain(..excess);
        }
    }

    fn set_frequency(&mut self, oscillator: OscHandle, hz: f64) {
        if let Some(osc) = self.oscillators.get_mut(&oscillator) {
            osc.frequency = hz;
        }
    }

    fn set_amplitude(&mut self, oscillator: OscHandle, level: f64) {
        if let Some(osc) = self.oscillators.get_mut(&oscillator) {
            osc.amplitude = level;
        }
    }

    fn set_filter(&mut self, oscillator: OscHandle, filter: Option<FilterSpec>) {
        if let Some(osc) = self.oscillators.get_mut(&oscillator) {
            osc.filter = filter;
        }
    }

    fn set_bend(&mut self, oscillator: OscHandle, source: Option<ModHandle>) {
        if let Some(osc) = self.oscillators.get_mut(&oscillator) {
            osc.bend = source;
        }
    }

    fn create_envelope(&mut self, params: &EnvParams) -> EnvelopeHandle {
        let handle = EnvelopeHandle(self.next_id());
        self.envelopes.insert(handle, params.sanitized());
        handle
    }

    fn create_modulation(&mut self, params: &LfoParams) -> ModHandle {
        let handle = ModHandle(self.next_id());
        self.modulations.insert(handle, ModSource::new(params));
        handle
    }

    fn modulation_value(&self, source: ModHandle) -> f64 {
        self.modulations.get(&source).map(ModSource::value).unwrap_or(0.0)
    }

    fn set_modulation_scale(&mut self, source: ModHandle, scale: f64) {
        if let Some(m) = self.modulations.get_mut(&source) {
            m.set_scale(scale);
        }
    }

    fn attach(&mut self, source: ModHandle) {
        self.attached.insert(source);
    }

    fn detach(&mut self, source: ModHandle) {
        self.attached.remove(&source);
    }

    fn free_modulation(&mut self, source: ModHandle) {
        self.attached.remove(&source);
        self.modulations.remove(&source);
    }

    fn advance(&mut self, dt: f64) {
        trace!("advance {:.4}s, {} sources", dt, self.attached.len());
        for handle in &self.attached {
            if let Some(m) = self.modulations.get_mut(handle) {
                m.advance(dt);
            }
        }
        self.prune_released(dt);
    }
}
