//! Polyphonic two-oscillator voice engine
//!
//! An `Instrument` turns note events into engine oscillators and, once per
//! control tick, recomputes what the engine can't: the wave-mix or wavetable
//! position written into the shared waveform buffer, and each voice's filter
//! with its emulated filter envelope.
//!
//! Every voice plays from the same `SharedWave`. Loading a patch rewrites
//! that buffer in place, so held notes change wave immediately.

mod voice;
mod wave_source;

pub use voice::{velocity_level, Voice};
pub use wave_source::WaveSource;

use std::collections::BTreeMap;

use log::{debug, info, trace, warn};

use crate::error::Result;
use crate::patch::Patch;
use crate::synth::{
    lfo_triangle, midi_to_hz, FilterSpec, LfoParams, ModHandle, Sample, SharedWave, SynthEngine,
};

/// Below this cutoff-to-fundamental ratio a voice's filter Q is halved
pub const FILTER_STABILITY_RATIO: f64 = 1.2;

/// Filter envelope emulation: one pass of a bipolar triangle, kept positive
const FILTER_ENV_SCALE: f64 = 0.9;
const FILTER_ENV_OFFSET: f64 = 1.01;

/// Unipolar wave LFO used to sweep wavetables
const WAVE_LFO_RATE: f64 = 0.3;

/// Fixed sizes the instrument is built with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentSettings {
    /// Samples per single-cycle wave
    pub wave_size: usize,
    pub wave_amplitude: Sample,
    /// Largest filter envelope sweep in Hz
    pub filter_mod_depth: f64,
}

impl Default for InstrumentSettings {
    fn default() -> Self {
        Self {
            wave_size: 256,
            wave_amplitude: 20000,
            filter_mod_depth: 8000.0,
        }
    }
}

/// Voice engine driving a `SynthEngine`
pub struct Instrument<E: SynthEngine> {
    engine: E,
    patch: Patch,
    settings: InstrumentSettings,
    waveform: SharedWave,
    source: WaveSource,
    wave_lfo: Option<ModHandle>,
    voices: BTreeMap<u8, Voice>,
}

impl<E: SynthEngine> Instrument<E> {
    /// Build an instrument and load `patch`.
    ///
    /// Fails only when the patch names a wave file that can't be read.
    pub fn new(engine: E, patch: Patch, settings: InstrumentSettings) -> Result<Self> {
        let source = WaveSource::load(&patch.wave, settings.wave_size, settings.wave_amplitude)?;
        let mut instrument = Self {
            engine,
            patch: Patch::default(),
            settings,
            waveform: SharedWave::silence(settings.wave_size),
            source,
            wave_lfo: None,
            voices: BTreeMap::new(),
        };
        instrument.install(patch);
        Ok(instrument)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// Edit the live patch. Changes take effect on the next `update`, except
    /// detune which needs `redetune`.
    pub fn patch_mut(&mut self) -> &mut Patch {
        &mut self.patch
    }

    pub fn settings(&self) -> &InstrumentSettings {
        &self.settings
    }

    /// The buffer every voice plays from
    pub fn waveform(&self) -> &SharedWave {
        &self.waveform
    }

    pub fn wave_source(&self) -> &WaveSource {
        &self.source
    }

    /// Wave LFO handle while a wavetable patch is loaded
    pub fn wave_lfo(&self) -> Option<ModHandle> {
        self.wave_lfo.filter(|_| self.source.is_table())
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn voice(&self, note: u8) -> Option<&Voice> {
        self.voices.get(&note)
    }

    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.values()
    }

    /// Start a note. A note that is already sounding is released and
    /// replaced by a fresh voice.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        if let Some(old) = self.voices.remove(&note) {
            debug!("retrigger note {}", note);
            self.release_voice(&old);
        }

        let frequency = midi_to_hz(f64::from(note));
        let level = velocity_level(velocity);

        let filter_env = self.engine.create_modulation(&LfoParams::one_shot(
            self.patch.filt_env_params.attack_time,
            FILTER_ENV_SCALE,
            FILTER_ENV_OFFSET,
            lfo_triangle(),
        ));
        let amp_env = self.engine.create_envelope(&self.patch.amp_env_params);

        let filter = voice_filter(
            &self.engine,
            &self.patch,
            self.settings.filter_mod_depth,
            frequency,
            filter_env,
        );

        let primary = self
            .engine
            .create_oscillator(frequency, &self.waveform, Some(amp_env), filter);
        let secondary = self.patch.has_secondary().then(|| {
            self.engine.create_oscillator(
                frequency * self.patch.detune(),
                &self.waveform,
                Some(amp_env),
                filter,
            )
        });

        let voice = Voice {
            note,
            velocity,
            frequency,
            level,
            primary,
            secondary,
            filter_env,
            amp_env,
        };
        let oscillators = voice.oscillators();
        for &osc in &oscillators {
            self.engine.set_amplitude(osc, level);
        }
        self.engine.attach(filter_env);
        self.engine.press(&oscillators);

        debug!("note on {} ({:.2} Hz) vel {}", note, frequency, velocity);
        self.voices.insert(note, voice);
    }

    /// Release a note. Unknown notes are logged and ignored.
    pub fn note_off(&mut self, note: u8) {
        match self.voices.remove(&note) {
            Some(voice) => {
                self.release_voice(&voice);
                debug!("note off {}", note);
            }
            None => warn!("note off for {} with no active voice", note),
        }
    }

    /// Release every sounding note
    pub fn all_notes_off(&mut self) {
        let voices = std::mem::take(&mut self.voices);
        for voice in voices.values() {
            self.release_voice(voice);
        }
    }

    /// Set a held note's level (pressure/aftertouch), 0.0-1.0
    pub fn set_note_level(&mut self, note: u8, level: f64) {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        let has_secondary = self.patch.has_secondary();
        let Some(voice) = self.voices.get_mut(&note) else {
            warn!("level for note {} with no active voice", note);
            return;
        };
        voice.level = level;
        self.engine.set_amplitude(voice.primary, level);
        if let (Some(osc), true) = (voice.secondary, has_secondary) {
            self.engine.set_amplitude(osc, level);
        }
    }

    /// Once per control tick: refresh the shared wave and every voice's filter
    pub fn update(&mut self) {
        let scan_offset = match self.wave_lfo() {
            Some(lfo) => self.engine.modulation_value(lfo) * self.patch.wave_mix_lfo_amount(),
            None => 0.0,
        };
        self.source.render(&self.waveform, self.patch.wave_mix(), scan_offset);

        let has_secondary = self.patch.has_secondary();
        for voice in self.voices.values() {
            let filter = voice_filter(
                &self.engine,
                &self.patch,
                self.settings.filter_mod_depth,
                voice.frequency,
                voice.filter_env,
            );
            trace!(
                "voice {} cutoff {:?}",
                voice.note,
                filter.map(|f| f.cutoff())
            );
            self.engine.set_filter(voice.primary, filter);
            if let (Some(osc), true) = (voice.secondary, has_secondary) {
                self.engine.set_filter(osc, filter);
            }
        }
    }

    /// Swap in a new patch.
    ///
    /// The new waves are loaded first; on failure the current patch stays.
    /// Sounding voices keep their oscillators but hear the new wave at once
    /// and pick up the new filter settings on the next `update`.
    pub fn load_patch(&mut self, patch: Patch) -> Result<()> {
        self.source = WaveSource::load(&patch.wave, self.settings.wave_size, self.settings.wave_amplitude)?;
        self.install(patch);
        Ok(())
    }

    /// Re-apply the patch detune to every secondary oscillator. A detune of
    /// zero silences them.
    pub fn redetune(&mut self) {
        let detune = self.patch.detune();
        for voice in self.voices.values() {
            let Some(osc) = voice.secondary else {
                continue;
            };
            if detune > 0.0 {
                self.engine.set_frequency(osc, voice.frequency * detune);
                self.engine.set_amplitude(osc, voice.level);
            } else {
                self.engine.set_amplitude(osc, 0.0);
            }
        }
    }

    fn install(&mut self, patch: Patch) {
        info!("load patch '{}': {}", patch.name, patch.summary());
        self.patch = patch;
        self.source.prime(&self.waveform, self.patch.wave_mix());

        if self.source.is_table() {
            let lfo = match self.wave_lfo {
                Some(lfo) => lfo,
                None => {
                    let lfo = self
                        .engine
                        .create_modulation(&LfoParams::looping(WAVE_LFO_RATE, 0.5, 0.5));
                    self.wave_lfo = Some(lfo);
                    lfo
                }
            };
            self.engine.attach(lfo);
        } else if let Some(lfo) = self.wave_lfo {
            self.engine.detach(lfo);
        }
    }

    fn release_voice(&mut self, voice: &Voice) {
        self.engine.release(&voice.oscillators());
        self.engine.free_modulation(voice.filter_env);
    }
}

/// Filter for one voice this tick, `None` when the patch is unfiltered
fn voice_filter<E: SynthEngine>(
    engine: &E,
    patch: &Patch,
    mod_depth: f64,
    frequency: f64,
    filter_env: ModHandle,
) -> Option<FilterSpec> {
    let filter_type = patch.filt_type.filter_type()?;

    let mut q = patch.filt_q();
    if patch.filt_f() / frequency < FILTER_STABILITY_RATIO {
        q /= 2.0;
    }

    let env = if patch.filt_env_params.attack_time > 0.0 {
        let value = engine.modulation_value(filter_env);
        (patch.filt_env_amount() * mod_depth * value / 2.0).max(0.0)
    } else {
        0.0
    };

    Some(engine.filter(filter_type, patch.filt_f() + env, q))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{FilterKind, WaveSelect};
    use crate::synth::{lerp_into, make_waveform, FilterType, HeadlessEngine, Waveform};
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::NamedTempFile;

    fn instrument(patch: Patch) -> Instrument<HeadlessEngine> {
        Instrument::new(HeadlessEngine::new(48000.0), patch, InstrumentSettings::default()).unwrap()
    }

    fn write_table(waves: &[i16], size: usize) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        for &level in waves {
            for _ in 0..size {
                writer.write_sample(level).unwrap();
            }
        }
        writer.finalize().unwrap();
        file
    }

    #[test]
    fn test_note_on_then_off() {
        let mut inst = instrument(Patch::default());
        inst.note_on(60, 127);

        let voice = inst.voice(60).unwrap().clone();
        let oscillators = voice.oscillators();
        assert_eq!(oscillators.len(), 2);
        assert_eq!(inst.engine().sounding(), 2);
        assert!(inst.engine().attached().contains(&voice.filter_env()));

        inst.note_off(60);
        assert_eq!(inst.active_voices(), 0);
        assert_eq!(inst.engine().release_calls(), 1);
        assert_eq!(inst.engine().released(), oscillators.as_slice());
        assert!(!inst.engine().attached().contains(&voice.filter_env()));
    }

    #[test]
    fn test_engine_state_does_not_grow_with_notes() {
        let mut inst = instrument(Patch::default());
        for round in 0..200 {
            let note = 40 + (round % 12) as u8;
            inst.note_on(note, 127);
            inst.update();
            inst.engine_mut().advance(0.01);
            inst.note_off(note);
            inst.engine_mut().advance(0.5);
        }
        let engine = inst.engine();
        assert_eq!(engine.oscillator_count(), 0);
        assert_eq!(engine.envelope_count(), 0);
        assert_eq!(engine.modulation_count(), 0);
        assert_eq!(engine.release_calls(), 200);
    }

    #[test]
    fn test_voice_frequencies() {
        let mut inst = instrument(Patch::default());
        inst.note_on(69, 127);
        let voice = inst.voice(69).unwrap();
        let engine = inst.engine();

        assert_eq!(engine.oscillator(voice.primary()).unwrap().frequency, 440.0);
        let secondary = engine.oscillator(voice.secondary().unwrap()).unwrap();
        assert!((secondary.frequency - 444.4).abs() < 1e-9);
        assert_eq!(engine.press_calls(), 1);
    }

    #[test]
    fn test_retrigger_replaces_voice() {
        let mut inst = instrument(Patch::default());
        inst.note_on(60, 127);
        let first = inst.voice(60).unwrap().oscillators();

        inst.note_on(60, 100);
        let second = inst.voice(60).unwrap().oscillators();

        assert_eq!(inst.active_voices(), 1);
        assert_eq!(inst.engine().release_calls(), 1);
        assert_eq!(inst.engine().released(), first.as_slice());
        assert_ne!(first, second);
        assert_eq!(inst.engine().sounding(), 2);
    }

    #[test]
    fn test_note_off_unknown_is_ignored() {
        let mut inst = instrument(Patch::default());
        inst.note_off(42);
        assert_eq!(inst.engine().release_calls(), 0);
    }

    #[test]
    fn test_zero_detune_single_oscillator() {
        let mut patch = Patch::default();
        patch.set_detune(0.0);
        let mut inst = instrument(patch);
        inst.note_on(48, 127);
        assert_eq!(inst.voice(48).unwrap().oscillators().len(), 1);
        inst.note_off(48);
        assert_eq!(inst.engine().released().len(), 1);
    }

    #[test]
    fn test_velocity_sets_amplitude() {
        let mut inst = instrument(Patch::default());
        inst.note_on(60, 0);
        let voice = inst.voice(60).unwrap();
        assert_eq!(inst.engine().oscillator(voice.primary()).unwrap().amplitude, 0.0);

        inst.set_note_level(60, 0.25);
        let voice = inst.voice(60).unwrap();
        assert_eq!(voice.level(), 0.25);
        let engine = inst.engine();
        assert_eq!(engine.oscillator(voice.primary()).unwrap().amplitude, 0.25);
        assert_eq!(engine.oscillator(voice.secondary().unwrap()).unwrap().amplitude, 0.25);
    }

    #[test]
    fn test_all_notes_off() {
        let mut inst = instrument(Patch::default());
        for note in [40, 48, 52, 55] {
            inst.note_on(note, 127);
        }
        assert_eq!(inst.active_voices(), 4);
        inst.all_notes_off();
        assert_eq!(inst.active_voices(), 0);
        assert_eq!(inst.engine().sounding(), 0);
        assert_eq!(inst.engine().released().len(), 8);
    }

    #[test]
    fn test_oscillators_share_waveform() {
        let mut inst = instrument(Patch::default());
        inst.note_on(60, 127);
        let voice = inst.voice(60).unwrap();
        let engine = inst.engine();
        let a = &engine.oscillator(voice.primary()).unwrap().waveform;
        let b = &engine.oscillator(voice.secondary().unwrap()).unwrap().waveform;
        assert!(a.ptr_eq(b));
        assert!(a.ptr_eq(inst.waveform()));
    }

    #[test]
    fn test_update_mixes_waves() {
        let mut patch = Patch::default();
        patch.wave = WaveSelect::osc(Waveform::Saw, Some(Waveform::Square));
        let mut inst = instrument(patch);
        inst.note_on(60, 127);

        inst.patch_mut().set_wave_mix(0.5);
        inst.update();

        let saw = make_waveform(Waveform::Saw, 256, 20000);
        let square = make_waveform(Waveform::Square, 256, 20000);
        let mut expected = vec![0; 256];
        lerp_into(&mut expected, &saw, &square, 0.5);

        let voice = inst.voice(60).unwrap();
        let held = &inst.engine().oscillator(voice.primary()).unwrap().waveform;
        assert_eq!(held.to_vec(), expected);
    }

    #[test]
    fn test_update_filter_envelope() {
        let mut inst = instrument(Patch::default());
        inst.note_on(60, 127);
        inst.update();

        let voice = inst.voice(60).unwrap();
        let filter = inst.engine().oscillator(voice.primary()).unwrap().filter.unwrap();
        assert_eq!(filter.filter_type(), FilterType::LowPass);
        // 8000 + 0.5 * 8000 * 1.01 / 2
        assert!((filter.cutoff() - 10020.0).abs() < 1e-9);
        assert_eq!(filter.resonance(), 1.2);
    }

    #[test]
    fn test_filter_envelope_moves_with_engine_time() {
        let mut patch = Patch::default();
        patch.filt_env_params.set_attack(1.0);
        let mut inst = instrument(patch);
        inst.note_on(60, 127);

        // a third of the way through the one-shot triangle is its peak
        inst.engine_mut().advance(1.0 / 3.0);
        inst.update();
        let voice = inst.voice(60).unwrap();
        let cutoff = inst.engine().oscillator(voice.primary()).unwrap().filter.unwrap().cutoff();
        // 8000 + 0.5 * 8000 * 1.91 / 2
        assert!((cutoff - 11820.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_filter_envelope_without_attack() {
        let mut patch = Patch::default();
        patch.filt_env_params.set_attack(0.0);
        let mut inst = instrument(patch);
        inst.note_on(60, 127);
        inst.update();

        let voice = inst.voice(60).unwrap();
        let filter = inst.engine().oscillator(voice.primary()).unwrap().filter.unwrap();
        assert_eq!(filter.cutoff(), 8000.0);
    }

    #[test]
    fn test_filter_stability_halves_q() {
        let mut patch = Patch::default();
        patch.set_filt_f(300.0);
        patch.filt_env_params.set_attack(0.0);
        let mut inst = instrument(patch);
        inst.note_on(60, 127);
        inst.update();

        let voice = inst.voice(60).unwrap();
        let filter = inst.engine().oscillator(voice.primary()).unwrap().filter.unwrap();
        assert_eq!(filter.resonance(), 0.6);
        assert_eq!(inst.patch().filt_q(), 1.2);
    }

    #[test]
    fn test_unfiltered_patch() {
        let mut patch = Patch::default();
        patch.filt_type = FilterKind::None;
        let mut inst = instrument(patch);
        inst.note_on(60, 127);
        inst.update();

        let voice = inst.voice(60).unwrap();
        assert!(inst.engine().oscillator(voice.primary()).unwrap().filter.is_none());
    }

    #[test]
    fn test_redetune() {
        let mut inst = instrument(Patch::default());
        inst.note_on(57, 127);
        inst.patch_mut().set_detune(1.5);
        inst.redetune();

        let voice = inst.voice(57).unwrap();
        let secondary = inst.engine().oscillator(voice.secondary().unwrap()).unwrap();
        assert!((secondary.frequency - 330.0).abs() < 1e-9);

        inst.patch_mut().set_detune(0.0);
        inst.redetune();
        let voice = inst.voice(57).unwrap();
        assert_eq!(inst.engine().oscillator(voice.secondary().unwrap()).unwrap().amplitude, 0.0);
    }

    #[test]
    fn test_load_patch_rewrites_held_wave() {
        let mut inst = instrument(Patch::default());
        inst.note_on(60, 127);

        let mut patch = Patch::named("square");
        patch.wave = WaveSelect::osc(Waveform::Square, None);
        inst.load_patch(patch).unwrap();

        let voice = inst.voice(60).unwrap();
        let held = &inst.engine().oscillator(voice.primary()).unwrap().waveform;
        assert_eq!(held.to_vec(), make_waveform(Waveform::Square, 256, 20000));
        assert_eq!(inst.patch().name, "square");
        assert_eq!(inst.active_voices(), 1);
    }

    #[test]
    fn test_load_patch_failure_keeps_current() {
        let mut inst = instrument(Patch::default());
        let mut patch = Patch::named("broken");
        patch.wave = WaveSelect::Wavetable {
            path: "/nonexistent/GONE.WAV".into(),
        };
        assert!(inst.load_patch(patch).is_err());
        assert_eq!(inst.patch().name, "init");
        assert_eq!(inst.waveform().to_vec(), make_waveform(Waveform::Saw, 256, 20000));
    }

    #[test]
    fn test_wavetable_patch_scans_with_lfo() {
        let file = write_table(&[0, 1000, 2000, 3000], 256);
        let mut patch = Patch::named("table");
        patch.wave = WaveSelect::Wavetable {
            path: file.path().to_path_buf(),
        };
        patch.set_wave_mix_lfo_amount(0.0);
        patch.set_wave_mix(0.5);

        let mut inst = instrument(patch);
        let lfo = inst.wave_lfo().unwrap();
        assert!(inst.engine().attached().contains(&lfo));

        inst.update();
        assert_eq!(inst.wave_source().wave_position(), Some(2.0));
        assert!(inst.waveform().read().iter().all(|&s| s == 2000));

        // LFO sits at 0.5 before any time passes
        inst.patch_mut().set_wave_mix(0.0);
        inst.patch_mut().set_wave_mix_lfo_amount(3.0);
        inst.update();
        assert_eq!(inst.wave_source().wave_position(), Some(1.5));
        assert!(inst.waveform().read().iter().all(|&s| s == 1500));

        inst.load_patch(Patch::default()).unwrap();
        assert_eq!(inst.wave_lfo(), None);
        assert!(!inst.engine().attached().contains(&lfo));
    }
}
