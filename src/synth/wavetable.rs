//! Wavetable oscillator source
//!
//! A wavetable is a collection of related single-cycle waves stored back to
//! back in a mono 16-bit WAV file, usually 256 samples per wave. A fractional
//! wave position picks two neighbouring waves and mixes them into a working
//! buffer that oscillators play from.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};
use log::debug;

use super::waveform::{lerp_into, Sample, SharedWave};
use crate::error::{Result, SynthError};

/// Scannable wavetable loaded fully into memory
pub struct Wavetable {
    path: Option<PathBuf>,
    size: usize,
    samples: Vec<Sample>,
    num_waves: usize,
    wave_position: f64,
    /// Integer wave index that `wave_a`/`wave_b` were loaded for
    cached_index: Option<usize>,
    wave_a: Vec<Sample>,
    wave_b: Vec<Sample>,
    wave_loads: usize,
    waveform: SharedWave,
}

impl Wavetable {
    /// Open a wavetable file with `size` samples per wave
    pub fn open(path: impl AsRef<Path>, size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader = WavReader::new(BufReader::new(file))?;
        let spec = reader.spec();
        if spec.channels != 1 || spec.bits_per_sample != 16 || spec.sample_format != SampleFormat::Int {
            return Err(SynthError::UnsupportedWavFormat {
                channels: spec.channels,
                bits: spec.bits_per_sample,
            });
        }

        let samples = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut table = Self::from_samples(samples, size)?;
        table.path = Some(path.to_path_buf());
        debug!("opened wavetable {:?}: {} waves", path, table.num_waves);
        Ok(table)
    }

    /// Build a wavetable from raw concatenated waves
    pub fn from_samples(samples: Vec<Sample>, size: usize) -> Result<Self> {
        let num_waves = if size == 0 { 0 } else { samples.len() / size };
        if num_waves == 0 {
            return Err(SynthError::WavetableTooShort {
                frames: samples.len(),
                wave_size: size,
            });
        }

        let mut table = Self {
            path: None,
            size,
            samples,
            num_waves,
            wave_position: 0.0,
            cached_index: None,
            wave_a: vec![0; size],
            wave_b: vec![0; size],
            wave_loads: 0,
            waveform: SharedWave::silence(size),
        };
        table.set_wave_position(0.0);
        Ok(table)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Samples per wave
    pub fn size(&self) -> usize {
        self.size
    }

    /// How many waves this table holds
    pub fn num_waves(&self) -> usize {
        self.num_waves
    }

    pub fn wave_position(&self) -> f64 {
        self.wave_position
    }

    /// How many times the bounding waves were (re)loaded
    pub fn wave_loads(&self) -> usize {
        self.wave_loads
    }

    /// Raw slice of wave `index`
    pub fn wave(&self, index: usize) -> Option<&[Sample]> {
        let start = index.checked_mul(self.size)?;
        self.samples.get(start..start + self.size)
    }

    /// The mixed working buffer
    pub fn waveform(&self) -> &SharedWave {
        &self.waveform
    }

    /// Select a fractional wave position.
    ///
    /// The integer part picks wave A, the next wave is B, and the fraction
    /// mixes between them (15.66 is one third of wave 15, two thirds of 16).
    /// The position is clamped to `[0, num_waves - 1]`.
    pub fn set_wave_position(&mut self, position: f64) {
        let last = (self.num_waves - 1) as f64;
        let position = if position.is_nan() { 0.0 } else { position.clamp(0.0, last) };
        self.wave_position = position;

        let index = position.trunc() as usize;
        if self.cached_index != Some(index) {
            let next = (index + 1).min(self.num_waves - 1);
            let a = index * self.size;
            let b = next * self.size;
            self.wave_a.copy_from_slice(&self.samples[a..a + self.size]);
            self.wave_b.copy_from_slice(&self.samples[b..b + self.size]);
            self.cached_index = Some(index);
            self.wave_loads += 1;
        }

        let frac = position - index as f64;
        lerp_into(&mut self.waveform.write(), &self.wave_a, &self.wave_b, frac);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::NamedTempFile;

    /// Four 8-sample waves, each a constant even value
    fn stepped_samples() -> Vec<Sample> {
        [0i16, 1000, -2000, 4000]
            .iter()
            .flat_map(|&v| std::iter::repeat(v).take(8))
            .collect()
    }

    fn ramp_samples(waves: usize, size: usize) -> Vec<Sample> {
        (0..waves * size).map(|i| (i as i16) * 2).collect()
    }

    #[test]
    fn test_num_waves() {
        let table = Wavetable::from_samples(stepped_samples(), 8).unwrap();
        assert_eq!(table.num_waves(), 4);
        assert_eq!(table.size(), 8);
    }

    #[test]
    fn test_integer_position_is_raw_slice() {
        let samples = ramp_samples(4, 16);
        let mut table = Wavetable::from_samples(samples.clone(), 16).unwrap();

        for k in 0..4 {
            table.set_wave_position(k as f64);
            assert_eq!(&*table.waveform().read(), &samples[k * 16..(k + 1) * 16]);
        }
    }

    #[test]
    fn test_half_position_is_average() {
        let samples = ramp_samples(4, 16);
        let mut table = Wavetable::from_samples(samples.clone(), 16).unwrap();

        table.set_wave_position(1.5);
        let expected: Vec<Sample> = (0..16)
            .map(|i| (samples[16 + i] + samples[32 + i]) / 2)
            .collect();
        assert_eq!(table.waveform().to_vec(), expected);
    }

    #[test]
    fn test_position_clamped() {
        let mut table = Wavetable::from_samples(stepped_samples(), 8).unwrap();

        table.set_wave_position(-3.0);
        assert_eq!(table.wave_position(), 0.0);
        assert!(table.waveform().read().iter().all(|&s| s == 0));

        table.set_wave_position(99.0);
        assert_eq!(table.wave_position(), 3.0);
        assert!(table.waveform().read().iter().all(|&s| s == 4000));
    }

    #[test]
    fn test_same_index_skips_reload() {
        let mut table = Wavetable::from_samples(stepped_samples(), 8).unwrap();
        let loads = table.wave_loads();

        table.set_wave_position(0.25);
        table.set_wave_position(0.5);
        table.set_wave_position(0.75);
        assert_eq!(table.wave_loads(), loads);
        assert!(table.waveform().read().iter().all(|&s| s == 750));

        table.set_wave_position(1.0);
        assert_eq!(table.wave_loads(), loads + 1);
    }

    #[test]
    fn test_waveform_buffer_is_stable() {
        let mut table = Wavetable::from_samples(stepped_samples(), 8).unwrap();
        let held = table.waveform().clone();

        table.set_wave_position(2.0);
        assert!(held.read().iter().all(|&s| s == -2000));
    }

    #[test]
    fn test_too_short() {
        let result = Wavetable::from_samples(vec![0; 10], 16);
        assert!(matches!(result, Err(SynthError::WavetableTooShort { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Wavetable::open("/nonexistent/PLAITS02.WAV", 256);
        assert!(matches!(result, Err(SynthError::Io(_))));
    }

    #[test]
    fn test_garbage_file_is_wav_error() {
        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"not a wav file").unwrap();
        let result = Wavetable::open(file.path(), 256);
        assert!(matches!(result, Err(SynthError::Wav(_))));
    }

    #[test]
    fn test_open_wav_file() {
        let file = NamedTempFile::new().unwrap();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        for s in stepped_samples() {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let mut table = Wavetable::open(file.path(), 8).unwrap();
        assert_eq!(table.num_waves(), 4);
        assert_eq!(table.path(), Some(file.path()));
        table.set_wave_position(1.0);
        assert!(table.waveform().read().iter().all(|&s| s == 1000));
    }

    #[test]
    fn test_open_rejects_stereo() {
        let file = NamedTempFile::new().unwrap();
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        for _ in 0..32 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let result = Wavetable::open(file.path(), 8);
        assert!(matches!(
            result,
            Err(SynthError::UnsupportedWavFormat { channels: 2, bits: 16 })
        ));
    }

    #[test]
    fn test_open_missing_file() {
        assert!(Wavetable::open("/nonexistent/table.wav", 256).is_err());
    }
}
