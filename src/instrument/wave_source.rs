//! Cached waves behind a patch's wave selection

use crate::error::Result;
use crate::patch::WaveSelect;
use crate::synth::{lerp_into, make_waveform, Sample, SharedWave, Wavetable};

/// Waves loaded for the current patch. Rendering writes into the
/// instrument's shared buffer in place.
pub enum WaveSource {
    /// One fixed wave
    Fixed(Vec<Sample>),
    /// Two waves blended by the patch's wave mix
    Mix { a: Vec<Sample>, b: Vec<Sample> },
    /// A scannable wavetable
    Table(Wavetable),
}

impl WaveSource {
    pub fn load(select: &WaveSelect, size: usize, amplitude: Sample) -> Result<Self> {
        let source = match select {
            WaveSelect::Oscillator { primary, secondary: None } => {
                WaveSource::Fixed(make_waveform(*primary, size, amplitude))
            }
            WaveSelect::Oscillator { primary, secondary: Some(b) } => WaveSource::Mix {
                a: make_waveform(*primary, size, amplitude),
                b: make_waveform(*b, size, amplitude),
            },
            WaveSelect::WaveFile { path } => {
                let table = Wavetable::open(path, size)?;
                let wave = table.wave(0).map(<[Sample]>::to_vec).unwrap_or_else(|| vec![0; size]);
                WaveSource::Fixed(wave)
            }
            WaveSelect::Wavetable { path } => WaveSource::Table(Wavetable::open(path, size)?),
        };
        Ok(source)
    }

    pub fn is_table(&self) -> bool {
        matches!(self, WaveSource::Table(_))
    }

    /// Waves available to scan or mix across
    pub fn num_waves(&self) -> usize {
        match self {
            WaveSource::Fixed(_) => 1,
            WaveSource::Mix { .. } => 2,
            WaveSource::Table(table) => table.num_waves(),
        }
    }

    /// Current wavetable position, if scanning a table
    pub fn wave_position(&self) -> Option<f64> {
        match self {
            WaveSource::Table(table) => Some(table.wave_position()),
            _ => None,
        }
    }

    /// Write the full wave for `mix` into `out`, fixed waves included
    pub fn prime(&mut self, out: &SharedWave, mix: f64) {
        match self {
            WaveSource::Fixed(wave) => out.copy_from(wave),
            _ => self.render(out, mix, 0.0),
        }
    }

    /// Per-tick refresh of mixed or scanned waves.
    ///
    /// Tables scan to `scan_offset + mix * num_waves`; fixed waves are left
    /// alone.
    pub fn render(&mut self, out: &SharedWave, mix: f64, scan_offset: f64) {
        match self {
            WaveSource::Fixed(_) => {}
            WaveSource::Mix { a, b } => lerp_into(&mut out.write(), a, b, mix),
            WaveSource::Table(table) => {
                let position = scan_offset + mix * table.num_waves() as f64;
                table.set_wave_position(position);
                out.copy_from(&table.waveform().read());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::Waveform;

    #[test]
    fn test_single_oscillator_is_fixed() {
        let mut source = WaveSource::load(&WaveSelect::osc(Waveform::Square, None), 16, 100).unwrap();
        assert_eq!(source.num_waves(), 1);

        let out = SharedWave::silence(16);
        source.prime(&out, 0.7);
        assert_eq!(out.to_vec(), make_waveform(Waveform::Square, 16, 100));
    }

    #[test]
    fn test_mix_blends_in_place() {
        let select = WaveSelect::osc(Waveform::Square, Some(Waveform::Silence));
        let mut source = WaveSource::load(&select, 8, 1000).unwrap();
        let out = SharedWave::silence(8);
        let alias = out.clone();

        source.render(&out, 0.25, 0.0);
        assert_eq!(alias.read()[0], 750);
        assert_eq!(alias.read()[7], -750);
    }

    #[test]
    fn test_missing_table_fails() {
        let select = WaveSelect::Wavetable {
            path: "/nonexistent/T.WAV".into(),
        };
        assert!(WaveSource::load(&select, 256, 20000).is_err());
    }
}
