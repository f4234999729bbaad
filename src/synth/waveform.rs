//! Single-cycle waveform tables
//!
//! Fixed-length signed 16-bit buffers handed to the synthesis engine, plus
//! the shared working buffer that a voice pair's oscillators both read from.

use std::cell::{Ref, RefCell, RefMut};
use std::f64::consts::PI;
use std::fmt;
use std::rc::Rc;

use log::warn;
use serde::{Deserialize, Serialize};

/// Sample type used by every waveform buffer
pub type Sample = i16;

/// Peak value of a full-scale LFO waveform
pub const LFO_PEAK: Sample = 32767;

/// Waveform shapes that can be generated on the fly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Saw,
    Silence,
}

impl Waveform {
    /// Parse a waveform name. Unknown names fall back to silence.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "sin" | "sine" => Waveform::Sine,
            "squ" | "square" => Waveform::Square,
            "tri" | "triangle" => Waveform::Triangle,
            "saw" | "sawtooth" => Waveform::Saw,
            "sil" | "silence" => Waveform::Silence,
            other => {
                warn!("unknown wave type '{}', using silence", other);
                Waveform::Silence
            }
        }
    }

    /// Three-letter tag used in wave-select strings
    pub fn short_name(&self) -> &'static str {
        match self {
            Waveform::Sine => "SIN",
            Waveform::Square => "SQU",
            Waveform::Triangle => "TRI",
            Waveform::Saw => "SAW",
            Waveform::Silence => "SIL",
        }
    }

    /// Render one cycle of this shape
    pub fn make(&self, size: usize, amplitude: Sample) -> Vec<Sample> {
        make_waveform(*self, size, amplitude)
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Build a single-cycle buffer of `size` samples peaking at `amplitude`
pub fn make_waveform(kind: Waveform, size: usize, amplitude: Sample) -> Vec<Sample> {
    let amp = amplitude as f64;
    match kind {
        Waveform::Sine => (0..size)
            .map(|i| ((2.0 * PI * i as f64 / size as f64).sin() * amp) as Sample)
            .collect(),
        Waveform::Square => {
            let half = size / 2;
            (0..size)
                .map(|i| if i < half { amplitude } else { -amplitude })
                .collect()
        }
        Waveform::Triangle => {
            let half = size / 2;
            let mut wave = linspace(-amp, amp, half);
            wave.extend(linspace(amp, -amp, size - half));
            wave
        }
        Waveform::Saw => saw_down(size, amplitude),
        Waveform::Silence => vec![0; size],
    }
}

/// Ramp from +amplitude down to -amplitude
pub fn saw_down(size: usize, amplitude: Sample) -> Vec<Sample> {
    linspace(amplitude as f64, -(amplitude as f64), size)
}

/// Ramp from -amplitude up to +amplitude
pub fn saw_up(size: usize, amplitude: Sample) -> Vec<Sample> {
    linspace(-(amplitude as f64), amplitude as f64, size)
}

/// Bipolar triangle for looping LFOs
pub fn lfo_triangle() -> Vec<Sample> {
    vec![0, LFO_PEAK, 0, -LFO_PEAK]
}

/// Positive-only triangle (rise then fall)
pub fn lfo_triangle_pos() -> Vec<Sample> {
    vec![0, LFO_PEAK, 0]
}

pub fn lfo_ramp_up_pos() -> Vec<Sample> {
    vec![0, LFO_PEAK]
}

pub fn lfo_ramp_down_pos() -> Vec<Sample> {
    vec![LFO_PEAK, 0]
}

/// Evenly spaced values from `start` to `end` inclusive
fn linspace(start: f64, end: f64, num: usize) -> Vec<Sample> {
    match num {
        0 => Vec::new(),
        1 => vec![start as Sample],
        n => (0..n)
            .map(|i| (start + (end - start) * i as f64 / (n - 1) as f64) as Sample)
            .collect(),
    }
}

/// Mix between `a` and `b`; `t` ranges 0-1
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    (1.0 - t) * a + t * b
}

/// Mix two waves into `out` sample by sample, without allocating
pub fn lerp_into(out: &mut [Sample], a: &[Sample], b: &[Sample], t: f64) {
    for ((o, &sa), &sb) in out.iter_mut().zip(a).zip(b) {
        *o = lerp(sa as f64, sb as f64, t).round() as Sample;
    }
}

/// A waveform buffer shared by several oscillators.
///
/// The voice engine is the only writer; synthesis engines only read. Both
/// oscillators of a detuned pair hold the same buffer, so an in-place wave-mix
/// update is heard on every holder at its next read.
#[derive(Debug, Clone, Default)]
pub struct SharedWave(Rc<RefCell<Vec<Sample>>>);

impl SharedWave {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self(Rc::new(RefCell::new(samples)))
    }

    pub fn silence(size: usize) -> Self {
        Self::new(vec![0; size])
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the current samples
    pub fn read(&self) -> Ref<'_, [Sample]> {
        Ref::map(self.0.borrow(), |v| v.as_slice())
    }

    /// Copy of the current samples
    pub fn to_vec(&self) -> Vec<Sample> {
        self.0.borrow().clone()
    }

    /// Number of holders of this buffer
    pub fn holders(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Whether two handles point at the same buffer
    pub fn ptr_eq(&self, other: &SharedWave) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn write(&self) -> RefMut<'_, [Sample]> {
        RefMut::map(self.0.borrow_mut(), |v| v.as_mut_slice())
    }

    /// Overwrite the buffer from `src`, zero-filling any tail
    pub(crate) fn copy_from(&self, src: &[Sample]) {
        let mut out = self.write();
        let n = out.len().min(src.len());
        out[..n].copy_from_slice(&src[..n]);
        out[n..].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_halves() {
        let wave = make_waveform(Waveform::Square, 256, 20000);
        assert_eq!(wave.len(), 256);
        assert!(wave[..128].iter().all(|&s| s == 20000));
        assert!(wave[128..].iter().all(|&s| s == -20000));
    }

    #[test]
    fn test_sine_cycle() {
        let wave = make_waveform(Waveform::Sine, 256, 20000);
        assert_eq!(wave[0], 0);
        assert_eq!(wave[64], 20000);
        assert!((wave[192] + 20000).abs() <= 1);
    }

    #[test]
    fn test_saw_ramps_down() {
        let wave = make_waveform(Waveform::Saw, 256, 20000);
        assert_eq!(wave[0], 20000);
        assert_eq!(wave[255], -20000);
        assert!(wave.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_saw_up_ramps_up() {
        let wave = saw_up(16, 1000);
        assert_eq!(wave[0], -1000);
        assert_eq!(wave[15], 1000);
    }

    #[test]
    fn test_triangle_up_then_down() {
        let wave = make_waveform(Waveform::Triangle, 256, 20000);
        assert_eq!(wave.len(), 256);
        assert_eq!(wave[0], -20000);
        assert_eq!(wave[127], 20000);
        assert_eq!(wave[128], 20000);
        assert_eq!(wave[255], -20000);
        assert!(wave[..128].windows(2).all(|w| w[1] >= w[0]));
        assert!(wave[128..].windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_silence() {
        assert!(make_waveform(Waveform::Silence, 64, 20000).iter().all(|&s| s == 0));
    }

    #[test]
    fn test_unknown_name_is_silence() {
        assert_eq!(Waveform::from_name("SAW"), Waveform::Saw);
        assert_eq!(Waveform::from_name("sin"), Waveform::Sine);
        assert_eq!(Waveform::from_name("wobble"), Waveform::Silence);
    }

    #[test]
    fn test_lerp_into_midpoint() {
        let a = vec![0, 100, -100, 2000];
        let b = vec![100, 300, 100, -2000];
        let mut out = vec![0; 4];
        lerp_into(&mut out, &a, &b, 0.5);
        assert_eq!(out, vec![50, 200, 0, 0]);

        lerp_into(&mut out, &a, &b, 0.0);
        assert_eq!(out, a);
        lerp_into(&mut out, &a, &b, 1.0);
        assert_eq!(out, b);
    }

    #[test]
    fn test_shared_wave_visible_to_all_holders() {
        let wave = SharedWave::silence(4);
        let other = wave.clone();
        assert_eq!(wave.holders(), 2);
        assert!(wave.ptr_eq(&other));

        wave.copy_from(&[1, 2, 3, 4]);
        assert_eq!(&*other.read(), &[1, 2, 3, 4]);

        wave.copy_from(&[9, 9]);
        assert_eq!(other.to_vec(), vec![9, 9, 0, 0]);
    }
}
