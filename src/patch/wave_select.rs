//! Oscillator wave selection
//!
//! A patch's wave source is either one or two generated shapes mixed by
//! `wave_mix`, a single-cycle wave read from a WAV file, or a scannable
//! wavetable file. The short text form (`osc:SAW/SQU`, `wtb:PLAITS02`) is
//! what a small display shows and what the UI cycles through.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::synth::Waveform;

/// Where a patch's oscillator waveform comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaveSelect {
    /// Generated shapes; with a secondary shape, `wave_mix` blends A to B
    #[serde(rename = "osc")]
    Oscillator {
        primary: Waveform,
        #[serde(default)]
        secondary: Option<Waveform>,
    },
    /// First single-cycle wave of a WAV file
    #[serde(rename = "wav")]
    WaveFile { path: PathBuf },
    /// Wavetable file scanned by `wave_mix` and the wave LFO
    #[serde(rename = "wtb")]
    Wavetable { path: PathBuf },
}

impl Default for WaveSelect {
    fn default() -> Self {
        WaveSelect::Oscillator {
            primary: Waveform::Saw,
            secondary: None,
        }
    }
}

impl WaveSelect {
    pub fn osc(primary: Waveform, secondary: Option<Waveform>) -> Self {
        WaveSelect::Oscillator { primary, secondary }
    }

    /// Parse the short text form.
    ///
    /// File names in `wav:`/`wtb:` selections resolve against `dir` and get a
    /// `.WAV` extension when they have none. Unknown tags fall back to a
    /// silent oscillator.
    pub fn parse(text: &str, dir: Option<&Path>) -> Self {
        let (tag, rest) = match text.split_once(':') {
            Some((tag, rest)) => (tag.trim().to_ascii_lowercase(), rest.trim()),
            None => ("osc".to_string(), text.trim()),
        };

        match tag.as_str() {
            "osc" => {
                let mut names = rest.splitn(2, '/');
                let primary = Waveform::from_name(names.next().unwrap_or(""));
                let secondary = names.next().map(Waveform::from_name);
                WaveSelect::Oscillator { primary, secondary }
            }
            "wav" => WaveSelect::WaveFile {
                path: resolve_wave_path(rest, dir),
            },
            "wtb" => WaveSelect::Wavetable {
                path: resolve_wave_path(rest, dir),
            },
            other => {
                warn!("unknown wave type '{}' in '{}', using silence", other, text);
                WaveSelect::osc(Waveform::Silence, None)
            }
        }
    }

    /// Tag for this kind of source
    pub fn wave_type(&self) -> &'static str {
        match self {
            WaveSelect::Oscillator { .. } => "osc",
            WaveSelect::WaveFile { .. } => "wav",
            WaveSelect::Wavetable { .. } => "wtb",
        }
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            WaveSelect::Oscillator { .. } => None,
            WaveSelect::WaveFile { path } | WaveSelect::Wavetable { path } => Some(path),
        }
    }
}

impl fmt::Display for WaveSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveSelect::Oscillator { primary, secondary: Some(b) } => write!(f, "osc:{}/{}", primary, b),
            WaveSelect::Oscillator { primary, secondary: None } => write!(f, "osc:{}", primary),
            WaveSelect::WaveFile { path } | WaveSelect::Wavetable { path } => {
                write!(f, "{}:{}", self.wave_type(), display_name(path))
            }
        }
    }
}

/// Upper-case file stem, the way wave names are shown
fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_ascii_uppercase())
        .unwrap_or_default()
}

fn resolve_wave_path(name: &str, dir: Option<&Path>) -> PathBuf {
    let mut path = PathBuf::from(name);
    if path.extension().is_none() {
        path.set_extension("WAV");
    }
    match dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    }
}

/// Built-in oscillator pairs offered before any wavetable files
pub fn builtin_wave_selects() -> Vec<WaveSelect> {
    vec![
        WaveSelect::osc(Waveform::Saw, Some(Waveform::Triangle)),
        WaveSelect::osc(Waveform::Saw, Some(Waveform::Square)),
        WaveSelect::osc(Waveform::Saw, Some(Waveform::Sine)),
        WaveSelect::osc(Waveform::Square, Some(Waveform::Sine)),
    ]
}

/// Every selectable wave source: the built-ins, then one wavetable per
/// `.WAV` file in `dir` (sorted, hidden files skipped).
pub fn wave_selects(dir: Option<&Path>) -> Vec<WaveSelect> {
    let mut selects = builtin_wave_selects();
    let Some(dir) = dir else {
        return selects;
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot list wave dir {:?}: {}", dir, e);
            return selects;
        }
    };

    let mut tables: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_ascii_uppercase())
                .unwrap_or_default();
            name.ends_with(".WAV") && !name.starts_with('.')
        })
        .collect();
    tables.sort();

    debug!("found {} wavetables in {:?}", tables.len(), dir);
    selects.extend(tables.into_iter().map(|path| WaveSelect::Wavetable { path }));
    selects
}
