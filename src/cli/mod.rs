//! CLI interface for wavedrone

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Drone and wavetable synth voice engines, run headless
#[derive(Parser)]
#[command(name = "wavedrone")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "wavedrone.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,

    /// Converge the drone voices toward voice 0 and print their frequencies
    Drone {
        /// Configuration file path (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Starting notes, one per voice (e.g. 36,48,36,60)
        #[arg(short, long, value_delimiter = ',')]
        notes: Vec<f64>,

        /// Seconds to hold the converge key
        #[arg(short, long, default_value = "5")]
        seconds: f64,
    },

    /// Play each pad in turn through the wave synth and print voice state
    Play {
        /// Configuration file path (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Patch to load before playing
        #[arg(short, long, default_value = "0")]
        patch: usize,

        /// Pads to press, in order (all pads when empty)
        #[arg(long, value_delimiter = ',')]
        pads: Vec<usize>,

        /// Seconds each pad is held
        #[arg(short, long, default_value = "0.5")]
        seconds: f64,
    },

    /// Print a patch as JSON, or parse a wave selection
    Patch {
        /// Configuration file path (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Patch index in the bank
        #[arg(short, long, default_value = "0")]
        index: usize,

        /// Wave selection text to parse instead (e.g. osc:SAW/SQU, wtb:PLAITS02)
        #[arg(short, long)]
        wave: Option<String>,
    },
}
