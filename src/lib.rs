//! wavedrone - drone and wavetable synth voice engines
//!
//! Control-rate logic for two small synths: a drone of always-on detuned
//! oscillator pairs steered by knobs, and a polyphonic two-oscillator
//! wave synth with wavetable scanning and an emulated filter envelope.
//! Sound itself comes from whatever implements `synth::SynthEngine`.

pub mod app;
pub mod config;
pub mod drone;
pub mod error;
pub mod instrument;
pub mod mapping;
pub mod patch;
pub mod synth;

pub use config::SynthConfig;
pub use drone::DroneController;
pub use error::SynthError;
pub use instrument::Instrument;
pub use mapping::ParamScaler;
pub use patch::Patch;
