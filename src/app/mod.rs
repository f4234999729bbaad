//! Host apps
//!
//! Glue between raw controls (knobs, touch pads, a key) and the engines:
//! input events in, scaler updates and engine calls out, all paced by a
//! `TickScheduler`.

mod drone_app;
mod input;
mod scheduler;
mod wave_app;

pub use drone_app::{DroneApp, DroneAppSettings};
pub use input::{pressure_level, InputEvent};
pub use scheduler::{TickHost, TickScheduler};
pub use wave_app::{KnobMode, WaveApp, WaveAppSettings};
