//! Control mapping
//!
//! Maps raw control positions to parameter values: plain range mapping for
//! derived quantities, and the knob-pickup scaler for parameters a physical
//! control edits.

mod linear;
mod mapper;
mod scaler;

pub use linear::{map_range, LinearMapper};
pub use mapper::Mapper;
pub use scaler::{ParamScaler, ScalerRange, MATCH_TOLERANCE};
