//! Numeric helpers shared by calibration and diagnostics.

pub mod weighted;

pub use weighted::*;
