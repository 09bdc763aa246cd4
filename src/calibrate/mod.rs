//! Wealth calibration.
//!
//! - `reweight`: percentile-share reweighting
//! - `pareto`: parametric top tail
//! - `scaling`: optional per-region asset multipliers
//! - `taxpayers`: post-tax regional taxpayer-count targets

pub mod pareto;
pub mod reweight;
pub mod scaling;
pub mod taxpayers;

pub use pareto::*;
pub use reweight::*;
pub use scaling::*;
pub use taxpayers::*;
