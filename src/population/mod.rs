//! Population synthesis.
//!
//! - `stats`: long statistics table -> per-band reference rows
//! - `households`: regional counts, sizes, stratified ranks
//! - `noise`: band means + multiplicative noise -> balances
//! - `expand`: households -> weighted tax units

pub mod expand;
pub mod households;
pub mod noise;
pub mod stats;

pub use expand::*;
pub use households::*;
pub use noise::*;
pub use stats::*;

use crate::domain::{Household, PopulationConfig, RegionShare, SeedConfig};
use crate::error::AppError;

/// Households with balances, ready for expansion.
pub fn synthesize(
    shares: &[RegionShare],
    stats: &GroupStats,
    pop: &PopulationConfig,
    seeds: &SeedConfig,
) -> Result<Vec<Household>, AppError> {
    let mut households = synthesize_households(shares, stats, pop, seeds)?;
    assign_balances(&mut households, stats, pop, seeds)?;
    Ok(households)
}
