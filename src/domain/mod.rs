//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input rows and reference statistics (`StatRow`, `WealthGroupStats`, `RegionShare`)
//! - the population as it flows through the pipeline (`Household`, `TaxUnit`)
//! - per-unit outputs (`SimulationResult`)
//! - run configuration (`SimConfig`) and per-stage seeding (`SeedConfig`)

pub mod config;
pub mod seeds;
pub mod types;

pub use config::*;
pub use seeds::*;
pub use types::*;
