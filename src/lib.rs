//! `wealth-tax-sim` library crate.
//!
//! The binary (`wtsim`) is a thin wrapper around this library so that:
//!
//! - every pipeline stage is testable without spawning processes
//! - the simulation can be driven from other tools with in-memory tables
//!
//! Stages, in pipeline order: `population` -> `calibrate` -> `tax` -> `behavior` -> `report`.

pub mod app;
pub mod behavior;
pub mod calibrate;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod population;
pub mod report;
pub mod tax;
