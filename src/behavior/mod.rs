//! Behavioral responses.
//!
//! The sequence is fixed: erosion + dropout -> bumps -> (baseline tax) -> migration.
//! The resulting `BehaviorState` rows are consumed by `tax::engine::assess`.

pub mod erosion;
pub mod migration;

pub use erosion::*;
pub use migration::*;

/// Per-unit behavioral outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BehaviorState {
    pub erosion_factor: f64,
    pub dropout_prob: f64,
    pub dropout: bool,
    pub migration_prob: f64,
    pub migrated: bool,
    /// Income after behavioral adjustment (used for income tax and the cap).
    pub income: f64,
}
