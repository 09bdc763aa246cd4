//! Tax engine: bracket schedules, regional policy, and per-unit liabilities.

pub mod brackets;
pub mod engine;
pub mod policy;

pub use brackets::*;
pub use engine::*;
pub use policy::*;
