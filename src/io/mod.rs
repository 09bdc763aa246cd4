//! Input/output helpers.
//!
//! - CSV ingest of the cleaned input tables (`ingest`)
//! - result exports (CSV) (`export`)
//! - diagnostics summary JSON (`summary`)

pub mod export;
pub mod ingest;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use summary::*;
