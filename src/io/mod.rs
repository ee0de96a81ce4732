//! Input/output helpers.
//!
//! - reconciled result exports (CSV) (`export`)
//! - normalized dataset dumps (JSON) (`dataset`)

pub mod dataset;
pub mod export;

pub use dataset::*;
pub use export::*;
