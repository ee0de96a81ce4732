//! Domain types shared by the source adapters, the reconciliation engine and
//! the application shell.
//!
//! - normalized source data (`NormalizedDataset`, `YearSeries`)
//! - per-source fetch results (`FetchOutcome`, `SourceId`)
//! - reconciliation inputs/outputs (`CandidateValue`, `Confidence`, `MetricResult`)

pub mod types;

pub use types::*;
