//! `rule-one` library crate.
//!
//! The binary (`r1`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes or touching the network
//! - source adapters and the reconciliation engine are reusable on their own
//! - code stays easy to navigate as sources are added

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod fanout;
pub mod growth;
pub mod io;
pub mod logging;
pub mod recon;
pub mod report;
