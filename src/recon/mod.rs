//! Cross-source reconciliation.
//!
//! - `year`: resolve a requested fiscal year against a series
//! - `strategy`: per-metric, priority-ordered (source, formula) tables
//! - `reconcile`: adjacent-pair agreement and confidence tiers
//! - `calculator`: drives strategies against the source registry

pub mod calculator;
pub mod reconcile;
pub mod strategy;
pub mod year;

pub use calculator::{MetricCalculator, MetricReport, SkippedStrategy, StrategySkip};
pub use reconcile::reconcile;
pub use strategy::{Formula, Strategy, strategies_for};
pub use year::{YearLookupError, YearResolver};
