//! Multi-source metric calculator.
//!
//! Walks a metric's strategy table in priority order, collecting one candidate
//! per strategy that yields a finite value for the requested year, and stops
//! as soon as `redundancy` candidates are in hand. The candidates are then
//! reconciled (see [`super::reconcile`]).
//!
//! - Each source is fetched at most once per `compute` call.
//! - With `YearRequest::Latest`, the first strategy that resolves a year pins
//!   it; later strategies ask for that concrete year.
//! - A failing strategy never aborts the computation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::data::SourceRegistry;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::domain::{CandidateValue, FetchOutcome, Metric, MetricResult, SourceId, YearRequest};
use crate::recon::reconcile::reconcile;
use crate::recon::strategy::{Strategy, strategies_for};
use crate::recon::year::{YearLookupError, YearResolver};

/// Why a strategy contributed no candidate.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum StrategySkip {
    #[error("source not configured")]
    SourceUnavailable,
    #[error("fetch failed: {outcome} ({status})")]
    FetchFailed { outcome: String, status: u16 },
    #[error("missing field '{0}'")]
    MissingField(String),
    #[error("{0}")]
    YearUnresolved(#[serde(serialize_with = "display")] YearLookupError),
    #[error("no value for {year}")]
    MissingValue { year: i32 },
}

fn display<S: serde::Serializer>(err: &YearLookupError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedStrategy {
    pub rank: usize,
    pub source: SourceId,
    pub reason: StrategySkip,
}

/// Full trace of one computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport {
    pub ticker: String,
    pub metric: Metric,
    pub result: MetricResult,
    /// Fiscal year the candidates were resolved for.
    pub year: Option<i32>,
    pub candidates: Vec<CandidateValue>,
    pub skipped: Vec<SkippedStrategy>,
}

#[derive(Clone)]
pub struct MetricCalculator {
    sources: SourceRegistry,
    resolver: YearResolver,
    diagnostics: Arc<dyn Diagnostics>,
}

impl MetricCalculator {
    pub fn new(sources: SourceRegistry, resolver: YearResolver, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            sources,
            resolver,
            diagnostics,
        }
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn compute(&self, metric: Metric, ticker: &str, year: YearRequest, redundancy: usize) -> MetricResult {
        self.compute_report(metric, ticker, year, redundancy).result
    }

    /// Like [`compute`](Self::compute) but keeps the candidates and skip reasons.
    pub fn compute_report(&self, metric: Metric, ticker: &str, year: YearRequest, redundancy: usize) -> MetricReport {
        let redundancy = redundancy.max(1);
        let ticker = ticker.trim();
        let mut fetched: HashMap<SourceId, FetchOutcome> = HashMap::new();
        let mut pinned: Option<i32> = None;
        let mut candidates = Vec::new();
        let mut skipped = Vec::new();

        for (rank, strategy) in strategies_for(metric).iter().enumerate() {
            if candidates.len() >= redundancy {
                break;
            }
            let request = pinned.map_or(year, YearRequest::Year);
            let attempt = self.attempt(metric, ticker, strategy, request, &mut fetched);
            match attempt {
                Attempt::Candidate { year, value } => {
                    pinned.get_or_insert(year);
                    candidates.push(CandidateValue {
                        rank,
                        source: strategy.source,
                        year,
                        value,
                    });
                }
                Attempt::Skip { resolved, reason } => {
                    if let Some(year) = resolved {
                        pinned.get_or_insert(year);
                    }
                    skipped.push(SkippedStrategy {
                        rank,
                        source: strategy.source,
                        reason,
                    });
                }
            }
        }

        let values: Vec<f64> = candidates.iter().map(|c| c.value).collect();
        let result = reconcile(&values, metric.tolerance());
        tracing::debug!(
            ticker,
            metric = ?metric,
            candidates = candidates.len(),
            skipped = skipped.len(),
            "reconciled {}",
            metric.display_name()
        );

        MetricReport {
            ticker: ticker.to_string(),
            metric,
            result,
            year: pinned,
            candidates,
            skipped,
        }
    }

    fn attempt(
        &self,
        metric: Metric,
        ticker: &str,
        strategy: &Strategy,
        request: YearRequest,
        fetched: &mut HashMap<SourceId, FetchOutcome>,
    ) -> Attempt {
        let source = strategy.source;
        let Some(adapter) = self.sources.get(source) else {
            return Attempt::skip(StrategySkip::SourceUnavailable);
        };
        let outcome = fetched.entry(source).or_insert_with(|| adapter.fetch(ticker));
        let Some(dataset) = outcome.dataset() else {
            // The adapter already reported the failure.
            return Attempt::skip(StrategySkip::FetchFailed {
                outcome: outcome.to_string(),
                status: outcome.status_code(),
            });
        };

        let series = match strategy.formula.evaluate(dataset) {
            Ok(series) => series,
            Err(field) => {
                self.diagnostics.report(Diagnostic::MissingField {
                    ticker: ticker.to_string(),
                    source,
                    metric,
                    field: field.to_string(),
                });
                return Attempt::skip(StrategySkip::MissingField(field.to_string()));
            }
        };

        match self.resolver.resolve(&series, request) {
            Ok((year, value)) if value.is_finite() => Attempt::Candidate { year, value },
            Ok((year, _)) => {
                self.diagnostics.report(Diagnostic::MissingValue {
                    ticker: ticker.to_string(),
                    source,
                    metric,
                    year,
                });
                Attempt::Skip {
                    resolved: Some(year),
                    reason: StrategySkip::MissingValue { year },
                }
            }
            Err(error) => {
                self.diagnostics.report(Diagnostic::YearUnresolved {
                    ticker: ticker.to_string(),
                    source,
                    metric,
                    error,
                });
                Attempt::skip(StrategySkip::YearUnresolved(error))
            }
        }
    }
}

enum Attempt {
    Candidate { year: i32, value: f64 },
    Skip { resolved: Option<i32>, reason: StrategySkip },
}

impl Attempt {
    fn skip(reason: StrategySkip) -> Self {
        Attempt::Skip { resolved: None, reason }
    }
}
