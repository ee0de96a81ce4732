//! Observability collaborator for non-fatal anomalies.
//!
//! Adapters and the metric calculator never log directly: they receive an
//! `Arc<dyn Diagnostics>` at construction and report structured events to it.
//! The binary wires in [`TracingDiagnostics`]; tests record events instead.

use std::fmt;

use crate::domain::{Exchange, Metric, SourceId};
use crate::recon::year::YearLookupError;

/// A non-fatal anomaly observed while fetching, normalizing or reconciling.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A cell that still failed numeric parsing after cleansing (stored as NaN).
    BadValue {
        ticker: String,
        source: SourceId,
        field: String,
        raw: String,
    },
    /// A row whose value count does not match the date count (row dropped).
    ShapeMismatch {
        ticker: String,
        source: SourceId,
        field: String,
        dates: usize,
        values: usize,
    },
    /// A response body that could not be interpreted at all.
    UnreadableBody {
        ticker: String,
        source: SourceId,
        detail: String,
    },
    /// A page request that did not return 200.
    FetchFailed {
        ticker: String,
        source: SourceId,
        url: String,
        status: u16,
        detail: String,
    },
    /// An exchange listing download that failed or could not be read.
    ListingFailed {
        exchange: Exchange,
        url: String,
        detail: String,
    },
    /// A strategy could not find a field it needs.
    MissingField {
        ticker: String,
        source: SourceId,
        metric: Metric,
        field: String,
    },
    /// A strategy could not resolve the requested year.
    YearUnresolved {
        ticker: String,
        source: SourceId,
        metric: Metric,
        error: YearLookupError,
    },
    /// The resolved year holds a known-missing (NaN) value.
    MissingValue {
        ticker: String,
        source: SourceId,
        metric: Metric,
        year: i32,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::BadValue { ticker, source, field, raw } => {
                write!(f, "got bad value for {ticker} at {source}: '{raw}' for field '{field}'")
            }
            Diagnostic::ShapeMismatch {
                ticker,
                source,
                field,
                dates,
                values,
            } => write!(
                f,
                "length of dates does not match length of values for {ticker} at {source} \
                 (field '{field}': {dates} dates, {values} values)"
            ),
            Diagnostic::UnreadableBody { ticker, source, detail } => {
                write!(f, "failed to read {source} data for {ticker}: {detail}")
            }
            Diagnostic::FetchFailed {
                ticker,
                source,
                url,
                status,
                detail,
            } => write!(f, "failed to retrieve {source} data for {ticker} from {url} ({status}): {detail}"),
            Diagnostic::ListingFailed { exchange, url, detail } => {
                write!(f, "failed to retrieve {exchange} listings from {url}: {detail}")
            }
            Diagnostic::MissingField {
                ticker,
                source,
                metric,
                field,
            } => write!(
                f,
                "failed to find field '{field}' for {ticker} at {source} ({})",
                metric.display_name()
            ),
            Diagnostic::YearUnresolved {
                ticker,
                source,
                metric,
                error,
            } => write!(
                f,
                "error calculating {} for {ticker} from {source}: {error}",
                metric.display_name()
            ),
            Diagnostic::MissingValue {
                ticker,
                source,
                metric,
                year,
            } => write!(
                f,
                "{source} reports no {} value for {ticker} in {year}",
                metric.display_name()
            ),
        }
    }
}

/// Sink for [`Diagnostic`] events.
pub trait Diagnostics: Send + Sync {
    fn report(&self, event: Diagnostic);
}

/// Forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, event: Diagnostic) {
        match &event {
            Diagnostic::BadValue { source, .. } | Diagnostic::UnreadableBody { source, .. } => {
                tracing::warn!(source = source.key(), "{event}");
            }
            Diagnostic::ShapeMismatch { source, .. } => {
                tracing::error!(source = source.key(), "{event}");
            }
            Diagnostic::FetchFailed { source, status, .. } => {
                tracing::error!(source = source.key(), status, "{event}");
            }
            Diagnostic::ListingFailed { exchange, .. } => {
                tracing::error!(exchange = exchange.key(), "{event}");
            }
            Diagnostic::MissingField { source, .. }
            | Diagnostic::YearUnresolved { source, .. }
            | Diagnostic::MissingValue { source, .. } => {
                tracing::info!(source = source.key(), "{event}");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn report(&self, _event: Diagnostic) {}
}

#[cfg(test)]
pub(crate) use recording::RecordingDiagnostics;
