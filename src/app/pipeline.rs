//! Shared workflow behind the CLI commands.
//!
//! Keeping this in one place avoids duplicating the wiring:
//! config -> transport -> source registry -> calculator -> fan-out
//! (plus the exchange listings that can stand in for an explicit ticker list)
//!
//! The command handlers in `app` then focus on presentation and exports.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::data::{HttpTransport, ListingSource, SourceRegistry, Transport};
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::domain::{Exchange, FetchOutcome, Listing, Metric, NormalizedDataset, SourceId, YearRequest};
use crate::error::AppError;
use crate::fanout::{FanOut, FanOutReport, TaskOutcome};
use crate::growth::{GrowthRate, growth_rates};
use crate::recon::{MetricCalculator, MetricReport, YearResolver};

/// Long-lived collaborators for one process.
#[derive(Clone)]
pub struct Services {
    pub calculator: MetricCalculator,
    pub listings: ListingSource,
    pub workers: Option<usize>,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.http_timeout, &config.user_agent)?);
        let diagnostics: Arc<dyn Diagnostics> = Arc::new(TracingDiagnostics);
        Ok(Self::with_parts(config, transport, diagnostics, YearResolver::from_clock()))
    }

    pub fn with_parts(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        diagnostics: Arc<dyn Diagnostics>,
        resolver: YearResolver,
    ) -> Self {
        let listings = ListingSource::new(
            Arc::clone(&transport),
            Arc::clone(&diagnostics),
            &config.sources.listings_base_url,
        );
        let sources = SourceRegistry::standard(&config.sources, transport, Arc::clone(&diagnostics));
        Self {
            calculator: MetricCalculator::new(sources, resolver, diagnostics),
            listings,
            workers: config.workers,
        }
    }

    pub fn sources(&self) -> &SourceRegistry {
        self.calculator.sources()
    }
}

/// What to compute for every ticker in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricRequest {
    pub metric: Metric,
    pub year: YearRequest,
    pub redundancy: usize,
}

/// One row per requested ticker, in request order.
#[derive(Debug, Clone)]
pub struct MetricRun {
    pub request: MetricRequest,
    pub rows: Vec<(String, TaskOutcome<MetricReport>)>,
    pub elapsed: Duration,
}

/// Compute `request` for every ticker concurrently.
pub fn run_metrics(
    services: &Services,
    tickers: &[String],
    request: MetricRequest,
    workers: Option<usize>,
    deadline: Option<Duration>,
) -> Result<MetricRun, AppError> {
    let fanout = FanOut::new().workers(workers.or(services.workers)).deadline(deadline);
    let FanOutReport { outcomes, elapsed } = fanout.run(tickers, |ticker| {
        services
            .calculator
            .compute_report(request.metric, ticker, request.year, request.redundancy)
    })?;

    Ok(MetricRun {
        request,
        rows: tickers.iter().cloned().zip(outcomes).collect(),
        elapsed,
    })
}

/// Listings of `exchanges`; an error when no exchange could be downloaded.
pub fn list_tickers(services: &Services, exchanges: &[Exchange]) -> Result<Vec<Listing>, AppError> {
    let listings = services.listings.fetch_all(exchanges);
    if listings.is_empty() {
        return Err(AppError::runtime("No exchange listings could be retrieved."));
    }
    Ok(listings)
}

/// Explicit tickers first, then every listed symbol not already named.
pub fn resolve_tickers(
    services: &Services,
    explicit: &[String],
    exchanges: &[Exchange],
) -> Result<Vec<String>, AppError> {
    if exchanges.is_empty() {
        return Ok(explicit.to_vec());
    }
    let mut seen: BTreeSet<String> = explicit.iter().cloned().collect();
    let mut tickers = explicit.to_vec();
    for listing in list_tickers(services, exchanges)? {
        if seen.insert(listing.symbol.clone()) {
            tickers.push(listing.symbol);
        }
    }
    Ok(tickers)
}

pub fn fetch_dataset(services: &Services, ticker: &str, source: SourceId) -> Result<FetchOutcome, AppError> {
    let adapter = services
        .sources()
        .get(source)
        .ok_or_else(|| AppError::runtime(format!("Source {source} is not configured.")))?;
    Ok(adapter.fetch(ticker))
}

/// Growth of `field` in `dataset`; errors when the field is absent.
pub fn field_growth(
    dataset: &NormalizedDataset,
    field: &str,
    end_year: Option<i32>,
    deltas: &[u32],
) -> Result<Vec<GrowthRate>, AppError> {
    let series = dataset.field(field).ok_or_else(|| {
        let known: Vec<&str> = dataset.field_names().collect();
        AppError::runtime(format!("Field '{field}' not found. Available: {}", known.join(", ")))
    })?;
    Ok(growth_rates(series, end_year, deltas))
}

/// Load a dataset for growth: from a saved JSON dump or a live fetch.
pub fn load_dataset(
    services: &Services,
    ticker: &str,
    source: Option<SourceId>,
    saved: Option<&Path>,
) -> Result<NormalizedDataset, AppError> {
    if let Some(path) = saved {
        return crate::io::dataset::read_dataset_json(path);
    }
    let source = source.ok_or_else(|| AppError::config("Either --source or --dataset is required."))?;
    let outcome = fetch_dataset(services, ticker, source)?;
    let status = outcome.status_code();
    outcome
        .into_dataset()
        .ok_or_else(|| AppError::runtime(format!("{source} returned no data for {ticker} (status {status}).")))
}
