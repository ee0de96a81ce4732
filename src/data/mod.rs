//! Source adapters: fetch one provider's statements for a ticker and normalize
//! them to `data[field][year] = value`.
//!
//! - `fmp`: FinancialModelingPrep JSON (millions)
//! - `barchart`: Barchart HTML tables (thousands)
//! - `iex`: IEX Trading JSON (absolute units)
//! - `morningstar`: Morningstar CSV export (unit declared in the header)
//!
//! `listings` downloads exchange company lists, the ticker universe for batch
//! runs.
//!
//! Adapters share the transport seam (`transport`) and the normalization
//! helpers (`normalize`); there is no adapter hierarchy.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::SourceConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::domain::{FetchOutcome, SourceId};

pub mod barchart;
pub mod fmp;
pub mod iex;
pub mod listings;
pub mod morningstar;
pub mod normalize;
pub mod transport;

pub use barchart::BarchartAdapter;
pub use fmp::FmpAdapter;
pub use iex::IexAdapter;
pub use listings::ListingSource;
pub use morningstar::MorningstarAdapter;
pub use transport::{HttpResponse, HttpTransport, Transport, TransportError};

/// Fetch raw external data for a ticker and expose it normalized.
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> SourceId;

    /// Contact the source once (one request per statement page).
    ///
    /// Never retries and never panics on bad data: every failure is expressed
    /// as a non-success [`FetchOutcome`].
    fn fetch(&self, ticker: &str) -> FetchOutcome;
}

/// Validate a ticker symbol before any network access.
///
/// Accepts ASCII alphanumerics plus `.` and `-` (e.g. `BRK.B`, `RDS-A`).
pub fn validate_ticker(raw: &str) -> Option<&str> {
    let ticker = raw.trim();
    let valid = !ticker.is_empty()
        && ticker.len() <= 12
        && ticker.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    valid.then_some(ticker)
}

/// GET one statement page, mapping every non-200 result to a [`FetchOutcome`]
/// and reporting it.
pub(crate) fn get_page(
    transport: &dyn Transport,
    diagnostics: &dyn Diagnostics,
    ticker: &str,
    source: SourceId,
    url: &str,
) -> Result<String, FetchOutcome> {
    let failure = |status: u16, detail: String| Diagnostic::FetchFailed {
        ticker: ticker.to_string(),
        source,
        url: url.to_string(),
        status,
        detail,
    };

    match transport.get(url) {
        Ok(resp) if resp.status == 200 => Ok(resp.body),
        Ok(resp) => {
            let outcome = FetchOutcome::from_status(resp.status);
            diagnostics.report(failure(resp.status, outcome.to_string()));
            Err(outcome)
        }
        Err(err) => {
            diagnostics.report(failure(0, err.to_string()));
            Err(FetchOutcome::TransientError {
                status: None,
                message: err.to_string(),
            })
        }
    }
}

/// The set of adapters available to the metric calculator, keyed by source.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    adapters: BTreeMap<SourceId, Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the adapter for its source.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, id: SourceId) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.adapters.keys().copied()
    }

    /// Every known source wired to a shared transport and diagnostics sink.
    pub fn standard(
        config: &SourceConfig,
        transport: Arc<dyn Transport>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self::new()
            .with(Arc::new(FmpAdapter::new(
                Arc::clone(&transport),
                Arc::clone(&diagnostics),
                &config.fmp_base_url,
                config.fmp_api_key.clone(),
            )))
            .with(Arc::new(BarchartAdapter::new(
                Arc::clone(&transport),
                Arc::clone(&diagnostics),
                &config.barchart_base_url,
            )))
            .with(Arc::new(IexAdapter::new(
                Arc::clone(&transport),
                Arc::clone(&diagnostics),
                &config.iex_base_url,
            )))
            .with(Arc::new(MorningstarAdapter::new(
                transport,
                diagnostics,
                &config.morningstar_base_url,
            )))
    }
}
