//! Exchange company listings (NASDAQ screener CSV download).
//!
//! One download per exchange:
//!
//! ```text
//! "Symbol","Name","LastSale","MarketCap",...
//! "AAPL","Apple Inc.","172.5","$882.9B",...
//! ```
//!
//! The header row is optional; without it the first two columns are taken as
//! symbol and name. Names arrive with HTML-escaped apostrophes.

use std::collections::BTreeSet;
use std::sync::Arc;

use csv::ReaderBuilder;

use crate::data::transport::Transport;
use crate::data::validate_ticker;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::domain::{Exchange, FetchOutcome, Listing};

pub const DEFAULT_BASE_URL: &str = "https://www.nasdaq.com";

/// Downloads and parses exchange listings over the shared transport.
#[derive(Clone)]
pub struct ListingSource {
    transport: Arc<dyn Transport>,
    diagnostics: Arc<dyn Diagnostics>,
    base_url: String,
}

impl ListingSource {
    pub fn new(transport: Arc<dyn Transport>, diagnostics: Arc<dyn Diagnostics>, base_url: &str) -> Self {
        Self {
            transport,
            diagnostics,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn download_url(&self, exchange: Exchange) -> String {
        format!(
            "{}/screening/companies-by-name.aspx?letter=0&exchange={}&render=download",
            self.base_url,
            exchange.key()
        )
    }

    /// Every listing of one exchange, in download order.
    pub fn fetch(&self, exchange: Exchange) -> Result<Vec<Listing>, FetchOutcome> {
        let url = self.download_url(exchange);
        let failed = |detail: String| Diagnostic::ListingFailed {
            exchange,
            url: url.clone(),
            detail,
        };

        let body = match self.transport.get(&url) {
            Ok(resp) if resp.status == 200 => resp.body,
            Ok(resp) => {
                let outcome = FetchOutcome::from_status(resp.status);
                self.diagnostics.report(failed(outcome.to_string()));
                return Err(outcome);
            }
            Err(err) => {
                self.diagnostics.report(failed(err.to_string()));
                return Err(FetchOutcome::TransientError {
                    status: None,
                    message: err.to_string(),
                });
            }
        };

        let (listings, bad_rows) = parse_listings(&body, exchange);
        if bad_rows > 0 {
            self.diagnostics.report(failed(format!("{bad_rows} unreadable rows skipped")));
        }
        if listings.is_empty() {
            self.diagnostics.report(failed("download lists no companies".to_string()));
            return Err(FetchOutcome::NotFound);
        }
        Ok(listings)
    }

    /// Listings of several exchanges, first occurrence of a symbol wins.
    ///
    /// Exchanges that fail are skipped (their failure is already reported).
    pub fn fetch_all(&self, exchanges: &[Exchange]) -> Vec<Listing> {
        let mut seen = BTreeSet::new();
        exchanges
            .iter()
            .filter_map(|exchange| self.fetch(*exchange).ok())
            .flatten()
            .filter(|listing| seen.insert(listing.symbol.clone()))
            .collect()
    }
}

fn unescape_name(raw: &str) -> String {
    raw.replace("&#39;", "'").replace("&amp;", "&")
}

/// Parse one exchange download. Returns the listings and the number of rows
/// the CSV reader rejected.
///
/// Symbols that are not valid tickers (preferred shares such as `BAC^A`,
/// warrants with spaces) are left out.
pub fn parse_listings(body: &str, exchange: Exchange) -> (Vec<Listing>, usize) {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut listings = Vec::new();
    let mut bad_rows = 0;
    let mut columns: Option<(usize, usize)> = None;

    for record in rdr.records() {
        let record = match record {
            Ok(r) => r,
            Err(_) => {
                bad_rows += 1;
                continue;
            }
        };

        let (symbol_idx, name_idx) = match columns {
            Some(cols) => cols,
            None => {
                let position = |label: &str| record.iter().position(|c| c.eq_ignore_ascii_case(label));
                match (position("Symbol"), position("Name")) {
                    (Some(symbol), Some(name)) => {
                        columns = Some((symbol, name));
                        continue;
                    }
                    _ => *columns.insert((0, 1)),
                }
            }
        };

        let Some(symbol) = record.get(symbol_idx).and_then(validate_ticker) else {
            continue;
        };
        listings.push(Listing {
            symbol: symbol.to_ascii_uppercase(),
            name: unescape_name(record.get(name_idx).unwrap_or_default()),
            exchange,
        });
    }

    (listings, bad_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::transport::{CannedTransport, TransportError};
    use crate::diagnostics::RecordingDiagnostics;

    const NASDAQ: &str = "\
\"Symbol\",\"Name\",\"LastSale\",\"MarketCap\",
\"AAPL\",\"Apple Inc.\",\"172.5\",\"$882.9B\",
\"MSFT\",\"Microsoft Corporation\",\"85.5\",\"$659.9B\",
\"BAC^A\",\"Bank of America Preferred\",\"25.1\",\"n/a\",
";

    const NYSE: &str = "\
\"Symbol\",\"Name\",\"LastSale\",
\"BRK.B\",\"Berkshire Hathaway Inc.\",\"199.8\",
\"MCD\",\"McDonald&#39;s Corporation\",\"171.0\",
\"MSFT\",\"Microsoft Corporation\",\"85.5\",
";

    fn url(exchange: &str) -> String {
        format!("http://nasdaq.test/screening/companies-by-name.aspx?letter=0&exchange={exchange}&render=download")
    }

    fn source(transport: CannedTransport, diag: Arc<RecordingDiagnostics>) -> ListingSource {
        ListingSource::new(Arc::new(transport), diag, "http://nasdaq.test/")
    }

    #[test]
    fn reads_symbols_and_names_after_the_header() {
        let (listings, bad) = parse_listings(NYSE, Exchange::Nyse);
        assert_eq!(bad, 0);
        assert_eq!(listings.len(), 3);
        assert_eq!(listings[0].symbol, "BRK.B");
        assert_eq!(listings[1].name, "McDonald's Corporation");
        assert_eq!(listings[2].exchange, Exchange::Nyse);
    }

    #[test]
    fn headerless_download_uses_leading_columns() {
        let (listings, _) = parse_listings("ge,General Electric Company,14.2\n", Exchange::Nyse);
        assert_eq!(
            listings,
            [Listing {
                symbol: "GE".into(),
                name: "General Electric Company".into(),
                exchange: Exchange::Nyse,
            }]
        );
    }

    #[test]
    fn merges_exchanges_and_skips_failures() {
        let transport = CannedTransport::new()
            .page(&url("nasdaq"), NASDAQ)
            .page(&url("nyse"), NYSE)
            .failure(&url("amex"), TransportError::Timeout("30s".into()));
        let diag = Arc::new(RecordingDiagnostics::default());
        let listings = source(transport, Arc::clone(&diag)).fetch_all(&Exchange::ALL);

        let symbols: Vec<&str> = listings.iter().map(|l| l.symbol.as_str()).collect();
        assert_eq!(symbols, ["AAPL", "MSFT", "BRK.B", "MCD"]);
        assert_eq!(listings[1].exchange, Exchange::Nasdaq);
        assert_eq!(
            diag.count(|e| matches!(e, Diagnostic::ListingFailed { exchange: Exchange::Amex, .. })),
            1
        );
    }

    #[test]
    fn empty_or_missing_download_is_not_found() {
        let transport = CannedTransport::new().page(&url("amex"), "\"Symbol\",\"Name\"\n");
        let diag = Arc::new(RecordingDiagnostics::default());
        let listings = source(transport, Arc::clone(&diag));

        assert_eq!(listings.fetch(Exchange::Amex), Err(FetchOutcome::NotFound));
        assert_eq!(listings.fetch(Exchange::Nyse), Err(FetchOutcome::NotFound));
        assert_eq!(diag.events().len(), 2);
    }
}
