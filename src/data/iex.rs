//! IEX Trading financials API.
//!
//! One request per ticker. Each entry of `financials` is one fiscal year:
//!
//! ```text
//! { "symbol": "AAPL", "financials": [ { "reportDate": "2017-09-30", "totalRevenue": 229234000000, ... } ] }
//! ```
//!
//! Values are already in absolute units; `null` marks a missing value.

use std::sync::Arc;

use serde_json::Value;

use crate::data::normalize::{Normalizer, Scale, parse_fiscal_period, strip_markup};
use crate::data::transport::Transport;
use crate::data::{SourceAdapter, get_page, validate_ticker};
use crate::diagnostics::Diagnostics;
use crate::domain::{FetchOutcome, NormalizedDataset, SourceId};

pub const DEFAULT_BASE_URL: &str = "https://api.iextrading.com/1.0";

const REPORT_DATE_KEY: &str = "reportDate";
const REPORT_DATE_FORMAT: &str = "%Y-%m-%d";

pub struct IexAdapter {
    transport: Arc<dyn Transport>,
    diagnostics: Arc<dyn Diagnostics>,
    base_url: String,
}

impl IexAdapter {
    pub fn new(transport: Arc<dyn Transport>, diagnostics: Arc<dyn Diagnostics>, base_url: &str) -> Self {
        Self {
            transport,
            diagnostics,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn financials_url(&self, ticker: &str) -> String {
        format!("{}/stock/{ticker}/financials?period=annual", self.base_url)
    }
}

impl SourceAdapter for IexAdapter {
    fn id(&self) -> SourceId {
        SourceId::Iex
    }

    fn fetch(&self, ticker: &str) -> FetchOutcome {
        let Some(ticker) = validate_ticker(ticker) else {
            return FetchOutcome::InvalidTicker;
        };
        let url = self.financials_url(ticker);
        let body = match get_page(self.transport.as_ref(), self.diagnostics.as_ref(), ticker, SourceId::Iex, &url) {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };

        let norm = Normalizer::new(ticker, SourceId::Iex, self.diagnostics.as_ref());
        match parse_financials(&body, &norm) {
            Some(dataset) => FetchOutcome::Success(dataset),
            None => FetchOutcome::NotFound,
        }
    }
}

pub fn parse_financials(body: &str, norm: &Normalizer<'_>) -> Option<NormalizedDataset> {
    let json: Value = match serde_json::from_str(&strip_markup(body)) {
        Ok(v) => v,
        Err(e) => {
            norm.unreadable(format!("invalid JSON: {e}"));
            return None;
        }
    };

    let Some(years) = json.get("financials").and_then(Value::as_array) else {
        norm.unreadable("missing `financials` array");
        return None;
    };

    let mut dataset = NormalizedDataset::new();
    for entry in years {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        let period = entry
            .get(REPORT_DATE_KEY)
            .and_then(Value::as_str)
            .and_then(|d| parse_fiscal_period(d, REPORT_DATE_FORMAT));
        let Some((year, month)) = period else {
            norm.unreadable(format!("entry without a valid `{REPORT_DATE_KEY}`"));
            continue;
        };

        for (key, value) in entry {
            if key == REPORT_DATE_KEY {
                continue;
            }
            dataset.insert(key.as_str(), year, norm.json_value(key, value, Scale::Units));
        }
        dataset.set_report_month(month);
    }

    (!dataset.is_empty()).then_some(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::transport::CannedTransport;
    use crate::diagnostics::{Diagnostic, RecordingDiagnostics};

    const FINANCIALS: &str = r#"{"symbol": "AAPL", "financials": [
        {"reportDate": "2017-09-30", "totalRevenue": 229234000000, "shareholderEquity": 134047000000, "netIncome": null},
        {"reportDate": "2016-09-24", "totalRevenue": "215639000000", "shareholderEquity": 128249000000, "netIncome": true}
    ]}"#;

    fn iex(transport: CannedTransport, diag: Arc<RecordingDiagnostics>) -> IexAdapter {
        IexAdapter::new(Arc::new(transport), diag, "http://iex.test/1.0")
    }

    #[test]
    fn parses_one_entry_per_fiscal_year() {
        let transport =
            CannedTransport::new().page("http://iex.test/1.0/stock/AAPL/financials?period=annual", FINANCIALS);
        let diag = Arc::new(RecordingDiagnostics::default());
        let outcome = iex(transport, Arc::clone(&diag)).fetch("AAPL");
        let data = outcome.dataset().expect("success");

        let revenue = data.field("totalRevenue").unwrap();
        assert_eq!(revenue[&2017], 229_234_000_000.0);
        assert_eq!(revenue[&2016], 215_639_000_000.0);
        assert_eq!(data.report_month(), Some(9));

        let net = data.field("netIncome").unwrap();
        assert!(net[&2017].is_nan());
        assert!(net[&2016].is_nan());
        assert_eq!(diag.count(|e| matches!(e, Diagnostic::BadValue { .. })), 1);
    }

    #[test]
    fn unreadable_body_is_not_found() {
        let transport = CannedTransport::new()
            .page("http://iex.test/1.0/stock/AAPL/financials?period=annual", "Unknown symbol");
        let diag = Arc::new(RecordingDiagnostics::default());
        assert_eq!(iex(transport, Arc::clone(&diag)).fetch("AAPL"), FetchOutcome::NotFound);
        assert_eq!(diag.count(|e| matches!(e, Diagnostic::UnreadableBody { .. })), 1);
    }

    #[test]
    fn redirect_is_reported_not_followed() {
        let transport =
            CannedTransport::new().status("http://iex.test/1.0/stock/WPXP/financials?period=annual", 302);
        let diag = Arc::new(RecordingDiagnostics::default());
        assert_eq!(
            iex(transport, diag).fetch("WPXP"),
            FetchOutcome::Redirected { status: 302 }
        );
    }
}
