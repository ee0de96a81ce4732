//! FinancialModelingPrep integration (financial statements API v1.0).
//!
//! Two statement pages are fetched per ticker (income statement and balance
//! sheet). Each is shaped as:
//!
//! ```text
//! { "AAPL": { "Revenue": { "2016-09": "215639", "2017-09": "229234" }, ... } }
//! ```
//!
//! Values are reported in millions (per-share rows excepted) and periods as
//! `YYYY-MM`. Responses are sometimes wrapped in HTML, which is stripped first.

use std::sync::Arc;

use serde_json::Value;

use crate::data::normalize::{Normalizer, Scale, parse_fiscal_period, strip_markup};
use crate::data::transport::Transport;
use crate::data::{SourceAdapter, get_page, validate_ticker};
use crate::diagnostics::Diagnostics;
use crate::domain::{FetchOutcome, NormalizedDataset, SourceId};

pub const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com/api";

const STATEMENTS: [&str; 2] = ["income-statement", "balance-sheet-statement"];
const PERIOD_FORMAT: &str = "%Y-%m";

pub struct FmpAdapter {
    transport: Arc<dyn Transport>,
    diagnostics: Arc<dyn Diagnostics>,
    base_url: String,
    api_key: Option<String>,
}

impl FmpAdapter {
    pub fn new(
        transport: Arc<dyn Transport>,
        diagnostics: Arc<dyn Diagnostics>,
        base_url: &str,
        api_key: Option<String>,
    ) -> Self {
        Self {
            transport,
            diagnostics,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn statement_url(&self, statement: &str, ticker: &str) -> String {
        let url = format!("{}/financials/{statement}/{ticker}", self.base_url);
        match &self.api_key {
            Some(key) => format!("{url}?apikey={key}"),
            None => url,
        }
    }
}

impl SourceAdapter for FmpAdapter {
    fn id(&self) -> SourceId {
        SourceId::Fmp
    }

    fn fetch(&self, ticker: &str) -> FetchOutcome {
        let Some(ticker) = validate_ticker(ticker) else {
            return FetchOutcome::InvalidTicker;
        };
        let norm = Normalizer::new(ticker, SourceId::Fmp, self.diagnostics.as_ref());

        let mut dataset = NormalizedDataset::new();
        for statement in STATEMENTS {
            let url = self.statement_url(statement, ticker);
            let body = match get_page(self.transport.as_ref(), self.diagnostics.as_ref(), ticker, SourceId::Fmp, &url) {
                Ok(body) => body,
                Err(outcome) => return outcome,
            };
            if let Some(statement_data) = parse_statement(&body, ticker, &norm) {
                dataset.merge(statement_data);
            }
        }

        if dataset.is_empty() {
            FetchOutcome::NotFound
        } else {
            FetchOutcome::Success(dataset)
        }
    }
}

/// Parse one statement page. `None` when the body holds no data for `ticker`.
pub fn parse_statement(body: &str, ticker: &str, norm: &Normalizer<'_>) -> Option<NormalizedDataset> {
    let json: Value = match serde_json::from_str(&strip_markup(body)) {
        Ok(v) => v,
        Err(e) => {
            norm.unreadable(format!("invalid JSON: {e}"));
            return None;
        }
    };

    let fields = match json.get(ticker).and_then(Value::as_object) {
        Some(fields) if !fields.is_empty() => fields,
        _ => {
            norm.unreadable(format!("no statement data under key '{ticker}'"));
            return None;
        }
    };

    let mut dataset = NormalizedDataset::new();
    for (field, periods) in fields {
        let Some(periods) = periods.as_object() else {
            norm.unreadable(format!("field '{field}' is not a period map"));
            continue;
        };
        let scale = Scale::Millions.for_field(field);
        for (period, raw) in periods {
            // Non-date keys (e.g. "TTM") are not fiscal years.
            let Some((year, month)) = parse_fiscal_period(period, PERIOD_FORMAT) else {
                continue;
            };
            dataset.insert(field.as_str(), year, norm.json_value(field, raw, scale));
            dataset.set_report_month(month);
        }
    }

    (!dataset.is_empty()).then_some(dataset)
}
