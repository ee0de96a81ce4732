//! Morningstar income statement CSV export.
//!
//! Layout:
//!
//! ```text
//! Apple Inc (AAPL) Income Statement
//! Fiscal year ends in September. USD in millions except per share data.,2016-09,2017-09,TTM
//! Revenue,215639,229234,239176
//! Earnings per share
//! Diluted,8.31,9.21,9.70
//! Weighted average shares outstanding
//! Diluted,5500,5252,5217
//! ```
//!
//! The first row is a title and the second declares the unit and lists the
//! periods (`YYYY-MM`, plus a trailing `TTM` that is ignored). Per-share rows
//! are not labelled as such: a `Diluted`/`Basic` row whose first numeric value
//! has a decimal point is EPS, otherwise it is a share count.

use std::sync::Arc;

use csv::ReaderBuilder;

use crate::data::normalize::{Normalizer, Scale, parse_cell, parse_fiscal_period};
use crate::data::transport::Transport;
use crate::data::{SourceAdapter, get_page, validate_ticker};
use crate::diagnostics::Diagnostics;
use crate::domain::{FetchOutcome, NormalizedDataset, SourceId};

pub const DEFAULT_BASE_URL: &str = "http://financials.morningstar.com";

const PERIOD_FORMAT: &str = "%Y-%m";

pub struct MorningstarAdapter {
    transport: Arc<dyn Transport>,
    diagnostics: Arc<dyn Diagnostics>,
    base_url: String,
}

impl MorningstarAdapter {
    pub fn new(transport: Arc<dyn Transport>, diagnostics: Arc<dyn Diagnostics>, base_url: &str) -> Self {
        Self {
            transport,
            diagnostics,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn export_url(&self, ticker: &str) -> String {
        format!(
            "{}/ajax/ReportProcess4CSV.html?t={ticker}&reportType=is&period=12&dataType=A&order=asc&columnYear=5&number=3",
            self.base_url
        )
    }
}

impl SourceAdapter for MorningstarAdapter {
    fn id(&self) -> SourceId {
        SourceId::Morningstar
    }

    fn fetch(&self, ticker: &str) -> FetchOutcome {
        let Some(ticker) = validate_ticker(ticker) else {
            return FetchOutcome::InvalidTicker;
        };
        let url = self.export_url(ticker);
        let body = match get_page(
            self.transport.as_ref(),
            self.diagnostics.as_ref(),
            ticker,
            SourceId::Morningstar,
            &url,
        ) {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };

        let norm = Normalizer::new(ticker, SourceId::Morningstar, self.diagnostics.as_ref());
        let dataset = parse_export(&body, &norm);
        if dataset.is_empty() {
            FetchOutcome::NotFound
        } else {
            FetchOutcome::Success(dataset)
        }
    }
}

fn header_scale(label: &str) -> Scale {
    if label.to_ascii_lowercase().contains("thousands") {
        Scale::Thousands
    } else {
        Scale::Millions
    }
}

/// Name a `Diluted`/`Basic` row after what its values turn out to be.
///
/// Placeholders carry no decimal point, so the first cell holding a number
/// decides.
fn qualify_field(field: &str, raw: &[&str], scale: Scale) -> (String, Scale) {
    let lower = field.to_ascii_lowercase();
    if !(lower.contains("diluted") || lower.contains("basic")) {
        return (field.to_string(), scale);
    }
    let first_number = raw
        .iter()
        .find(|cell| parse_cell(cell).is_ok_and(|v| !v.is_nan()))
        .copied()
        .unwrap_or_default();
    if first_number.contains('.') {
        (format!("{field} EPS"), Scale::Units)
    } else {
        (format!("{field} average shares outstanding"), scale)
    }
}

pub fn parse_export(body: &str, norm: &Normalizer<'_>) -> NormalizedDataset {
    let mut dataset = NormalizedDataset::new();
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut records = rdr.records();
    // Title row.
    if records.next().is_none() {
        norm.unreadable("empty export");
        return dataset;
    }
    let header = match records.next() {
        Some(Ok(header)) => header,
        Some(Err(e)) => {
            norm.unreadable(format!("unreadable header row: {e}"));
            return dataset;
        }
        None => {
            norm.unreadable("export has no header row");
            return dataset;
        }
    };

    let scale = header_scale(header.get(0).unwrap_or_default());
    // Column index paired with its fiscal year; TTM and other labels drop out.
    let columns: Vec<(usize, i32)> = header
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(idx, label)| {
            let (year, month) = parse_fiscal_period(label, PERIOD_FORMAT)?;
            dataset.set_report_month(month);
            Some((idx, year))
        })
        .collect();
    if columns.is_empty() {
        norm.unreadable("header lists no fiscal periods");
        return dataset;
    }
    let years: Vec<i32> = columns.iter().map(|(_, year)| *year).collect();

    for record in records {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                norm.unreadable(format!("bad CSV row: {e}"));
                continue;
            }
        };
        let Some(field) = record.get(0).filter(|f| !f.is_empty()) else {
            continue;
        };
        // Section headings have no values.
        if record.len() <= 1 {
            continue;
        }

        let raw: Vec<&str> = columns.iter().filter_map(|(idx, _)| record.get(*idx)).collect();
        let (field, row_scale) = qualify_field(field, &raw, scale);
        let values: Vec<f64> = raw.iter().map(|cell| norm.cell(&field, cell, row_scale)).collect();
        norm.row(&mut dataset, &field, &years, &values);
    }

    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::transport::CannedTransport;
    use crate::diagnostics::{Diagnostic, RecordingDiagnostics};

    const EXPORT: &str = "\
Apple Inc (AAPL) Income Statement
Fiscal year ends in September. USD in millions except per share data.,2016-09,2017-09,TTM
Revenue,215639,229234,239176
Earnings per share
Diluted,8.31,9.21,9.70
Weighted average shares outstanding
Diluted,5500,5252,5217
Truncated,1
";

    const URL: &str = "http://ms.test/ajax/ReportProcess4CSV.html?t=AAPL&reportType=is&period=12&dataType=A&order=asc&columnYear=5&number=3";

    fn morningstar(transport: CannedTransport, diag: Arc<RecordingDiagnostics>) -> MorningstarAdapter {
        MorningstarAdapter::new(Arc::new(transport), diag, "http://ms.test")
    }

    #[test]
    fn splits_eps_from_share_counts_and_drops_ttm() {
        let diag = Arc::new(RecordingDiagnostics::default());
        let outcome = morningstar(CannedTransport::new().page(URL, EXPORT), Arc::clone(&diag)).fetch("AAPL");
        let data = outcome.dataset().expect("success");

        let revenue = data.field("Revenue").unwrap();
        assert_eq!(revenue.len(), 2);
        assert_eq!(revenue[&2017], 229_234e6);

        assert_eq!(data.field("Diluted EPS").unwrap()[&2017], 9.21);
        assert_eq!(data.field("Diluted average shares outstanding").unwrap()[&2016], 5_500e6);
        assert!(data.field("Earnings per share").is_none());
        assert_eq!(data.report_month(), Some(9));

        assert!(data.field("Truncated").is_none());
        assert_eq!(diag.count(|e| matches!(e, Diagnostic::ShapeMismatch { .. })), 1);
    }

    #[test]
    fn leading_placeholder_does_not_decide_eps_rows() {
        let body = "\
Title
USD in millions except per share data.,2016-09,2017-09,TTM
Diluted,—,9.21,9.70
Diluted,5500,5252,5217
";
        let diag = RecordingDiagnostics::default();
        let norm = Normalizer::new("AAPL", SourceId::Morningstar, &diag);
        let data = parse_export(body, &norm);

        let eps = data.field("Diluted EPS").expect("EPS row kept");
        assert!(eps[&2016].is_nan());
        assert_eq!(eps[&2017], 9.21);
        assert_eq!(data.field("Diluted average shares outstanding").unwrap()[&2017], 5_252e6);
        assert_eq!(data.fields().count(), 2);
    }

    #[test]
    fn thousands_header_is_honoured() {
        let body = "Title\nUSD in thousands except per share data.,2017-12\nRevenue,1500\n";
        let diag = RecordingDiagnostics::default();
        let norm = Normalizer::new("XYZ", SourceId::Morningstar, &diag);
        assert_eq!(parse_export(body, &norm).field("Revenue").unwrap()[&2017], 1_500_000.0);
    }

    #[test]
    fn empty_export_is_not_found() {
        let diag = Arc::new(RecordingDiagnostics::default());
        let outcome = morningstar(CannedTransport::new().page(URL, ""), Arc::clone(&diag)).fetch("AAPL");
        assert_eq!(outcome, FetchOutcome::NotFound);
        assert_eq!(diag.count(|e| matches!(e, Diagnostic::UnreadableBody { .. })), 1);
    }
}
