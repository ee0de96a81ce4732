//! Barchart.com annual financial statements (HTML).
//!
//! Two pages per ticker: balance sheet (used for equity and shares
//! outstanding) and income statement (sales, diluted EPS). Each page holds one
//! table whose date row (`tr` with a class containing `date`) lists periods as
//! `MM-YYYY`; every other row is `<td>field</td><td>value</td>...`.
//!
//! Barchart reports amounts in thousands; per-share rows are left as-is.

use std::sync::{Arc, LazyLock};

use scraper::{ElementRef, Html, Selector};

use crate::data::normalize::{Normalizer, Scale, parse_fiscal_period};
use crate::data::transport::Transport;
use crate::data::{SourceAdapter, get_page, validate_ticker};
use crate::diagnostics::Diagnostics;
use crate::domain::{FetchOutcome, NormalizedDataset, SourceId};

pub const DEFAULT_BASE_URL: &str = "https://www.barchart.com";

const PAGES: [&str; 2] = ["balance-sheet", "income-statement"];
const DATE_FORMAT: &str = "%m-%Y";

static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector")
}

pub struct BarchartAdapter {
    transport: Arc<dyn Transport>,
    diagnostics: Arc<dyn Diagnostics>,
    base_url: String,
}

impl BarchartAdapter {
    pub fn new(transport: Arc<dyn Transport>, diagnostics: Arc<dyn Diagnostics>, base_url: &str) -> Self {
        Self {
            transport,
            diagnostics,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn page_url(&self, page: &str, ticker: &str) -> String {
        format!("{}/stocks/quotes/{ticker}/{page}/annual", self.base_url)
    }
}

impl SourceAdapter for BarchartAdapter {
    fn id(&self) -> SourceId {
        SourceId::Barchart
    }

    fn fetch(&self, ticker: &str) -> FetchOutcome {
        let Some(ticker) = validate_ticker(ticker) else {
            return FetchOutcome::InvalidTicker;
        };
        let norm = Normalizer::new(ticker, SourceId::Barchart, self.diagnostics.as_ref());

        let mut dataset = NormalizedDataset::new();
        for page in PAGES {
            let url = self.page_url(page, ticker);
            let html = match get_page(
                self.transport.as_ref(),
                self.diagnostics.as_ref(),
                ticker,
                SourceId::Barchart,
                &url,
            ) {
                Ok(html) => html,
                Err(outcome) => return outcome,
            };
            dataset.merge(parse_page(&html, &norm));
        }

        if dataset.is_empty() {
            FetchOutcome::NotFound
        } else {
            FetchOutcome::Success(dataset)
        }
    }
}

fn cell_texts(row: ElementRef<'_>) -> Vec<String> {
    row.select(&CELL)
        .map(|td| td.text().collect::<String>().trim().to_string())
        .collect()
}

fn is_date_row(row: &ElementRef<'_>) -> bool {
    row.value().attr("class").is_some_and(|c| c.contains("date"))
}

/// Parse the first statement table of a page.
pub fn parse_page(html: &str, norm: &Normalizer<'_>) -> NormalizedDataset {
    let document = Html::parse_document(html);
    let mut dataset = NormalizedDataset::new();

    let Some(table) = document.select(&TABLE).next() else {
        norm.unreadable("no statement table on page");
        return dataset;
    };

    let Some(date_row) = table.select(&ROW).find(is_date_row) else {
        norm.unreadable("statement table has no date row");
        return dataset;
    };

    // Cell index paired with its fiscal year; TTM and other labels drop out.
    let mut columns: Vec<(usize, i32)> = Vec::new();
    for (idx, label) in cell_texts(date_row).iter().enumerate().skip(1) {
        if label.is_empty() {
            continue;
        }
        match parse_fiscal_period(label, DATE_FORMAT) {
            Some((year, month)) => {
                columns.push((idx, year));
                if dataset.report_month().is_none() {
                    dataset.set_report_month(month);
                }
            }
            None if label.eq_ignore_ascii_case("TTM") => {}
            None => norm.unreadable(format!("unrecognized period '{label}'")),
        }
    }
    if columns.is_empty() {
        return dataset;
    }
    let years: Vec<i32> = columns.iter().map(|(_, year)| *year).collect();

    for row in table.select(&ROW).filter(|r| !is_date_row(r)) {
        let cells = cell_texts(row);
        // Section headers and summary rows carry a single cell.
        let Some(field) = cells.first().filter(|f| !f.is_empty()) else {
            continue;
        };
        if cells.len() <= 1 {
            continue;
        }

        let scale = Scale::Thousands.for_field(field);
        let values: Vec<f64> = columns
            .iter()
            .filter_map(|(idx, _)| cells.get(*idx))
            .map(|raw| norm.cell(field, raw, scale))
            .collect();
        norm.row(&mut dataset, field, &years, &values);
    }

    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::transport::CannedTransport;
    use crate::diagnostics::{Diagnostic, RecordingDiagnostics};

    const INCOME: &str = r#"<html><body><table>
        <tr class="bc-financial-report__row-dates"><td></td><td>09-2017</td><td>09-2016</td></tr>
        <tr><td>Sales</td><td>$229,234,000</td><td>$215,639,000</td></tr>
        <tr><td>EPS Diluted Total Ops</td><td>9.21</td><td>8.31</td></tr>
        <tr><td>Other Income</td><td>(2,745)</td><td>N/A</td></tr>
        <tr><td>Broken Row</td><td>1</td></tr>
        <tr><td>Income Statement</td></tr>
    </table></body></html>"#;

    const BALANCE: &str = r#"<table>
        <tr class="date-row"><td></td><td>09-2017</td><td>09-2016</td></tr>
        <tr><td>Total Shareholders Equity</td><td>134,047,000</td><td>128,249,000</td></tr>
        <tr><td>Shares Outstanding</td><td>5,126,201</td><td>5,336,166</td></tr>
    </table>"#;

    fn barchart(transport: CannedTransport, diag: Arc<RecordingDiagnostics>) -> BarchartAdapter {
        BarchartAdapter::new(Arc::new(transport), diag, "http://bc.test")
    }

    fn canned() -> CannedTransport {
        CannedTransport::new()
            .page("http://bc.test/stocks/quotes/AAPL/balance-sheet/annual", BALANCE)
            .page("http://bc.test/stocks/quotes/AAPL/income-statement/annual", INCOME)
    }

    #[test]
    fn merges_balance_sheet_and_income_statement() {
        let diag = Arc::new(RecordingDiagnostics::default());
        let outcome = barchart(canned(), Arc::clone(&diag)).fetch("AAPL");
        let data = outcome.dataset().expect("success");

        assert_eq!(data.field("Sales").unwrap()[&2017], 229_234_000_000.0);
        assert_eq!(data.field("EPS Diluted Total Ops").unwrap()[&2016], 8.31);
        assert_eq!(data.field("Shares Outstanding").unwrap()[&2017], 5_126_201_000.0);
        assert_eq!(data.field("Other Income").unwrap()[&2017], -2_745_000.0);
        assert!(data.field("Other Income").unwrap()[&2016].is_nan());
        assert_eq!(data.report_month(), Some(9));

        assert!(data.field("Broken Row").is_none());
        assert!(data.field("Income Statement").is_none());
        assert_eq!(diag.count(|e| matches!(e, Diagnostic::ShapeMismatch { .. })), 1);
    }

    #[test]
    fn trailing_ttm_column_is_ignored() {
        let html = r#"<table>
            <tr class="bc-financial-report__row-dates"><td></td><td>09-2017</td><td>09-2016</td><td>TTM</td></tr>
            <tr><td>Sales</td><td>229,234,000</td><td>215,639,000</td><td>239,176,000</td></tr>
            <tr><td>EPS Diluted Total Ops</td><td>9.21</td><td>8.31</td><td>9.70</td></tr>
        </table>"#;
        let diag = RecordingDiagnostics::default();
        let norm = Normalizer::new("AAPL", SourceId::Barchart, &diag);
        let data = parse_page(html, &norm);

        let sales = data.field("Sales").unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[&2017], 229_234_000_000.0);
        assert_eq!(data.field("EPS Diluted Total Ops").unwrap()[&2016], 8.31);
        assert!(diag.events().is_empty());
    }

    #[test]
    fn unknown_period_only_loses_its_column() {
        let html = r#"<table>
            <tr class="dates"><td></td><td>Q5-2017</td><td>09-2016</td></tr>
            <tr><td>Sales</td><td>1</td><td>2</td></tr>
        </table>"#;
        let diag = RecordingDiagnostics::default();
        let norm = Normalizer::new("AAPL", SourceId::Barchart, &diag);
        let data = parse_page(html, &norm);

        assert_eq!(data.field("Sales").unwrap().keys().copied().collect::<Vec<_>>(), [2016]);
        assert_eq!(diag.count(|e| matches!(e, Diagnostic::UnreadableBody { .. })), 1);
        assert_eq!(diag.count(|e| matches!(e, Diagnostic::ShapeMismatch { .. })), 0);
    }

    #[test]
    fn redirected_page_fails_the_fetch() {
        let transport = CannedTransport::new()
            .status("http://bc.test/stocks/quotes/WPXP/balance-sheet/annual", 302);
        let diag = Arc::new(RecordingDiagnostics::default());
        let outcome = barchart(transport, diag).fetch("WPXP");
        assert_eq!(outcome, FetchOutcome::Redirected { status: 302 });
        assert_eq!(outcome.status_code(), 302);
    }

    #[test]
    fn page_without_table_is_not_found() {
        let transport = CannedTransport::new()
            .page("http://bc.test/stocks/quotes/FAX/balance-sheet/annual", "<html><p>No data</p></html>")
            .page("http://bc.test/stocks/quotes/FAX/income-statement/annual", "<html></html>");
        let diag = Arc::new(RecordingDiagnostics::default());
        assert_eq!(barchart(transport, Arc::clone(&diag)).fetch("FAX"), FetchOutcome::NotFound);
        assert_eq!(diag.count(|e| matches!(e, Diagnostic::UnreadableBody { .. })), 2);
    }
}
