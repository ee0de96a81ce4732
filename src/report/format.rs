//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fetch/reconcile code stays free of presentation concerns
//! - output changes are localized

use crate::app::pipeline::MetricRun;
use crate::domain::{FetchOutcome, Listing, Metric, NormalizedDataset, SourceId};
use crate::fanout::{SkipReason, TaskOutcome};
use crate::growth::GrowthRate;
use crate::recon::MetricReport;
use crate::report::summarize;

/// Metric value in its display unit (sales in millions).
pub fn fmt_metric_value(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Sales => format!("{:.1}M", value / metric.natural_unit()),
        Metric::Eps | Metric::BookValuePerShare => format!("{value:.2}"),
    }
}

fn fmt_outcome_status(outcome: &TaskOutcome<MetricReport>) -> String {
    match outcome {
        TaskOutcome::Done(r) if r.result.is_absent() => "no data".to_string(),
        TaskOutcome::Done(_) => String::new(),
        TaskOutcome::Skipped(SkipReason::Cancelled) => "cancelled".to_string(),
        TaskOutcome::Skipped(SkipReason::DeadlineExceeded) => "deadline exceeded".to_string(),
        TaskOutcome::Panicked(msg) => format!("failed: {msg}"),
    }
}

/// One row per ticker plus a summary footer.
pub fn format_metric_run(run: &MetricRun, detail: bool) -> String {
    let metric = run.request.metric;
    let mut out = String::new();

    out.push_str(&format!(
        "=== r1 - {} (year: {}, redundancy: {}) ===\n",
        metric.display_name(),
        run.request.year,
        run.request.redundancy
    ));
    out.push_str(&format!(
        "{:<10} {:>6} {:>16} {:>10} {:<24} {}",
        "ticker", "year", "value", "conf", "sources", "status"
    ).trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<10} {:-<6} {:-<16} {:-<10} {:-<24} {:-<10}", "", "", "", "", "", ""));
    out.push('\n');

    for (ticker, outcome) in &run.rows {
        let report = outcome.done();
        let year = report.and_then(|r| r.year).map(|y| y.to_string()).unwrap_or_default();
        let value = report
            .and_then(|r| r.result.value)
            .map(|v| fmt_metric_value(metric, v))
            .unwrap_or_else(|| "n/a".to_string());
        let confidence = report
            .and_then(|r| r.result.confidence)
            .map(|c| c.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        let sources = report
            .map(|r| {
                r.candidates
                    .iter()
                    .map(|c| c.source.key())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();

        out.push_str(
            format!(
                "{:<10} {:>6} {:>16} {:>10} {:<24} {}",
                truncate(ticker, 10),
                year,
                value,
                confidence,
                truncate(&sources, 24),
                fmt_outcome_status(outcome)
            )
            .trim_end(),
        );
        out.push('\n');

        if let (true, Some(report)) = (detail, report) {
            out.push_str(&format_report_detail(report));
        }
    }

    let s = summarize(run);
    out.push_str(&format!(
        "\n{} agreed, {} disagreed, {} without data, {} not run ({:.2}s)\n",
        s.agreed,
        s.disagreed,
        s.absent,
        s.not_run,
        run.elapsed.as_secs_f64()
    ));
    out
}

/// Candidates and skipped strategies, indented under a ticker row.
pub fn format_report_detail(report: &MetricReport) -> String {
    let mut out = String::new();
    for c in &report.candidates {
        out.push_str(&format!(
            "    #{} {:<22} {} = {}\n",
            c.rank + 1,
            c.source.display_name(),
            c.year,
            fmt_metric_value(report.metric, c.value)
        ));
    }
    for s in &report.skipped {
        out.push_str(&format!(
            "    #{} {:<22} skipped: {}\n",
            s.rank + 1,
            s.source.display_name(),
            s.reason
        ));
    }
    out
}

/// Field-by-year grid of a normalized dataset.
pub fn format_dataset(ticker: &str, source: SourceId, outcome: &FetchOutcome) -> String {
    let mut out = format!(
        "=== {} from {} (status {}) ===\n",
        ticker,
        source.display_name(),
        outcome.status_code()
    );
    let Some(data) = outcome.dataset() else {
        out.push_str(&format!("{outcome}\n"));
        return out;
    };

    if let Some(month) = data.report_month() {
        out.push_str(&format!("Fiscal year ends in month {month}\n"));
    }
    out.push_str(&format_grid(data));
    out
}

fn format_grid(data: &NormalizedDataset) -> String {
    let years: Vec<i32> = data.years().into_iter().collect();
    let mut out = String::new();

    out.push_str(&format!("{:<44}", "field"));
    for y in &years {
        out.push_str(&format!(" {y:>16}"));
    }
    out.push('\n');

    for (name, series) in data.fields() {
        out.push_str(&format!("{:<44}", truncate(name, 44)));
        for y in &years {
            let cell = match series.get(y) {
                Some(v) if v.is_nan() => "-".to_string(),
                Some(v) => fmt_number(*v),
                None => String::new(),
            };
            out.push_str(&format!(" {cell:>16}"));
        }
        out.push('\n');
    }
    out
}

fn fmt_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.4}")
    }
}

pub fn format_growth(ticker: &str, field: &str, rates: &[GrowthRate]) -> String {
    let mut out = format!("=== {ticker}: {field} growth ===\n");
    if rates.is_empty() {
        out.push_str("no data\n");
        return out;
    }
    for r in rates {
        let rate = r.rate.map(|v| format!("{v:.2}%")).unwrap_or_else(|| "n/a".to_string());
        out.push_str(&format!(
            "{:>2}y ({}-{}): {rate}\n",
            r.delta, r.start_year, r.end_year
        ));
    }
    out
}

/// Symbol, exchange and company name per line, plus a count.
pub fn format_listings(listings: &[Listing]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<8} {:<8} {}\n", "symbol", "exchange", "name"));
    out.push_str(&format!("{:-<8} {:-<8} {:-<40}\n", "", "", ""));
    for l in listings {
        out.push_str(&format!("{:<8} {:<8} {}\n", l.symbol, l.exchange, truncate(&l.name, 60)));
    }
    out.push_str(&format!("{} companies\n", listings.len()));
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
