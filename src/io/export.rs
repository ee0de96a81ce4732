//! Export reconciled metric results and exchange listings to CSV.
//!
//! Metric results: one row per ticker, in request order. Tickers whose job
//! never ran (or panicked) are still written, with an empty value and a
//! `status` column.

use std::path::Path;

use serde::Serialize;

use crate::app::pipeline::MetricRun;
use crate::domain::{Listing, Metric};
use crate::error::AppError;
use crate::fanout::{SkipReason, TaskOutcome};

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    ticker: &'a str,
    metric: Metric,
    year: Option<i32>,
    value: Option<f64>,
    confidence_pct: Option<f64>,
    candidates: usize,
    sources: String,
    status: &'static str,
}

fn status_label<T>(outcome: &TaskOutcome<T>) -> &'static str {
    match outcome {
        TaskOutcome::Done(_) => "ok",
        TaskOutcome::Skipped(SkipReason::Cancelled) => "cancelled",
        TaskOutcome::Skipped(SkipReason::DeadlineExceeded) => "deadline",
        TaskOutcome::Panicked(_) => "panicked",
    }
}

pub fn write_results_csv(path: &Path, run: &MetricRun) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::config(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    for (ticker, outcome) in &run.rows {
        let report = outcome.done();
        let row = ResultRow {
            ticker,
            metric: run.request.metric,
            year: report.and_then(|r| r.year),
            value: report.and_then(|r| r.result.value),
            confidence_pct: report.and_then(|r| r.result.confidence).map(|c| c.percent()),
            candidates: report.map_or(0, |r| r.candidates.len()),
            sources: report
                .map(|r| {
                    r.candidates
                        .iter()
                        .map(|c| c.source.key())
                        .collect::<Vec<_>>()
                        .join(";")
                })
                .unwrap_or_default(),
            status: status_label(outcome),
        };
        writer
            .serialize(row)
            .map_err(|e| AppError::config(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::config(format!("Failed to write export CSV: {e}")))?;
    Ok(())
}

/// One `symbol,name,exchange` row per listing.
pub fn write_listings_csv(path: &Path, listings: &[Listing]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::config(format!("Failed to create listings CSV '{}': {e}", path.display())))?;
    for listing in listings {
        writer
            .serialize(listing)
            .map_err(|e| AppError::config(format!("Failed to write listings CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::config(format!("Failed to write listings CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::app::pipeline::MetricRequest;
    use crate::domain::{CandidateValue, Confidence, MetricResult, SourceId, YearRequest};
    use crate::recon::MetricReport;

    #[test]
    fn writes_one_row_per_ticker() {
        let report = MetricReport {
            ticker: "AAPL".into(),
            metric: Metric::Eps,
            result: MetricResult::new(9.21, Confidence::Sigma2),
            year: Some(2017),
            candidates: vec![
                CandidateValue {
                    rank: 0,
                    source: SourceId::Fmp,
                    year: 2017,
                    value: 9.21,
                },
                CandidateValue {
                    rank: 1,
                    source: SourceId::Barchart,
                    year: 2017,
                    value: 9.21,
                },
            ],
            skipped: Vec::new(),
        };
        let run = MetricRun {
            request: MetricRequest {
                metric: Metric::Eps,
                year: YearRequest::Latest,
                redundancy: 2,
            },
            rows: vec![
                ("AAPL".into(), TaskOutcome::Done(report)),
                ("MSFT".into(), TaskOutcome::Skipped(SkipReason::DeadlineExceeded)),
            ],
            elapsed: Duration::from_millis(5),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_results_csv(&path, &run).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "ticker,metric,year,value,confidence_pct,candidates,sources,status"
        );
        assert_eq!(lines[1], "AAPL,eps,2017,9.21,95.0,2,fmp;barchart,ok");
        assert_eq!(lines[2], "MSFT,eps,,,,0,,deadline");
    }

    #[test]
    fn writes_listings_with_header() {
        let listings = [Listing {
            symbol: "MCD".into(),
            name: "McDonald's Corporation".into(),
            exchange: crate::domain::Exchange::Nyse,
        }];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickers.csv");
        write_listings_csv(&path, &listings).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "symbol,name,exchange\nMCD,McDonald's Corporation,nyse\n");
    }
}
