//! Reporting utilities: batch summaries and formatted terminal output.

use crate::app::pipeline::MetricRun;
use crate::domain::Confidence;
use crate::fanout::TaskOutcome;

pub mod format;

pub use format::*;

/// Counts of rows by outcome, for the footer of a metric run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub agreed: usize,
    pub disagreed: usize,
    pub absent: usize,
    pub not_run: usize,
}

pub fn summarize(run: &MetricRun) -> RunSummary {
    let mut summary = RunSummary::default();
    for (_, outcome) in &run.rows {
        match outcome {
            TaskOutcome::Done(report) => match report.result.confidence {
                None => summary.absent += 1,
                Some(Confidence::NoAgreement) => summary.disagreed += 1,
                Some(_) => summary.agreed += 1,
            },
            TaskOutcome::Skipped(_) | TaskOutcome::Panicked(_) => summary.not_run += 1,
        }
    }
    summary
}
