//! Compound annual growth rates over a normalized series.
//!
//! `rate(n) = ((end / start)^(1/n) - 1) * 100`, rounded to two decimals, where
//! `end = series[end_year]` and `start = series[end_year - n]`.

use serde::Serialize;

use crate::domain::YearSeries;

/// Year spans reported when none are requested.
pub const DEFAULT_DELTAS: [u32; 3] = [1, 3, 5];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GrowthRate {
    pub delta: u32,
    pub start_year: i32,
    pub end_year: i32,
    /// Percent per year; `None` when either endpoint is missing or not positive.
    pub rate: Option<f64>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn usable(v: Option<&f64>) -> Option<f64> {
    v.copied().filter(|v| v.is_finite() && *v > 0.0)
}

/// Growth rate for each delta, ending at `end_year` (default: latest year).
///
/// Returns an empty list for an empty series.
pub fn growth_rates(series: &YearSeries, end_year: Option<i32>, deltas: &[u32]) -> Vec<GrowthRate> {
    let Some(end_year) = end_year.or_else(|| series.last_key_value().map(|(y, _)| *y)) else {
        return Vec::new();
    };
    let end = usable(series.get(&end_year));

    deltas
        .iter()
        .filter(|d| **d > 0)
        .map(|&delta| {
            let start_year = end_year - delta as i32;
            let rate = match (usable(series.get(&start_year)), end) {
                (Some(start), Some(end)) => Some(round2(((end / start).powf(1.0 / f64::from(delta)) - 1.0) * 100.0)),
                _ => None,
            };
            GrowthRate {
                delta,
                start_year,
                end_year,
                rate,
            }
        })
        .collect()
}
