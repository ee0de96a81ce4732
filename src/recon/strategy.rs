//! Priority-ordered ways of obtaining each metric.
//!
//! A strategy is bound to exactly one source and reads either one field or the
//! ratio of two fields from that source's normalized dataset.

use crate::domain::{Metric, NormalizedDataset, SourceId, YearSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    Field(&'static str),
    /// `numerator / denominator`, year by year, over years present in both.
    Ratio {
        numerator: &'static str,
        denominator: &'static str,
    },
}

impl Formula {
    /// Evaluate against a dataset. `Err(field)` names the first missing field.
    ///
    /// A zero or NaN denominator yields NaN for that year.
    pub fn evaluate(&self, dataset: &NormalizedDataset) -> Result<YearSeries, &'static str> {
        match *self {
            Formula::Field(name) => dataset.field(name).cloned().ok_or(name),
            Formula::Ratio { numerator, denominator } => {
                let num = dataset.field(numerator).ok_or(numerator)?;
                let den = dataset.field(denominator).ok_or(denominator)?;
                Ok(num
                    .iter()
                    .filter_map(|(year, n)| {
                        let d = *den.get(year)?;
                        let ratio = if d == 0.0 || d.is_nan() { f64::NAN } else { n / d };
                        Some((*year, ratio))
                    })
                    .collect())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub source: SourceId,
    pub formula: Formula,
}

const fn field(source: SourceId, name: &'static str) -> Strategy {
    Strategy {
        source,
        formula: Formula::Field(name),
    }
}

const fn ratio(source: SourceId, numerator: &'static str, denominator: &'static str) -> Strategy {
    Strategy {
        source,
        formula: Formula::Ratio { numerator, denominator },
    }
}

const EPS: [Strategy; 3] = [
    ratio(SourceId::Fmp, "Net income available to common shareholders", "Diluted"),
    field(SourceId::Barchart, "EPS Diluted Total Ops"),
    field(SourceId::Morningstar, "Diluted EPS"),
];

const SALES: [Strategy; 4] = [
    field(SourceId::Fmp, "Revenue"),
    field(SourceId::Iex, "totalRevenue"),
    field(SourceId::Barchart, "Sales"),
    field(SourceId::Morningstar, "Revenue"),
];

const BOOK_VALUE_PER_SHARE: [Strategy; 2] = [
    ratio(SourceId::Fmp, "Total shareholders equity", "Diluted"),
    ratio(SourceId::Barchart, "Total Shareholders Equity", "Shares Outstanding"),
];

/// Strategies for `metric`, highest priority first.
pub fn strategies_for(metric: Metric) -> &'static [Strategy] {
    match metric {
        Metric::Eps => &EPS,
        Metric::Sales => &SALES,
        Metric::BookValuePerShare => &BOOK_VALUE_PER_SHARE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_uses_common_years_and_guards_denominator() {
        let mut data = NormalizedDataset::new();
        data.insert("NI", 2015, 10.0);
        data.insert("NI", 2016, 12.0);
        data.insert("NI", 2017, 15.0);
        data.insert("Shares", 2016, 4.0);
        data.insert("Shares", 2017, 0.0);

        let ratio = Formula::Ratio {
            numerator: "NI",
            denominator: "Shares",
        };
        let series = ratio.evaluate(&data).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[&2016], 3.0);
        assert!(series[&2017].is_nan());

        let missing = Formula::Ratio {
            numerator: "NI",
            denominator: "Diluted",
        };
        assert_eq!(missing.evaluate(&data), Err("Diluted"));
    }

    #[test]
    fn every_metric_has_strategies_and_sources_are_not_repeated() {
        for metric in [Metric::Eps, Metric::Sales, Metric::BookValuePerShare] {
            let table = strategies_for(metric);
            assert!(!table.is_empty());
            let mut sources: Vec<_> = table.iter().map(|s| s.source).collect();
            sources.sort();
            sources.dedup();
            assert_eq!(sources.len(), table.len(), "{metric:?}");
        }
    }
}
