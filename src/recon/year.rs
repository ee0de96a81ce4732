//! Fiscal-year lookup with classified failures.
//!
//! When a requested year is missing, the failure is classified relative to the
//! current calendar year so the log says *why* (not yet published, too old for
//! the source to keep, and so on). Classification never triggers a fallback.

use thiserror::Error;

use crate::domain::{YearRequest, YearSeries, current_year};

/// How far back (in years) sources are expected to keep annual data.
pub const RETENTION_YEARS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum YearLookupError {
    #[error("series has no years")]
    EmptySeries,
    #[error("{year} data is not yet released")]
    NotYetReleased { year: i32 },
    #[error("{year} is in the future")]
    FutureYear { year: i32 },
    #[error("{year} is older than the source keeps")]
    BeyondRetention { year: i32 },
    #[error("{year} data was not found")]
    NotFound { year: i32 },
}

/// Resolves a [`YearRequest`] against a series, relative to an injected
/// current year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearResolver {
    current_year: i32,
}

impl YearResolver {
    pub fn new(current_year: i32) -> Self {
        Self { current_year }
    }

    pub fn from_clock() -> Self {
        Self::new(current_year())
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Look up the value for `request` in `series`.
    pub fn resolve(&self, series: &YearSeries, request: YearRequest) -> Result<(i32, f64), YearLookupError> {
        match request {
            YearRequest::Latest => series
                .last_key_value()
                .map(|(year, value)| (*year, *value))
                .ok_or(YearLookupError::EmptySeries),
            YearRequest::Year(year) => {
                if series.is_empty() {
                    return Err(YearLookupError::EmptySeries);
                }
                series
                    .get(&year)
                    .map(|value| (year, *value))
                    .ok_or_else(|| self.classify_missing(year))
            }
        }
    }

    /// Explain why `year` is absent.
    pub fn classify_missing(&self, year: i32) -> YearLookupError {
        let current = self.current_year;
        if year > current {
            YearLookupError::FutureYear { year }
        } else if year >= current - 1 {
            YearLookupError::NotYetReleased { year }
        } else if year < current - RETENTION_YEARS {
            YearLookupError::BeyondRetention { year }
        } else {
            YearLookupError::NotFound { year }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> YearSeries {
        [(2015, 1.0), (2016, 2.0), (2017, 3.0)].into_iter().collect()
    }

    #[test]
    fn latest_picks_the_maximum_year() {
        let resolver = YearResolver::new(2021);
        assert_eq!(resolver.resolve(&series(), YearRequest::Latest), Ok((2017, 3.0)));
        assert_eq!(resolver.resolve(&series(), YearRequest::Year(2016)), Ok((2016, 2.0)));
    }

    #[test]
    fn missing_years_are_classified() {
        let resolver = YearResolver::new(2021);
        let s = series();
        assert_eq!(
            resolver.resolve(&s, YearRequest::Year(2020)),
            Err(YearLookupError::NotYetReleased { year: 2020 })
        );
        assert_eq!(
            resolver.resolve(&s, YearRequest::Year(2021)),
            Err(YearLookupError::NotYetReleased { year: 2021 })
        );
        assert_eq!(
            resolver.resolve(&s, YearRequest::Year(2030)),
            Err(YearLookupError::FutureYear { year: 2030 })
        );
        assert_eq!(
            resolver.resolve(&s, YearRequest::Year(2010)),
            Err(YearLookupError::BeyondRetention { year: 2010 })
        );
        assert_eq!(
            resolver.resolve(&s, YearRequest::Year(2018)),
            Err(YearLookupError::NotFound { year: 2018 })
        );
    }

    #[test]
    fn empty_series_fails() {
        let resolver = YearResolver::new(2021);
        let empty = YearSeries::new();
        assert_eq!(resolver.resolve(&empty, YearRequest::Latest), Err(YearLookupError::EmptySeries));
        assert_eq!(resolver.resolve(&empty, YearRequest::Year(2017)), Err(YearLookupError::EmptySeries));
    }
}
