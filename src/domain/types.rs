//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced by any source adapter
//! - consumed by the reconciliation engine
//! - exported to JSON/CSV by the application shell

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Values of one field keyed by fiscal year.
///
/// `NaN` marks a value the source reported as missing.
pub type YearSeries = BTreeMap<i32, f64>;

/// Source data normalized to `data[field][year] = value` in absolute units.
///
/// Ordered maps keep iteration and serialization deterministic, so two fetches
/// of an unchanged source serialize to identical bytes and compare equal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedDataset {
    fields: BTreeMap<String, YearSeries>,
    /// Month the fiscal year ends in, when the source exposes it.
    report_month: Option<u32>,
}

impl NormalizedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or overwrite) a single observation.
    pub fn insert(&mut self, field: impl Into<String>, year: i32, value: f64) {
        self.fields.entry(field.into()).or_default().insert(year, value);
    }

    /// Replace a whole field.
    pub fn insert_series(&mut self, field: impl Into<String>, series: YearSeries) {
        self.fields.insert(field.into(), series);
    }

    pub fn field(&self, name: &str) -> Option<&YearSeries> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &YearSeries)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Union of every year observed in any field.
    pub fn years(&self) -> BTreeSet<i32> {
        self.fields.values().flat_map(|s| s.keys().copied()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn report_month(&self) -> Option<u32> {
        self.report_month
    }

    pub fn set_report_month(&mut self, month: u32) {
        self.report_month = Some(month);
    }

    /// Merge another statement into this dataset.
    ///
    /// Observations from `other` win on `(field, year)` collisions; the report
    /// month is only taken from `other` when this dataset has none.
    pub fn merge(&mut self, other: NormalizedDataset) {
        for (field, series) in other.fields {
            self.fields.entry(field).or_default().extend(series);
        }
        if self.report_month.is_none() {
            self.report_month = other.report_month;
        }
    }
}

/// Equality treats two missing (`NaN`) observations as the same value.
impl PartialEq for NormalizedDataset {
    fn eq(&self, other: &Self) -> bool {
        fn same(a: f64, b: f64) -> bool {
            a == b || (a.is_nan() && b.is_nan())
        }
        self.report_month == other.report_month
            && self.fields.len() == other.fields.len()
            && self.fields.iter().zip(&other.fields).all(|((fa, sa), (fb, sb))| {
                fa == fb
                    && sa.len() == sb.len()
                    && sa.iter().zip(sb).all(|((ya, va), (yb, vb))| ya == yb && same(*va, *vb))
            })
    }
}

/// External data providers known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// FinancialModelingPrep JSON API.
    Fmp,
    /// Barchart.com financial statement pages (HTML).
    Barchart,
    /// IEX Trading financials JSON API.
    Iex,
    /// Morningstar statement CSV export.
    Morningstar,
}

impl SourceId {
    pub const ALL: [SourceId; 4] = [
        SourceId::Fmp,
        SourceId::Barchart,
        SourceId::Iex,
        SourceId::Morningstar,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            SourceId::Fmp => "FinancialModelingPrep",
            SourceId::Barchart => "Barchart",
            SourceId::Iex => "IEX Trading",
            SourceId::Morningstar => "Morningstar",
        }
    }

    /// Short lowercase key (matches the CLI value).
    pub fn key(self) -> &'static str {
        match self {
            SourceId::Fmp => "fmp",
            SourceId::Barchart => "barchart",
            SourceId::Iex => "iex",
            SourceId::Morningstar => "morningstar",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// US stock exchanges whose company listings can be downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Nasdaq,
    Nyse,
    Amex,
}

impl Exchange {
    pub const ALL: [Exchange; 3] = [Exchange::Nasdaq, Exchange::Nyse, Exchange::Amex];

    /// Lowercase key, as used in the listing download URL.
    pub fn key(self) -> &'static str {
        match self {
            Exchange::Nasdaq => "nasdaq",
            Exchange::Nyse => "nyse",
            Exchange::Amex => "amex",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.key().to_ascii_uppercase())
    }
}

/// One listed company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub symbol: String,
    pub name: String,
    pub exchange: Exchange,
}

/// Result of contacting one source for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(NormalizedDataset),
    /// 404, or a 200 whose body carried no data for the ticker.
    NotFound,
    /// 3xx response. Redirects are never followed.
    Redirected { status: u16 },
    /// Any other non-success status, or a transport failure (`status = None`).
    TransientError { status: Option<u16>, message: String },
    /// The ticker was rejected before any network access.
    InvalidTicker,
}

impl FetchOutcome {
    /// Classify a non-200 HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => FetchOutcome::NotFound,
            300..=399 => FetchOutcome::Redirected { status },
            _ => FetchOutcome::TransientError {
                status: Some(status),
                message: format!("unexpected HTTP status {status}"),
            },
        }
    }

    /// HTTP-style status code for this outcome.
    ///
    /// Invalid tickers report a synthetic 404; transport failures report 0.
    pub fn status_code(&self) -> u16 {
        match self {
            FetchOutcome::Success(_) => 200,
            FetchOutcome::NotFound | FetchOutcome::InvalidTicker => 404,
            FetchOutcome::Redirected { status } => *status,
            FetchOutcome::TransientError { status, .. } => status.unwrap_or(0),
        }
    }

    pub fn dataset(&self) -> Option<&NormalizedDataset> {
        match self {
            FetchOutcome::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_dataset(self) -> Option<NormalizedDataset> {
        match self {
            FetchOutcome::Success(data) => Some(data),
            _ => None,
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Success(data) => write!(f, "ok ({} fields)", data.len()),
            FetchOutcome::NotFound => f.write_str("not found (404)"),
            FetchOutcome::Redirected { status } => write!(f, "redirected ({status})"),
            FetchOutcome::TransientError { message, .. } => write!(f, "transient error: {message}"),
            FetchOutcome::InvalidTicker => f.write_str("invalid ticker (404)"),
        }
    }
}

/// Derived metrics the engine knows how to reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Diluted earnings per share.
    Eps,
    /// Total revenue.
    Sales,
    /// Shareholder equity per diluted share.
    #[value(name = "bvps")]
    #[serde(rename = "bvps")]
    BookValuePerShare,
}

impl Metric {
    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Eps => "EPS (diluted)",
            Metric::Sales => "Sales",
            Metric::BookValuePerShare => "Book value / share",
        }
    }

    /// Size of one "natural unit" in absolute currency units.
    ///
    /// Per-share metrics compare in currency per share; sales compare in millions.
    pub fn natural_unit(self) -> f64 {
        match self {
            Metric::Eps | Metric::BookValuePerShare => 1.0,
            Metric::Sales => 1e6,
        }
    }

    /// Absolute agreement tolerance: 0.1 natural units.
    pub fn tolerance(self) -> f64 {
        0.1 * self.natural_unit()
    }
}

/// Which fiscal year to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YearRequest {
    /// The most recent year present in the series.
    Latest,
    Year(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid year '{0}': expected `latest` or a four-digit year")]
pub struct YearRequestError(pub String);

impl FromStr for YearRequest {
    type Err = YearRequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("latest") {
            return Ok(YearRequest::Latest);
        }
        match trimmed.parse::<i32>() {
            Ok(year) if (1000..=9999).contains(&year) => Ok(YearRequest::Year(year)),
            _ => Err(YearRequestError(s.to_string())),
        }
    }
}

impl fmt::Display for YearRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearRequest::Latest => f.write_str("latest"),
            YearRequest::Year(y) => write!(f, "{y}"),
        }
    }
}

/// Coarse trust label for a reconciled value.
///
/// Ordered from least to most trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    /// Sources disagreed; the value is the highest-priority guess.
    NoAgreement,
    Sigma1,
    Sigma2,
    Sigma3,
}

/// Tier list indexed by the number of agreeing adjacent candidate pairs.
pub const CONFIDENCE_TIERS: [Confidence; 3] = [Confidence::Sigma1, Confidence::Sigma2, Confidence::Sigma3];

impl Confidence {
    pub fn percent(self) -> f64 {
        match self {
            Confidence::NoAgreement => 0.0,
            Confidence::Sigma1 => 68.0,
            Confidence::Sigma2 => 95.0,
            Confidence::Sigma3 => 99.7,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// One source's estimate of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateValue {
    /// Priority rank of the strategy that produced it (0 = highest).
    pub rank: usize,
    pub source: SourceId,
    pub year: i32,
    pub value: f64,
}

/// Terminal output of a reconciliation.
///
/// Both fields absent means no source produced usable data.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricResult {
    pub value: Option<f64>,
    pub confidence: Option<Confidence>,
}

impl MetricResult {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn new(value: f64, confidence: Confidence) -> Self {
        Self {
            value: Some(value),
            confidence: Some(confidence),
        }
    }

    pub fn is_absent(&self) -> bool {
        self.value.is_none()
    }
}

/// Current calendar year (local time).
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}
