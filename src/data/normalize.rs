//! Shared normalization helpers for source adapters.
//!
//! Every source reports numbers differently: currency symbols, thousands
//! separators, parenthesized negatives, placeholder dashes, values in thousands
//! or millions, and its own date format. The helpers here turn those into
//! absolute `f64` values keyed by fiscal year.
//!
//! Design goals:
//! - **Deterministic**: the same raw text always yields the same value
//! - **Non-fatal**: a bad cell becomes `NaN` and is reported, never raised

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::domain::{NormalizedDataset, SourceId};

/// Unit a source reports monetary values in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Units,
    Thousands,
    Millions,
}

impl Scale {
    pub fn factor(self) -> f64 {
        match self {
            Scale::Units => 1.0,
            Scale::Thousands => 1e3,
            Scale::Millions => 1e6,
        }
    }

    /// Scale to apply to a row, leaving per-share figures untouched.
    pub fn for_field(self, field: &str) -> Scale {
        if is_per_share(field) { Scale::Units } else { self }
    }
}

/// Tokens sources use for "no value".
const PLACEHOLDERS: [&str; 10] = ["", "-", "--", "—", "–", "n/a", "na", "null", "none", "nan"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    #[error("not a number: '{0}'")]
    NotNumeric(String),
}

/// Whether a field holds a per-share figure (never rescaled).
pub fn is_per_share(field: &str) -> bool {
    field.split(|c: char| !c.is_ascii_alphanumeric()).any(|w| w == "EPS")
        || field.to_ascii_lowercase().contains("per share")
}

/// Cleanse and parse one raw cell.
///
/// - placeholder tokens parse to `NaN`
/// - `$`, `,` and a leading `+` are stripped
/// - `(1,234)` parses to `-1234`
pub fn parse_cell(raw: &str) -> Result<f64, CellError> {
    let trimmed = raw.trim();
    if PLACEHOLDERS.iter().any(|p| trimmed.eq_ignore_ascii_case(p)) {
        return Ok(f64::NAN);
    }

    let (negate, inner) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = inner.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    let value = cleaned
        .parse::<f64>()
        .map_err(|_| CellError::NotNumeric(raw.to_string()))?;
    if !value.is_finite() {
        return Err(CellError::NotNumeric(raw.to_string()));
    }
    Ok(if negate { -value } else { value })
}

/// Parse a source's native period label into `(fiscal_year, month)`.
///
/// Formats without a day component (`%Y-%m`, `%m-%Y`) are accepted.
pub fn parse_fiscal_period(raw: &str, fmt: &str) -> Option<(i32, u32)> {
    let raw = raw.trim();
    let date = if fmt.contains("%d") {
        NaiveDate::parse_from_str(raw, fmt).ok()?
    } else {
        NaiveDate::parse_from_str(&format!("{raw}|01"), &format!("{fmt}|%d")).ok()?
    };
    Some((date.year(), date.month()))
}

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<]+?>").expect("static regex"));

/// Strip HTML tags some APIs wrap around their JSON payload.
pub fn strip_markup(body: &str) -> std::borrow::Cow<'_, str> {
    MARKUP.replace_all(body, "")
}

/// Per-fetch normalization context: knows which ticker/source it is working
/// for so anomalies can be reported with enough detail to act on.
pub struct Normalizer<'a> {
    ticker: &'a str,
    source: SourceId,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a> Normalizer<'a> {
    pub fn new(ticker: &'a str, source: SourceId, diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            ticker,
            source,
            diagnostics,
        }
    }

    /// Parse and rescale one text cell; bad cells become `NaN` and are reported.
    pub fn cell(&self, field: &str, raw: &str, scale: Scale) -> f64 {
        match parse_cell(raw) {
            Ok(v) => v * scale.factor(),
            Err(_) => {
                self.bad_value(field, raw);
                f64::NAN
            }
        }
    }

    /// Normalize one JSON value (number, numeric string, or null).
    pub fn json_value(&self, field: &str, value: &Value, scale: Scale) -> f64 {
        match value {
            Value::Null => f64::NAN,
            Value::Number(n) => match n.as_f64() {
                Some(v) => v * scale.factor(),
                None => {
                    self.bad_value(field, &n.to_string());
                    f64::NAN
                }
            },
            Value::String(s) => self.cell(field, s, scale),
            other => {
                self.bad_value(field, &other.to_string());
                f64::NAN
            }
        }
    }

    /// Store one table row, pairing values with years positionally.
    ///
    /// Returns `false` (and reports) when the counts differ; the row is dropped.
    pub fn row(&self, dataset: &mut NormalizedDataset, field: &str, years: &[i32], values: &[f64]) -> bool {
        if years.len() != values.len() {
            self.diagnostics.report(Diagnostic::ShapeMismatch {
                ticker: self.ticker.to_string(),
                source: self.source,
                field: field.to_string(),
                dates: years.len(),
                values: values.len(),
            });
            return false;
        }
        for (year, value) in years.iter().zip(values) {
            dataset.insert(field, *year, *value);
        }
        true
    }

    pub fn unreadable(&self, detail: impl Into<String>) {
        self.diagnostics.report(Diagnostic::UnreadableBody {
            ticker: self.ticker.to_string(),
            source: self.source,
            detail: detail.into(),
        });
    }

    fn bad_value(&self, field: &str, raw: &str) {
        self.diagnostics.report(Diagnostic::BadValue {
            ticker: self.ticker.to_string(),
            source: self.source,
            field: field.to_string(),
            raw: raw.to_string(),
        });
    }
}
