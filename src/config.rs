//! Environment-driven configuration.
//!
//! `.env` is loaded (if present) with `dotenvy`, then:
//!
//! | variable                  | meaning                               | default            |
//! |---------------------------|---------------------------------------|--------------------|
//! | `R1_HTTP_TIMEOUT_SECS`    | per-request timeout                   | 30                 |
//! | `R1_USER_AGENT`           | HTTP user agent                       | `rule-one/<ver>`   |
//! | `R1_WORKERS`              | fan-out worker threads                | one per ticker     |
//! | `FMP_API_KEY`             | FinancialModelingPrep API key         | none               |
//! | `R1_<SOURCE>_BASE_URL`    | base URL override per source          | provider URL       |
//! | `R1_LISTINGS_BASE_URL`    | exchange listings download host       | `www.nasdaq.com`   |

use std::time::Duration;

use crate::data::{barchart, fmp, iex, listings, morningstar};
use crate::error::AppError;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Where each source lives and how to authenticate with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub fmp_base_url: String,
    pub fmp_api_key: Option<String>,
    pub barchart_base_url: String,
    pub iex_base_url: String,
    pub morningstar_base_url: String,
    pub listings_base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            fmp_base_url: fmp::DEFAULT_BASE_URL.to_string(),
            fmp_api_key: None,
            barchart_base_url: barchart::DEFAULT_BASE_URL.to_string(),
            iex_base_url: iex::DEFAULT_BASE_URL.to_string(),
            morningstar_base_url: morningstar::DEFAULT_BASE_URL.to_string(),
            listings_base_url: listings::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub http_timeout: Duration,
    pub user_agent: String,
    /// `None` means one worker per input.
    pub workers: Option<usize>,
    pub sources: SourceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            workers: None,
            sources: SourceConfig::default(),
        }
    }
}

fn default_user_agent() -> String {
    format!("rule-one/{}", env!("CARGO_PKG_VERSION"))
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (blank values count as unset).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = SourceConfig::default();

        let timeout_secs = match get("R1_HTTP_TIMEOUT_SECS") {
            Some(raw) => parse_positive("R1_HTTP_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        let workers = get("R1_WORKERS")
            .map(|raw| parse_positive("R1_WORKERS", &raw).map(|n| n as usize))
            .transpose()?;

        Ok(Self {
            http_timeout: Duration::from_secs(timeout_secs),
            user_agent: get("R1_USER_AGENT").unwrap_or_else(default_user_agent),
            workers,
            sources: SourceConfig {
                fmp_base_url: get("R1_FMP_BASE_URL").unwrap_or(defaults.fmp_base_url),
                fmp_api_key: get("FMP_API_KEY"),
                barchart_base_url: get("R1_BARCHART_BASE_URL").unwrap_or(defaults.barchart_base_url),
                iex_base_url: get("R1_IEX_BASE_URL").unwrap_or(defaults.iex_base_url),
                morningstar_base_url: get("R1_MORNINGSTAR_BASE_URL").unwrap_or(defaults.morningstar_base_url),
                listings_base_url: get("R1_LISTINGS_BASE_URL").unwrap_or(defaults.listings_base_url),
            },
        })
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, AppError> {
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::config(format!("{key} must be a positive integer (got '{raw}')."))),
    }
}
