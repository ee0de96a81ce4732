//! Command-line parsing for the `r1` fundamentals reconciler.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! fetching and reconciliation. Values are validated here (tickers, years,
//! deltas) so nothing reaches the network with malformed input.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{Exchange, Metric, SourceId, YearRequest};
use crate::growth::DEFAULT_DELTAS;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "r1", version, about = "Multi-source fundamentals reconciler (Rule #1 Big Five)")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `R1_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile one metric across sources for one or more tickers.
    Metric(MetricArgs),
    /// Fetch and print one source's normalized data for a ticker.
    Fetch(FetchArgs),
    /// Compound annual growth of one normalized field.
    Growth(GrowthArgs),
    /// List the companies traded on US exchanges.
    Tickers(TickersArgs),
}

#[derive(Debug, Args, Clone)]
pub struct MetricArgs {
    /// Ticker symbols (e.g. AAPL BRK.B).
    #[arg(required_unless_present = "exchange", value_parser = parse_ticker)]
    pub tickers: Vec<String>,

    /// Also run every company listed on these exchanges (comma separated).
    #[arg(short = 'x', long, value_enum, value_delimiter = ',')]
    pub exchange: Vec<Exchange>,

    /// Metric to compute.
    #[arg(short, long, value_enum, default_value_t = Metric::Eps)]
    pub metric: Metric,

    /// Fiscal year, or `latest`.
    #[arg(short, long, default_value = "latest")]
    pub year: YearRequest,

    /// Number of agreeing-source candidates to collect before stopping.
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u16).range(1..))]
    pub redundancy: u16,

    /// Worker threads (default: `R1_WORKERS`, else one per ticker).
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Skip tickers not started within this many seconds.
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Print every candidate and skipped strategy.
    #[arg(long)]
    pub detail: bool,

    /// Export results to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    #[arg(value_parser = parse_ticker)]
    pub ticker: String,

    #[arg(short, long, value_enum)]
    pub source: SourceId,

    /// Write the normalized dataset to JSON.
    #[arg(long, value_name = "JSON")]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct GrowthArgs {
    #[arg(value_parser = parse_ticker)]
    pub ticker: String,

    /// Source to fetch from (ignored with `--dataset`).
    #[arg(short, long, value_enum, required_unless_present = "dataset")]
    pub source: Option<SourceId>,

    /// Normalized field name, e.g. `Revenue`.
    #[arg(short, long)]
    pub field: String,

    /// Year spans, comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_DELTAS)]
    pub deltas: Vec<u32>,

    /// Last fiscal year of each span (default: latest available).
    #[arg(long)]
    pub end_year: Option<i32>,

    /// Read a dataset saved with `r1 fetch --json` instead of fetching.
    #[arg(long, value_name = "JSON")]
    pub dataset: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct TickersArgs {
    /// Exchanges to list (comma separated, default: all).
    #[arg(short = 'x', long, value_enum, value_delimiter = ',')]
    pub exchange: Vec<Exchange>,

    /// Export the listings to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

impl TickersArgs {
    pub fn exchanges(&self) -> Vec<Exchange> {
        if self.exchange.is_empty() {
            Exchange::ALL.to_vec()
        } else {
            self.exchange.clone()
        }
    }
}

fn parse_ticker(raw: &str) -> Result<String, String> {
    crate::data::validate_ticker(raw)
        .map(str::to_ascii_uppercase)
        .ok_or_else(|| format!("invalid ticker '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metric_command() {
        let cli = Cli::parse_from(["r1", "metric", "aapl", "MSFT", "-m", "bvps", "--year", "2017", "-r", "3"]);
        let Command::Metric(args) = cli.command else {
            panic!("expected metric");
        };
        assert_eq!(args.tickers, ["AAPL", "MSFT"]);
        assert_eq!(args.metric, Metric::BookValuePerShare);
        assert_eq!(args.year, YearRequest::Year(2017));
        assert_eq!(args.redundancy, 3);
        assert!(args.exchange.is_empty());
    }

    #[test]
    fn exchanges_can_replace_tickers() {
        let cli = Cli::parse_from(["r1", "metric", "--exchange", "nyse,amex", "-m", "sales"]);
        let Command::Metric(args) = cli.command else {
            panic!("expected metric");
        };
        assert!(args.tickers.is_empty());
        assert_eq!(args.exchange, [Exchange::Nyse, Exchange::Amex]);

        let cli = Cli::parse_from(["r1", "tickers"]);
        let Command::Tickers(args) = cli.command else {
            panic!("expected tickers");
        };
        assert_eq!(args.exchanges(), Exchange::ALL);
        assert!(Cli::try_parse_from(["r1", "tickers", "-x", "lse"]).is_err());
    }

    #[test]
    fn rejects_bad_input_before_any_fetch() {
        assert!(Cli::try_parse_from(["r1", "metric", "AA PL"]).is_err());
        assert!(Cli::try_parse_from(["r1", "metric", "AAPL", "--year", "last"]).is_err());
        assert!(Cli::try_parse_from(["r1", "metric", "AAPL", "-r", "0"]).is_err());
        assert!(Cli::try_parse_from(["r1", "growth", "AAPL", "--field", "Revenue"]).is_err());
    }

    #[test]
    fn growth_defaults_deltas() {
        let cli = Cli::parse_from(["r1", "growth", "AAPL", "-s", "fmp", "-f", "Revenue"]);
        let Command::Growth(args) = cli.command else {
            panic!("expected growth");
        };
        assert_eq!(args.deltas, DEFAULT_DELTAS);
        assert_eq!(args.source, Some(SourceId::Fmp));
    }
}
