//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - initialises logging and loads configuration
//! - dispatches to the metric / fetch / growth / tickers commands
//! - prints reports and writes optional exports

use std::time::Duration;

use clap::Parser;

use crate::cli::{Cli, Command, FetchArgs, GrowthArgs, MetricArgs, TickersArgs};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::logging::{LogConfig, init_logging};

pub mod pipeline;

use pipeline::{MetricRequest, Services};

/// Entry point for the `r1` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    init_logging(&LogConfig::from_env().with_default_level(level))?;

    let config = AppConfig::from_env()?;
    let services = Services::from_config(&config)?;

    match cli.command {
        Command::Metric(args) => handle_metric(&services, args),
        Command::Fetch(args) => handle_fetch(&services, args),
        Command::Growth(args) => handle_growth(&services, args),
        Command::Tickers(args) => handle_tickers(&services, args),
    }
}

fn handle_metric(services: &Services, args: MetricArgs) -> Result<(), AppError> {
    let request = MetricRequest {
        metric: args.metric,
        year: args.year,
        redundancy: usize::from(args.redundancy),
    };
    let tickers = pipeline::resolve_tickers(services, &args.tickers, &args.exchange)?;
    tracing::info!(tickers = tickers.len(), "running batch");
    let run = pipeline::run_metrics(
        services,
        &tickers,
        request,
        args.workers,
        args.deadline_secs.map(Duration::from_secs),
    )?;

    println!("{}", crate::report::format_metric_run(&run, args.detail));

    if let Some(path) = &args.export {
        crate::io::export::write_results_csv(path, &run)?;
        tracing::info!(path = %path.display(), "results exported");
    }
    Ok(())
}

fn handle_fetch(services: &Services, args: FetchArgs) -> Result<(), AppError> {
    let outcome = pipeline::fetch_dataset(services, &args.ticker, args.source)?;
    println!("{}", crate::report::format_dataset(&args.ticker, args.source, &outcome));

    if let Some(path) = &args.json {
        let Some(dataset) = outcome.dataset() else {
            return Err(AppError::runtime(format!(
                "Nothing to write: {} returned {outcome}.",
                args.source
            )));
        };
        crate::io::dataset::write_dataset_json(path, &args.ticker, args.source, dataset)?;
        tracing::info!(path = %path.display(), "dataset written");
    }
    Ok(())
}

fn handle_growth(services: &Services, args: GrowthArgs) -> Result<(), AppError> {
    let dataset = pipeline::load_dataset(services, &args.ticker, args.source, args.dataset.as_deref())?;
    let rates = pipeline::field_growth(&dataset, &args.field, args.end_year, &args.deltas)?;
    println!("{}", crate::report::format_growth(&args.ticker, &args.field, &rates));
    Ok(())
}

fn handle_tickers(services: &Services, args: TickersArgs) -> Result<(), AppError> {
    let listings = pipeline::list_tickers(services, &args.exchanges())?;
    println!("{}", crate::report::format_listings(&listings));

    if let Some(path) = &args.export {
        crate::io::export::write_listings_csv(path, &listings)?;
        tracing::info!(path = %path.display(), "listings exported");
    }
    Ok(())
}
