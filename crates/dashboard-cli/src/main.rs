use std::sync::Arc;
use std::time::Duration;

use analysis_orchestrator::AnalysisOrchestrator;
use anyhow::{bail, Context, Result};
use forecast_engine::{ForecastHorizon, ForecastOrchestrator, RegressionForecaster};
use technical_analysis::IndicatorEngine;
use ticker_directory::listing::DEFAULT_LISTING_URLS;
use ticker_directory::{build_listing, write_listing, TickerDirectory};
use yahoo_client::YahooFinanceClient;

mod cli;
mod config;
mod report;

use cli::{parse_args, Command, USAGE};
use config::DashboardConfig;

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    // Logs go to stderr so JSON reports on stdout stay parseable
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = DashboardConfig::from_env()?;
    tracing::debug!("Configuration: {:?}", config);

    let yahoo = Arc::new(YahooFinanceClient::with_timeout(Duration::from_secs(
        config.yahoo_timeout_secs,
    )));

    match command {
        Command::Search { query } => {
            let directory = TickerDirectory::new(&config.tickers_file);
            let results = directory.search(&query, yahoo.as_ref()).await;
            if results.is_empty() {
                println!("No tickers found for '{}'", query);
            }
            for ticker in results {
                println!("{} - {}", ticker.symbol, ticker.name);
            }
        }
        Command::Analyze { symbol, days, json } => {
            let horizon = match days {
                Some(days) => ForecastHorizon::new(days).context("invalid --days")?,
                None => config.horizon()?,
            };
            let forecaster = RegressionForecaster::new(config.interval_width)?;
            let orchestrator = AnalysisOrchestrator::new(
                yahoo,
                IndicatorEngine::new(config.indicators),
                ForecastOrchestrator::new(Arc::new(forecaster)),
            )
            .with_history_years(config.history_years);

            let report = orchestrator.analyze(&symbol, horizon).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report::render_text(&report));
            }
        }
        Command::BuildTickers { out } => {
            let path = out.unwrap_or_else(|| config.tickers_file.clone());
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.yahoo_timeout_secs))
                .build()?;
            let entries = build_listing(&client, &DEFAULT_LISTING_URLS).await;
            if entries.is_empty() {
                bail!("no exchange listing could be downloaded");
            }
            write_listing(&path, &entries)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("Wrote {} tickers to {}", entries.len(), path.display());
        }
    }

    Ok(())
}
