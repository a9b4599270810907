use anyhow::{bail, Context, Result};
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage:
  stock-dashboard search <QUERY>                    Search tickers (local file, then Yahoo)
  stock-dashboard analyze <SYMBOL> [--days N] [--json]
                                                    Indicators, earnings, fundamentals and forecast
  stock-dashboard build-tickers [--out PATH]        Download exchange listings into the ticker file

Options:
  --days N      Forecast horizon, 30-365 days (default: FORECAST_DAYS or 180)
  --json        Print the full report as JSON
  --out PATH    Output file (default: TICKERS_FILE or equities.csv)";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search { query: String },
    Analyze { symbol: String, days: Option<u32>, json: bool },
    BuildTickers { out: Option<PathBuf> },
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    match args.iter().position(|a| a == flag) {
        Some(i) => match args.get(i + 1) {
            Some(value) if !value.starts_with("--") => Ok(Some(value.as_str())),
            _ => bail!("{} requires a value", flag),
        },
        None => Ok(None),
    }
}

/// Parse the arguments after the program name.
pub fn parse_args(args: &[String]) -> Result<Command> {
    let Some(command) = args.first() else {
        bail!("missing command");
    };
    let rest = &args[1..];
    let positional = || rest.first().filter(|a| !a.starts_with("--")).cloned();

    match command.as_str() {
        "search" => {
            let query = rest
                .iter()
                .take_while(|a| !a.starts_with("--"))
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
            if query.trim().is_empty() {
                bail!("search requires a query");
            }
            Ok(Command::Search { query })
        }
        "analyze" => {
            let symbol = positional().context("analyze requires a symbol")?;
            let days = flag_value(rest, "--days")?
                .map(|v| v.parse::<u32>().with_context(|| format!("invalid --days value '{}'", v)))
                .transpose()?;
            let json = rest.iter().any(|a| a == "--json");
            Ok(Command::Analyze { symbol, days, json })
        }
        "build-tickers" => {
            let out = flag_value(rest, "--out")?.map(PathBuf::from);
            Ok(Command::BuildTickers { out })
        }
        other => bail!("unknown command '{}'", other),
    }
}
