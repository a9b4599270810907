use anyhow::{bail, Context, Result};
use forecast_engine::ForecastHorizon;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use technical_analysis::IndicatorConfig;

const MAX_HISTORY_YEARS: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub tickers_file: PathBuf,
    pub history_years: u32,
    pub forecast_days: u32,
    pub indicators: IndicatorConfig,
    pub interval_width: f64,
    pub yahoo_timeout_secs: u64,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = lookup(name).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .with_context(|| format!("{} has an invalid value: '{}'", name, raw))
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            tickers_file: lookup("TICKERS_FILE")
                .unwrap_or_else(|| "equities.csv".to_string())
                .into(),
            history_years: parse_or(&lookup, "HISTORY_YEARS", "5")?,
            forecast_days: parse_or(&lookup, "FORECAST_DAYS", "180")?,
            indicators: IndicatorConfig {
                ma_window: parse_or(&lookup, "MA_WINDOW", "20")?,
                rsi_window: parse_or(&lookup, "RSI_WINDOW", "14")?,
                macd_fast: parse_or(&lookup, "MACD_FAST", "12")?,
                macd_slow: parse_or(&lookup, "MACD_SLOW", "26")?,
                macd_signal: parse_or(&lookup, "MACD_SIGNAL", "9")?,
            },
            interval_width: parse_or(&lookup, "FORECAST_INTERVAL_WIDTH", "0.8")?,
            yahoo_timeout_secs: parse_or(&lookup, "YAHOO_TIMEOUT_SECS", "30")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let windows = &self.indicators;
        if windows.ma_window == 0
            || windows.rsi_window == 0
            || windows.macd_fast == 0
            || windows.macd_signal == 0
        {
            bail!("indicator windows must be positive");
        }
        if windows.macd_fast >= windows.macd_slow {
            bail!(
                "MACD_FAST ({}) must be shorter than MACD_SLOW ({})",
                windows.macd_fast,
                windows.macd_slow
            );
        }
        if !(1..=MAX_HISTORY_YEARS).contains(&self.history_years) {
            bail!("HISTORY_YEARS must be between 1 and {}", MAX_HISTORY_YEARS);
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            bail!("FORECAST_INTERVAL_WIDTH must be in (0, 1)");
        }
        self.horizon()?;
        Ok(())
    }

    pub fn horizon(&self) -> Result<ForecastHorizon> {
        ForecastHorizon::new(self.forecast_days).context("FORECAST_DAYS out of range")
    }
}
