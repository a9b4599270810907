use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    AnalysisError, FetchError, ForecastInput, ForecastPoint, PriceBar, QuarterlyStatement,
    RawSnapshot, SharesRecord, TickerInfo,
};

/// Source of prices, fundamentals and financial statements for one symbol.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars in `[from, to]`, ascending by date.
    async fn daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceBar>, FetchError>;

    /// Key/value fundamentals snapshot (ratios, margins, yields...).
    async fn fundamentals(&self, symbol: &str) -> Result<RawSnapshot, FetchError>;

    /// Quarterly income statement rows (revenue and net income).
    async fn quarterly_statements(&self, symbol: &str)
        -> Result<Vec<QuarterlyStatement>, FetchError>;

    /// Shares outstanding history, irregularly spaced.
    async fn shares_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SharesRecord>, FetchError>;

    async fn search_symbols(&self, query: &str) -> Result<Vec<TickerInfo>, FetchError>;
}

/// Time-series model with named external regressors.
///
/// Implementations fit on `input.history` and return one point per history
/// row followed by one point per future row, in order.
pub trait Forecaster: Send + Sync {
    fn fit_predict(&self, input: &ForecastInput) -> Result<Vec<ForecastPoint>, AnalysisError>;
}
