use crate::parse;
use analysis_core::{
    FetchError, MarketDataProvider, PriceBar, QuarterlyStatement, RawSnapshot, SharesRecord,
    TickerInfo,
};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use serde_json::Value;
use std::time::Duration;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";
const SEARCH_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";

const SUMMARY_MODULES: &str = "summaryDetail,defaultKeyStatistics,financialData";
/// Earliest period requested for the quarterly statements
const STATEMENTS_EPOCH: i64 = 493_590_046;
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct YahooFinanceClient {
    client: reqwest::Client,
}

fn unix_start(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(0)
}

impl YahooFinanceClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceBar>, FetchError> {
        let url = format!("{}/{}", CHART_URL, symbol);
        let end = to.checked_add_days(Days::new(1)).unwrap_or(to);
        let json = self
            .get_json(
                &url,
                &[
                    ("period1", unix_start(from).to_string()),
                    ("period2", unix_start(end).to_string()),
                    ("interval", "1d".to_string()),
                ],
            )
            .await?;

        let bars = parse::chart_bars(&json, symbol)?;
        tracing::debug!("Fetched {} daily bars for {}", bars.len(), symbol);
        Ok(bars
            .into_iter()
            .filter(|b| b.date >= from && b.date <= to)
            .collect())
    }

    async fn fundamentals(&self, symbol: &str) -> Result<RawSnapshot, FetchError> {
        let url = format!("{}/{}", SUMMARY_URL, symbol);
        let json = self
            .get_json(&url, &[("modules", SUMMARY_MODULES.to_string())])
            .await?;
        parse::summary_snapshot(&json, symbol)
    }

    async fn quarterly_statements(
        &self,
        symbol: &str,
    ) -> Result<Vec<QuarterlyStatement>, FetchError> {
        let url = format!("{}/{}", TIMESERIES_URL, symbol);
        let kinds = format!("{},{}", parse::REVENUE_SERIES, parse::NET_INCOME_SERIES);
        let json = self
            .get_json(
                &url,
                &[
                    ("symbol", symbol.to_string()),
                    ("type", kinds),
                    ("period1", STATEMENTS_EPOCH.to_string()),
                    ("period2", Utc::now().timestamp().to_string()),
                ],
            )
            .await?;
        parse::quarterly_statements(&json)
    }

    async fn shares_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SharesRecord>, FetchError> {
        let url = format!("{}/{}", TIMESERIES_URL, symbol);
        let end = to.checked_add_days(Days::new(1)).unwrap_or(to);
        let json = self
            .get_json(
                &url,
                &[
                    ("symbol", symbol.to_string()),
                    ("period1", unix_start(from).to_string()),
                    ("period2", unix_start(end).to_string()),
                ],
            )
            .await?;
        parse::shares_records(&json)
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<TickerInfo>, FetchError> {
        let json = self
            .get_json(
                SEARCH_URL,
                &[
                    ("q", query.to_string()),
                    ("quotesCount", "10".to_string()),
                    ("newsCount", "0".to_string()),
                ],
            )
            .await?;
        parse::search_quotes(&json)
    }
}
