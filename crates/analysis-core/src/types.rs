use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Daily OHLCV bar. Dates are exchange-local calendar days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Indicator values aligned 1:1 with the bars they were computed from.
/// `None` marks warm-up positions with insufficient history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub dates: Vec<NaiveDate>,
    pub ma: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// One quarter of the provider's income statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyStatement {
    pub period_end: NaiveDate,
    pub total_revenue: Option<f64>,
    pub net_income: Option<f64>,
}

/// A point of the (irregular) shares-outstanding history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SharesRecord {
    pub date: NaiveDate,
    pub shares: f64,
}

/// Quarterly earnings report after merging EPS and revenue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarningsEvent {
    pub report_date: NaiveDate,
    pub eps: f64,
    pub revenue: f64,
}

/// Earnings regressors on the daily axis. Zero means "no report that day".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyRegressorRow {
    pub date: NaiveDate,
    pub eps: f64,
    pub revenue: f64,
}

/// Free-form key/value snapshot as returned by the provider.
pub type RawSnapshot = HashMap<String, serde_json::Value>;

/// Ticker lookup entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickerInfo {
    pub symbol: String,
    pub name: String,
}

/// Training row handed to a forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub date: NaiveDate,
    pub y: f64,
    pub regressors: Vec<f64>,
}

/// Future row: regressor values must be supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FutureRow {
    pub date: NaiveDate,
    pub regressors: Vec<f64>,
}

/// Everything a forecaster needs for one fit/predict pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastInput {
    pub regressor_names: Vec<String>,
    pub history: Vec<HistoryRow>,
    pub future: Vec<FutureRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

/// A data source that failed and was replaced by an empty/default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedSource {
    pub source: String,
    pub reason: String,
}

impl DegradedSource {
    pub fn new(source: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            source: source.into(),
            reason: reason.to_string(),
        }
    }
}
