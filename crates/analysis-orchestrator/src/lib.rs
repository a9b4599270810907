use analysis_core::{
    AnalysisError, DailyRegressorRow, DegradedSource, EarningsEvent, IndicatorSeries,
    MarketDataProvider, PriceBar,
};
use chrono::{Months, NaiveDate, Utc};
use forecast_engine::{ForecastHorizon, ForecastOrchestrator, ForecastTable};
use fundamental_analysis::{align_to_daily, build_earnings_events, map_fundamentals, FundamentalsSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use technical_analysis::IndicatorEngine;

pub const DEFAULT_HISTORY_YEARS: u32 = 5;

/// Share counts are requested from here regardless of the price window, so
/// statement quarters before the window still find a count to carry forward.
fn shares_history_start(from: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).map_or(from, |epoch| epoch.min(from))
}

/// First day of a `years`-long window ending at `as_of`.
fn history_start(as_of: NaiveDate, years: u32) -> NaiveDate {
    years
        .checked_mul(12)
        .and_then(|months| as_of.checked_sub_months(Months::new(months)))
        .unwrap_or(NaiveDate::MIN)
}

/// Everything computed for one ticker request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerReport {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub bars: Vec<PriceBar>,
    pub indicators: IndicatorSeries,
    pub earnings: Vec<EarningsEvent>,
    pub regressors: Vec<DailyRegressorRow>,
    pub fundamentals: FundamentalsSnapshot,
    pub forecast: Option<ForecastTable>,
    /// Sources that failed and were replaced by empty/default data
    pub degraded: Vec<DegradedSource>,
}

impl TickerReport {
    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// Percentage change from the last close to the final forecast estimate.
    pub fn forecast_change(&self) -> Option<f64> {
        let forecast = self.forecast.as_ref()?;
        forecast.change_from(self.last_close()?)
    }

    pub fn is_degraded(&self, source: &str) -> bool {
        self.degraded.iter().any(|d| d.source == source)
    }
}

/// Per-ticker pipeline: fetch, indicators, earnings regressors, forecast and
/// fundamentals. Collaborator failures degrade their part of the report.
pub struct AnalysisOrchestrator {
    provider: Arc<dyn MarketDataProvider>,
    indicator_engine: IndicatorEngine,
    forecaster: ForecastOrchestrator,
    history_years: u32,
}

impl AnalysisOrchestrator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        indicator_engine: IndicatorEngine,
        forecaster: ForecastOrchestrator,
    ) -> Self {
        Self {
            provider,
            indicator_engine,
            forecaster,
            history_years: DEFAULT_HISTORY_YEARS,
        }
    }

    pub fn with_history_years(mut self, years: u32) -> Self {
        self.history_years = years.max(1);
        self
    }

    /// Analyze `symbol` with today's date as the end of the history window.
    pub async fn analyze(
        &self,
        symbol: &str,
        horizon: ForecastHorizon,
    ) -> Result<TickerReport, AnalysisError> {
        self.analyze_as_of(symbol, horizon, Utc::now().date_naive()).await
    }

    /// Only an empty symbol is an error; everything else degrades.
    pub async fn analyze_as_of(
        &self,
        symbol: &str,
        horizon: ForecastHorizon,
        as_of: NaiveDate,
    ) -> Result<TickerReport, AnalysisError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AnalysisError::InvalidData("Symbol must not be empty".to_string()));
        }
        let from = history_start(as_of, self.history_years);

        tracing::info!(
            "Starting analysis for {} ({} to {}, horizon {} days)",
            symbol,
            from,
            as_of,
            horizon.days()
        );

        let (bars_result, fundamentals_result, statements_result, shares_result) = tokio::join!(
            self.provider.daily_bars(&symbol, from, as_of),
            self.provider.fundamentals(&symbol),
            self.provider.quarterly_statements(&symbol),
            self.provider.shares_history(&symbol, shares_history_start(from), as_of),
        );

        let mut degraded = Vec::new();

        let bars = match bars_result {
            Ok(bars) => bars,
            Err(e) => {
                tracing::warn!("Failed to fetch prices for {}: {}", symbol, e);
                degraded.push(DegradedSource::new("prices", e));
                Vec::new()
            }
        };

        let indicators = self.indicator_engine.compute(&bars);

        let earnings = build_earnings_events(statements_result, shares_result, as_of);
        degraded.extend(earnings.degraded);
        let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
        let regressors = align_to_daily(&earnings.events, &dates);

        let forecast = if bars.is_empty() {
            None
        } else {
            match self.forecaster.forecast(&bars, &indicators, &regressors, horizon) {
                Ok(table) => Some(table),
                Err(e) => {
                    tracing::warn!("Forecast unavailable for {}: {}", symbol, e);
                    degraded.push(DegradedSource::new("forecast", e));
                    None
                }
            }
        };

        let fundamentals = match fundamentals_result {
            Ok(raw) => map_fundamentals(&raw),
            Err(e) => {
                tracing::warn!("Failed to fetch fundamentals for {}: {}", symbol, e);
                degraded.push(DegradedSource::new("fundamentals", e));
                FundamentalsSnapshot::default()
            }
        };

        tracing::info!(
            "Analysis complete for {}: {} bars, {} earnings events, forecast: {}, degraded sources: {}",
            symbol,
            bars.len(),
            earnings.events.len(),
            forecast.is_some(),
            degraded.len()
        );

        Ok(TickerReport {
            symbol,
            as_of,
            bars,
            indicators,
            earnings: earnings.events,
            regressors,
            fundamentals,
            forecast,
            degraded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{
        FetchError, QuarterlyStatement, RawSnapshot, SharesRecord, TickerInfo,
    };
    use async_trait::async_trait;
    use chrono::{Datelike, Duration, Weekday};
    use forecast_engine::RegressionForecaster;
    use serde_json::json;
    use technical_analysis::IndicatorConfig;

    #[derive(Default)]
    struct MockProvider {
        fail_prices: bool,
        fail_fundamentals: bool,
        fail_statements: bool,
        fail_shares: bool,
        /// Only return the last `n` bars of the window
        max_bars: Option<usize>,
    }

    fn unavailable(what: &str) -> FetchError {
        FetchError::Status {
            status: 503,
            url: format!("mock://{}", what),
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn daily_bars(
            &self,
            _symbol: &str,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<PriceBar>, FetchError> {
            if self.fail_prices {
                return Err(unavailable("chart"));
            }
            let mut bars = Vec::new();
            let mut date = from;
            let mut i = 0.0_f64;
            while date <= to {
                if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                    let close = 100.0 + 0.05 * i + 3.0 * (i / 5.0).sin();
                    bars.push(PriceBar {
                        date,
                        open: close - 0.5,
                        high: close + 1.0,
                        low: close - 1.0,
                        close,
                        volume: 1_000_000.0 + 10_000.0 * (i % 7.0),
                    });
                    i += 1.0;
                }
                date += Duration::days(1);
            }
            if let Some(n) = self.max_bars {
                let skip = bars.len().saturating_sub(n);
                bars.drain(..skip);
            }
            Ok(bars)
        }

        async fn fundamentals(&self, _symbol: &str) -> Result<RawSnapshot, FetchError> {
            if self.fail_fundamentals {
                return Err(unavailable("quoteSummary"));
            }
            Ok(serde_json::from_value(json!({
                "trailingPE": {"raw": 24.0},
                "profitMargins": 0.21
            }))
            .unwrap())
        }

        async fn quarterly_statements(
            &self,
            _symbol: &str,
        ) -> Result<Vec<QuarterlyStatement>, FetchError> {
            if self.fail_statements {
                return Err(unavailable("timeseries"));
            }
            Ok(vec![
                QuarterlyStatement {
                    period_end: NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
                    total_revenue: Some(1_000.0),
                    net_income: Some(150.0),
                },
                QuarterlyStatement {
                    period_end: NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
                    total_revenue: Some(1_100.0),
                    net_income: Some(180.0),
                },
            ])
        }

        async fn shares_history(
            &self,
            _symbol: &str,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<SharesRecord>, FetchError> {
            if self.fail_shares {
                return Err(unavailable("shares"));
            }
            let records = vec![
                SharesRecord {
                    date: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
                    shares: 100.0,
                },
                SharesRecord {
                    date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                    shares: 100.0,
                },
            ];
            Ok(records
                .into_iter()
                .filter(|r| r.date >= from && r.date <= to)
                .collect())
        }

        async fn search_symbols(&self, _query: &str) -> Result<Vec<TickerInfo>, FetchError> {
            Ok(vec![])
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    fn orchestrator(provider: MockProvider) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(
            Arc::new(provider),
            IndicatorEngine::new(IndicatorConfig::default()),
            ForecastOrchestrator::new(Arc::new(RegressionForecaster::default())),
        )
        .with_history_years(2)
    }

    fn horizon(days: u32) -> ForecastHorizon {
        ForecastHorizon::new(days).unwrap()
    }

    #[tokio::test]
    async fn test_full_report() {
        let report = orchestrator(MockProvider::default())
            .analyze_as_of(" aapl ", horizon(60), as_of())
            .await
            .unwrap();

        assert_eq!(report.symbol, "AAPL");
        assert!(report.degraded.is_empty());
        assert!(!report.bars.is_empty());
        assert_eq!(report.indicators.len(), report.bars.len());
        assert_eq!(report.regressors.len(), report.bars.len());

        let q1 = report
            .regressors
            .iter()
            .find(|r| r.date == NaiveDate::from_ymd_opt(2023, 3, 31).unwrap())
            .unwrap();
        assert_eq!(q1.eps, 1.5);
        assert_eq!(q1.revenue, 1_000.0);
        assert_eq!(report.earnings.len(), 2);

        let forecast = report.forecast.as_ref().unwrap();
        assert_eq!(forecast.future().len(), 60);
        assert_eq!(forecast.last_observed, as_of());
        assert!(report.forecast_change().is_some());

        assert_eq!(report.fundamentals.pe_ratio, Some(24.0));
        assert_eq!(report.fundamentals.profit_margins, Some(0.21));
        assert_eq!(report.fundamentals.roe, None);
    }

    #[tokio::test]
    async fn test_price_failure_degrades_to_empty_report() {
        let provider = MockProvider {
            fail_prices: true,
            ..Default::default()
        };
        let report = orchestrator(provider)
            .analyze_as_of("MSFT", horizon(30), as_of())
            .await
            .unwrap();

        assert!(report.bars.is_empty());
        assert!(report.indicators.is_empty());
        assert!(report.regressors.is_empty());
        assert!(report.forecast.is_none());
        assert!(report.is_degraded("prices"));
        assert!(!report.is_degraded("forecast"));
        assert_eq!(report.fundamentals.pe_ratio, Some(24.0));
        assert_eq!(report.last_close(), None);
    }

    #[tokio::test]
    async fn test_fundamentals_failure_keeps_forecast() {
        let provider = MockProvider {
            fail_fundamentals: true,
            ..Default::default()
        };
        let report = orchestrator(provider)
            .analyze_as_of("MSFT", horizon(30), as_of())
            .await
            .unwrap();

        assert!(report.is_degraded("fundamentals"));
        assert_eq!(report.fundamentals, FundamentalsSnapshot::default());
        assert!(report.forecast.is_some());
    }

    #[tokio::test]
    async fn test_statements_failure_zero_fills_regressors() {
        let provider = MockProvider {
            fail_statements: true,
            ..Default::default()
        };
        let report = orchestrator(provider)
            .analyze_as_of("MSFT", horizon(30), as_of())
            .await
            .unwrap();

        assert!(report.is_degraded("quarterly_financials"));
        assert!(report.earnings.is_empty());
        assert!(report.regressors.iter().all(|r| r.eps == 0.0 && r.revenue == 0.0));
        assert_eq!(report.forecast.as_ref().unwrap().future().len(), 30);
    }

    #[tokio::test]
    async fn test_shares_failure_keeps_revenue() {
        let provider = MockProvider {
            fail_shares: true,
            ..Default::default()
        };
        let report = orchestrator(provider)
            .analyze_as_of("MSFT", horizon(30), as_of())
            .await
            .unwrap();

        assert!(report.is_degraded("shares_outstanding"));
        assert!(report.regressors.iter().all(|r| r.eps == 0.0));
        assert!(report.regressors.iter().any(|r| r.revenue == 1_100.0));
    }

    #[tokio::test]
    async fn test_short_history_has_no_forecast() {
        let provider = MockProvider {
            max_bars: Some(25),
            ..Default::default()
        };
        let report = orchestrator(provider)
            .analyze_as_of("NEWCO", horizon(30), as_of())
            .await
            .unwrap();

        assert_eq!(report.bars.len(), 25);
        assert!(report.forecast.is_none());
        assert!(report.is_degraded("forecast"));
    }

    #[tokio::test]
    async fn test_eps_uses_share_count_from_before_price_window() {
        let report = orchestrator(MockProvider::default())
            .with_history_years(1)
            .analyze_as_of("AAPL", horizon(30), as_of())
            .await
            .unwrap();

        // Price window starts 2023-06-28; the only earlier share count is 2020-01-15
        assert_eq!(report.bars.first().unwrap().date, NaiveDate::from_ymd_opt(2023, 6, 28).unwrap());
        assert_eq!(
            report.earnings,
            vec![
                EarningsEvent {
                    report_date: NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
                    eps: 1.5,
                    revenue: 1_000.0,
                },
                EarningsEvent {
                    report_date: NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
                    eps: 1.8,
                    revenue: 1_100.0,
                },
            ]
        );
        let q2 = report
            .regressors
            .iter()
            .find(|r| r.date == NaiveDate::from_ymd_opt(2023, 6, 30).unwrap())
            .unwrap();
        assert_eq!(q2.eps, 1.8);
    }

    #[test]
    fn test_history_start() {
        assert_eq!(history_start(as_of(), 2), NaiveDate::from_ymd_opt(2022, 6, 28).unwrap());
        assert_eq!(history_start(as_of(), u32::MAX), NaiveDate::MIN);
        assert_eq!(
            shares_history_start(NaiveDate::from_ymd_opt(2022, 6, 28).unwrap()),
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
        );
        assert_eq!(
            shares_history_start(NaiveDate::from_ymd_opt(1995, 1, 3).unwrap()),
            NaiveDate::from_ymd_opt(1995, 1, 3).unwrap()
        );
    }

    #[tokio::test]
    async fn test_empty_symbol_is_rejected() {
        let err = orchestrator(MockProvider::default())
            .analyze_as_of("   ", horizon(30), as_of())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidData(_)));
    }
}
