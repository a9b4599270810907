use analysis_core::{
    AnalysisError, DailyRegressorRow, ForecastInput, ForecastPoint, Forecaster, FutureRow,
    HistoryRow, IndicatorSeries, PriceBar,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Regressors handed to the forecaster, in column order.
pub const REGRESSOR_NAMES: [&str; 4] = ["RSI", "EPS", "Revenue", "Volume"];

/// Number of calendar days to forecast past the last observed day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastHorizon(u32);

impl ForecastHorizon {
    pub const MIN_DAYS: u32 = 30;
    pub const MAX_DAYS: u32 = 365;
    pub const DEFAULT_DAYS: u32 = 180;

    pub fn new(days: u32) -> Result<Self, AnalysisError> {
        if !(Self::MIN_DAYS..=Self::MAX_DAYS).contains(&days) {
            return Err(AnalysisError::InvalidData(format!(
                "forecast horizon must be between {} and {} days, got {}",
                Self::MIN_DAYS,
                Self::MAX_DAYS,
                days
            )));
        }
        Ok(Self(days))
    }

    pub fn days(&self) -> u32 {
        self.0
    }
}

impl Default for ForecastHorizon {
    fn default() -> Self {
        Self(Self::DEFAULT_DAYS)
    }
}

/// One trading day with every feature the forecast may use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFeatureRow {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
    pub ma: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub eps: Option<f64>,
    pub revenue: Option<f64>,
}

impl DailyFeatureRow {
    /// Training row, or `None` if any column is missing.
    fn to_history_row(&self) -> Option<HistoryRow> {
        // MA and MACD are not regressors but still gate the row
        self.ma?;
        self.macd?;
        self.signal?;
        let row = HistoryRow {
            date: self.date,
            y: self.close,
            regressors: vec![self.rsi?, self.eps?, self.revenue?, self.volume],
        };
        let finite = row.y.is_finite() && row.regressors.iter().all(|v| v.is_finite());
        finite.then_some(row)
    }
}

fn pick(series: &[Option<f64>], index: Option<usize>) -> Option<f64> {
    index.and_then(|i| series.get(i).copied().flatten())
}

/// Merge bars, indicators and earnings regressors into one table keyed by bar date.
pub fn build_model_frame(
    bars: &[PriceBar],
    indicators: &IndicatorSeries,
    regressors: &[DailyRegressorRow],
) -> Vec<DailyFeatureRow> {
    let indicator_index: HashMap<NaiveDate, usize> = indicators
        .dates
        .iter()
        .enumerate()
        .map(|(i, d)| (*d, i))
        .collect();
    let regressor_index: HashMap<NaiveDate, &DailyRegressorRow> =
        regressors.iter().map(|r| (r.date, r)).collect();

    bars.iter()
        .map(|bar| {
            let i = indicator_index.get(&bar.date).copied();
            let earnings = regressor_index.get(&bar.date);
            DailyFeatureRow {
                date: bar.date,
                close: bar.close,
                volume: bar.volume,
                ma: pick(&indicators.ma, i),
                rsi: pick(&indicators.rsi, i),
                macd: pick(&indicators.macd, i),
                signal: pick(&indicators.signal, i),
                eps: earnings.map(|r| r.eps),
                revenue: earnings.map(|r| r.revenue),
            }
        })
        .collect()
}

/// Forecast over fitted history followed by the future window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    pub points: Vec<ForecastPoint>,
    pub history_len: usize,
    pub last_observed: NaiveDate,
}

impl ForecastTable {
    fn split(&self) -> (&[ForecastPoint], &[ForecastPoint]) {
        self.points.split_at(self.history_len.min(self.points.len()))
    }

    pub fn history(&self) -> &[ForecastPoint] {
        self.split().0
    }

    pub fn future(&self) -> &[ForecastPoint] {
        self.split().1
    }

    /// Percentage change of the final point estimate relative to `last_close`.
    pub fn change_from(&self, last_close: f64) -> Option<f64> {
        let last = self.future().last()?;
        (last_close != 0.0).then(|| (last.estimate - last_close) / last_close * 100.0)
    }
}

/// Drives a [`Forecaster`] with the close series and the named regressors.
#[derive(Clone)]
pub struct ForecastOrchestrator {
    forecaster: Arc<dyn Forecaster>,
}

impl ForecastOrchestrator {
    pub fn new(forecaster: Arc<dyn Forecaster>) -> Self {
        Self { forecaster }
    }

    /// Assemble the model input: complete historical rows plus `horizon` future
    /// days. RSI and Volume are held at their last observed value, EPS and
    /// Revenue are zero (no scheduled earnings).
    pub fn prepare_input(
        &self,
        bars: &[PriceBar],
        indicators: &IndicatorSeries,
        regressors: &[DailyRegressorRow],
        horizon: ForecastHorizon,
    ) -> Result<ForecastInput, AnalysisError> {
        let frame = build_model_frame(bars, indicators, regressors);
        let history: Vec<HistoryRow> = frame.iter().filter_map(DailyFeatureRow::to_history_row).collect();

        tracing::debug!(
            "Model frame: {} days, {} complete after dropping warm-up rows",
            frame.len(),
            history.len()
        );

        let last = history.last().ok_or_else(|| {
            AnalysisError::InsufficientData(
                "No complete rows left after indicator warm-up".to_string(),
            )
        })?;
        let last_rsi = last.regressors[0];
        let last_volume = last.regressors[3];

        let future = (1..=i64::from(horizon.days()))
            .map(|offset| FutureRow {
                date: last.date + Duration::days(offset),
                regressors: vec![last_rsi, 0.0, 0.0, last_volume],
            })
            .collect();

        Ok(ForecastInput {
            regressor_names: REGRESSOR_NAMES.iter().map(|s| s.to_string()).collect(),
            history,
            future,
        })
    }

    pub fn forecast(
        &self,
        bars: &[PriceBar],
        indicators: &IndicatorSeries,
        regressors: &[DailyRegressorRow],
        horizon: ForecastHorizon,
    ) -> Result<ForecastTable, AnalysisError> {
        let input = self.prepare_input(bars, indicators, regressors, horizon)?;
        let points = self.forecaster.fit_predict(&input)?;

        let expected = input.history.len() + input.future.len();
        if points.len() != expected {
            return Err(AnalysisError::CalculationError(format!(
                "forecaster returned {} points, expected {}",
                points.len(),
                expected
            )));
        }

        let last_observed = input.history[input.history.len() - 1].date;
        tracing::info!(
            "Forecast ready: {} fitted days, {} future days after {}",
            input.history.len(),
            input.future.len(),
            last_observed
        );

        Ok(ForecastTable {
            points,
            history_len: input.history.len(),
            last_observed,
        })
    }
}
