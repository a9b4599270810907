use analysis_core::{IndicatorSeries, PriceBar};
use serde::{Deserialize, Serialize};

use crate::indicators::*;

/// Window lengths used by [`IndicatorEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub ma_window: usize,
    pub rsi_window: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ma_window: 20,
            rsi_window: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    /// Compute MA, RSI and MACD/signal for an ascending bar series.
    ///
    /// Never fails: short histories just leave the affected outputs undefined.
    pub fn compute(&self, bars: &[PriceBar]) -> IndicatorSeries {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let macd_result = macd(
            &closes,
            self.config.macd_fast,
            self.config.macd_slow,
            self.config.macd_signal,
        );

        IndicatorSeries {
            dates: bars.iter().map(|b| b.date).collect(),
            ma: sma(&closes, self.config.ma_window),
            rsi: rsi(&closes, self.config.rsi_window),
            macd: macd_result.macd_line,
            signal: macd_result.signal_line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000.0,
            })
            .collect()
    }

    #[test]
    fn test_series_aligned_with_bars() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let bars = bars_from_closes(&closes);
        let series = IndicatorEngine::default().compute(&bars);

        assert_eq!(series.len(), bars.len());
        assert_eq!(series.ma.len(), bars.len());
        assert_eq!(series.rsi.len(), bars.len());
        assert_eq!(series.macd.len(), bars.len());
        assert_eq!(series.signal.len(), bars.len());
        assert_eq!(series.dates[0], bars[0].date);
    }

    #[test]
    fn test_default_warm_up_lengths() {
        let closes: Vec<f64> = (0..60).map(|i| 50.0 + i as f64).collect();
        let series = IndicatorEngine::default().compute(&bars_from_closes(&closes));

        assert_eq!(series.ma.iter().position(Option::is_some), Some(19));
        assert_eq!(series.rsi.iter().position(Option::is_some), Some(14));
        assert_eq!(series.macd.iter().position(Option::is_some), Some(25));
        assert_eq!(series.signal.iter().position(Option::is_some), Some(33));
    }

    #[test]
    fn test_custom_ma_window() {
        let closes: Vec<f64> = (10..=21).map(|c| c as f64).collect();
        let engine = IndicatorEngine::new(IndicatorConfig {
            ma_window: 5,
            ..IndicatorConfig::default()
        });
        let series = engine.compute(&bars_from_closes(&closes));

        assert!(series.ma[..4].iter().all(Option::is_none));
        assert_eq!(series.ma[4], Some(12.0));
        // 12 bars is not enough for the slow EMA
        assert!(series.macd.iter().all(Option::is_none));
    }

    #[test]
    fn test_empty_input() {
        let series = IndicatorEngine::default().compute(&[]);
        assert!(series.is_empty());
        assert!(series.rsi.is_empty());
    }
}
