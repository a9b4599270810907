//! Additive trend + seasonality + regressor model fit by least squares.

use analysis_core::{stats, AnalysisError, ForecastInput, ForecastPoint, Forecaster};
use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

const WEEKLY_PERIOD: f64 = 7.0;
const YEARLY_PERIOD: f64 = 365.25;
/// History span (days) needed before a seasonal component is fitted.
const WEEKLY_MIN_SPAN: i64 = 14;
const YEARLY_MIN_SPAN: i64 = 730;

/// Linear-trend forecaster with Fourier seasonality and standardized regressors.
///
/// `y = a + b·t + weekly + yearly + Σ βᵢ·zᵢ`, with t the time since the first
/// history date scaled to [0, 1]. Intervals come from the residual standard
/// deviation and widen with the distance past the last history date.
#[derive(Debug, Clone)]
pub struct RegressionForecaster {
    interval_width: f64,
    weekly_order: usize,
    yearly_order: usize,
}

impl Default for RegressionForecaster {
    fn default() -> Self {
        Self {
            interval_width: 0.8,
            weekly_order: 3,
            yearly_order: 10,
        }
    }
}

/// Column layout fixed at fit time and reused for prediction.
struct Design {
    origin: NaiveDate,
    span_days: f64,
    weekly_order: usize,
    yearly_order: usize,
    /// (mean, std) per regressor; std 0 marks a constant column
    scaling: Vec<(f64, f64)>,
}

impl Design {
    fn width(&self) -> usize {
        2 + 2 * self.weekly_order + 2 * self.yearly_order + self.scaling.len()
    }

    fn row(&self, date: NaiveDate, regressors: &[f64], out: &mut Vec<f64>) {
        let t_days = (date - self.origin).num_days() as f64;
        out.push(1.0);
        out.push(t_days / self.span_days);
        fourier(t_days, WEEKLY_PERIOD, self.weekly_order, out);
        fourier(t_days, YEARLY_PERIOD, self.yearly_order, out);
        for (value, (mean, std)) in regressors.iter().zip(&self.scaling) {
            out.push(if *std > 0.0 { (value - mean) / std } else { 0.0 });
        }
    }
}

fn fourier(t_days: f64, period: f64, order: usize, out: &mut Vec<f64>) {
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * t_days / period;
        out.push(angle.sin());
        out.push(angle.cos());
    }
}

impl RegressionForecaster {
    /// `interval_width` is the coverage of the uncertainty band, in (0, 1).
    pub fn new(interval_width: f64) -> Result<Self, AnalysisError> {
        if !(interval_width > 0.0 && interval_width < 1.0) {
            return Err(AnalysisError::InvalidData(format!(
                "interval width must be in (0, 1), got {}",
                interval_width
            )));
        }
        Ok(Self {
            interval_width,
            ..Self::default()
        })
    }

    pub fn interval_width(&self) -> f64 {
        self.interval_width
    }

    fn design(&self, input: &ForecastInput) -> Result<Design, AnalysisError> {
        let first = input.history.first().ok_or_else(|| {
            AnalysisError::InsufficientData("No history rows to fit".to_string())
        })?;
        let last = &input.history[input.history.len() - 1];
        let span = (last.date - first.date).num_days();

        let scaling = (0..input.regressor_names.len())
            .map(|j| {
                let column: Vec<f64> = input.history.iter().map(|r| r.regressors[j]).collect();
                (stats::mean(&column), stats::std_dev(&column))
            })
            .collect();

        Ok(Design {
            origin: first.date,
            span_days: span.max(1) as f64,
            weekly_order: if span >= WEEKLY_MIN_SPAN { self.weekly_order } else { 0 },
            yearly_order: if span >= YEARLY_MIN_SPAN { self.yearly_order } else { 0 },
            scaling,
        })
    }

    fn validate(input: &ForecastInput) -> Result<(), AnalysisError> {
        let expected = input.regressor_names.len();
        let history_ok = input.history.iter().all(|r| r.regressors.len() == expected);
        let future_ok = input.future.iter().all(|r| r.regressors.len() == expected);
        if !history_ok || !future_ok {
            return Err(AnalysisError::InvalidData(format!(
                "every row must carry {} regressor values",
                expected
            )));
        }
        let finite = input
            .history
            .iter()
            .all(|r| r.y.is_finite() && r.regressors.iter().all(|v| v.is_finite()));
        if !finite {
            return Err(AnalysisError::InvalidData(
                "history contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}

impl Forecaster for RegressionForecaster {
    fn fit_predict(&self, input: &ForecastInput) -> Result<Vec<ForecastPoint>, AnalysisError> {
        Self::validate(input)?;
        let design = self.design(input)?;

        let n = input.history.len();
        let p = design.width();
        if n <= p {
            return Err(AnalysisError::InsufficientData(format!(
                "Need more than {} history rows to fit the model, got {}",
                p, n
            )));
        }

        let mut cells = Vec::with_capacity(n * p);
        for row in &input.history {
            design.row(row.date, &row.regressors, &mut cells);
        }
        let x = DMatrix::from_row_slice(n, p, &cells);
        let y = DVector::from_iterator(n, input.history.iter().map(|r| r.y));

        let svd = x.clone().svd(true, true);
        let tolerance = 1e-10 * svd.singular_values.max().max(1.0);
        let beta = svd
            .solve(&y, tolerance)
            .map_err(|e| AnalysisError::CalculationError(e.to_string()))?;

        let fitted = &x * &beta;
        let sse: f64 = (&y - &fitted).iter().map(|r| r * r).sum();
        let sigma = (sse / (n - p) as f64).sqrt();

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| AnalysisError::CalculationError(e.to_string()))?;
        let z = normal.inverse_cdf(0.5 + self.interval_width / 2.0);

        tracing::debug!(
            "Fitted {} parameters on {} rows (residual sigma {:.4})",
            p,
            n,
            sigma
        );

        let mut points = Vec::with_capacity(n + input.future.len());
        for (row, estimate) in input.history.iter().zip(fitted.iter()) {
            let half = z * sigma;
            points.push(ForecastPoint {
                date: row.date,
                estimate: *estimate,
                lower: estimate - half,
                upper: estimate + half,
            });
        }

        let last_date = input.history[n - 1].date;
        let mut row_cells = Vec::with_capacity(p);
        for row in &input.future {
            row_cells.clear();
            design.row(row.date, &row.regressors, &mut row_cells);
            let estimate: f64 = row_cells.iter().zip(beta.iter()).map(|(a, b)| a * b).sum();
            let ahead = (row.date - last_date).num_days().max(0) as f64;
            let half = z * sigma * (1.0 + ahead / n as f64).sqrt();
            points.push(ForecastPoint {
                date: row.date,
                estimate,
                lower: estimate - half,
                upper: estimate + half,
            });
        }

        if points
            .iter()
            .any(|pt| !(pt.estimate.is_finite() && pt.lower.is_finite() && pt.upper.is_finite()))
        {
            return Err(AnalysisError::CalculationError(
                "forecast produced non-finite values".to_string(),
            ));
        }

        Ok(points)
    }
}
