//! Quarterly earnings → daily regressor rows.
//!
//! EPS is derived from net income and the share count at quarter end, merged
//! with revenue on the report date, then left-joined onto the trading-day axis.
//! Days without a report carry zeros.

use analysis_core::{
    DailyRegressorRow, DegradedSource, EarningsEvent, FetchError, QuarterlyStatement,
    SharesRecord,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

/// Calendar quarter end (Mar 31, Jun 30, Sep 30, Dec 31) containing `date`.
pub fn quarter_end(date: NaiveDate) -> NaiveDate {
    let end_month = ((date.month() - 1) / 3 + 1) * 3;
    let day = if end_month == 3 || end_month == 12 { 31 } else { 30 };
    NaiveDate::from_ymd_opt(date.year(), end_month, day).unwrap_or(date)
}

/// Resample a share-count history to quarter ends, forward-filling.
///
/// Covers every quarter end from the one containing the first observation to
/// the one containing the last. The value at each quarter end is the latest
/// observation dated on or before it.
pub fn quarter_end_shares(history: &[SharesRecord]) -> Vec<SharesRecord> {
    let mut sorted: Vec<SharesRecord> = history
        .iter()
        .copied()
        .filter(|r| r.shares.is_finite())
        .collect();
    sorted.sort_by_key(|r| r.date);

    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return vec![];
    };

    let mut result = Vec::new();
    let mut next_obs = 0;
    let mut current = quarter_end(first.date);
    let stop = quarter_end(last.date);

    while current <= stop {
        while next_obs < sorted.len() && sorted[next_obs].date <= current {
            next_obs += 1;
        }
        // next_obs >= 1: the first quarter end is on or after the first observation
        result.push(SharesRecord {
            date: current,
            shares: sorted[next_obs - 1].shares,
        });
        current = quarter_end(current + Duration::days(1));
    }

    result
}

/// EPS per statement row: net income divided by the quarter-end share count
/// with the exact same date. Unknown when either side is missing.
pub fn derive_quarterly_eps(
    statements: &[QuarterlyStatement],
    quarter_shares: &[SharesRecord],
) -> Vec<(NaiveDate, Option<f64>)> {
    let shares_by_date: BTreeMap<NaiveDate, f64> =
        quarter_shares.iter().map(|r| (r.date, r.shares)).collect();

    statements
        .iter()
        .map(|row| {
            let eps = match (row.net_income, shares_by_date.get(&row.period_end)) {
                (Some(income), Some(&shares)) if shares > 0.0 => Some(income / shares),
                _ => None,
            };
            (row.period_end, eps.filter(|v| v.is_finite()))
        })
        .collect()
}

/// Earnings events plus the sources that had to be dropped on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EarningsOutcome {
    pub events: Vec<EarningsEvent>,
    pub degraded: Vec<DegradedSource>,
}

/// Merge EPS and revenue into per-quarter events reported on or before `as_of`.
///
/// A failed statements fetch empties both columns (EPS needs net income); a
/// failed shares fetch empties only EPS. Unknown values become 0.
pub fn build_earnings_events(
    statements: Result<Vec<QuarterlyStatement>, FetchError>,
    shares: Result<Vec<SharesRecord>, FetchError>,
    as_of: NaiveDate,
) -> EarningsOutcome {
    let mut degraded = Vec::new();

    let (revenue, eps) = match statements {
        Ok(rows) => {
            let revenue: Vec<(NaiveDate, Option<f64>)> =
                rows.iter().map(|r| (r.period_end, r.total_revenue)).collect();
            let eps = match shares {
                Ok(history) => derive_quarterly_eps(&rows, &quarter_end_shares(&history)),
                Err(e) => {
                    tracing::warn!("Shares outstanding unavailable, EPS regressor left empty: {}", e);
                    degraded.push(DegradedSource::new("shares_outstanding", e));
                    vec![]
                }
            };
            (revenue, eps)
        }
        Err(e) => {
            tracing::warn!("Quarterly financials unavailable, EPS and revenue left empty: {}", e);
            degraded.push(DegradedSource::new("quarterly_financials", e));
            (vec![], vec![])
        }
    };

    // Outer merge on report date
    let mut merged: BTreeMap<NaiveDate, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for (date, value) in eps.into_iter().filter(|(d, _)| *d <= as_of) {
        merged.entry(date).or_default().0 = value;
    }
    for (date, value) in revenue.into_iter().filter(|(d, _)| *d <= as_of) {
        merged.entry(date).or_default().1 = value;
    }

    let events = merged
        .into_iter()
        .map(|(report_date, (eps, revenue))| EarningsEvent {
            report_date,
            eps: eps.filter(|v| v.is_finite()).unwrap_or(0.0),
            revenue: revenue.filter(|v| v.is_finite()).unwrap_or(0.0),
        })
        .collect::<Vec<_>>();

    tracing::debug!("Built {} earnings events", events.len());

    EarningsOutcome { events, degraded }
}

/// Left-join earnings events onto the daily axis by exact date.
///
/// Returns exactly one row per input date, in input order. A report dated on
/// a day that is not on the axis produces no row.
pub fn align_to_daily(events: &[EarningsEvent], dates: &[NaiveDate]) -> Vec<DailyRegressorRow> {
    let by_date: BTreeMap<NaiveDate, &EarningsEvent> =
        events.iter().map(|e| (e.report_date, e)).collect();

    dates
        .iter()
        .map(|&date| match by_date.get(&date) {
            Some(event) => DailyRegressorRow {
                date,
                eps: event.eps,
                revenue: event.revenue,
            },
            None => DailyRegressorRow {
                date,
                eps: 0.0,
                revenue: 0.0,
            },
        })
        .collect()
}
