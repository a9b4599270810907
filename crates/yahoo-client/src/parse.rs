//! JSON response decoding, kept apart from the HTTP layer so it can be tested offline.

use analysis_core::{FetchError, PriceBar, QuarterlyStatement, RawSnapshot, SharesRecord, TickerInfo};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;

pub(crate) const REVENUE_SERIES: &str = "quarterlyTotalRevenue";
pub(crate) const NET_INCOME_SERIES: &str = "quarterlyNetIncome";

fn first_result<'a>(json: &'a Value, root: &str) -> Option<&'a Value> {
    json.get(root)
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
}

fn array<'a>(value: &'a Value, key: &str) -> Result<&'a Vec<Value>, FetchError> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| FetchError::Parse(format!("missing '{}' array", key)))
}

fn local_date(ts: i64, gmt_offset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts + gmt_offset, 0).map(|dt| dt.date_naive())
}

/// Yahoo wraps most numbers as `{"raw": n, "fmt": "..."}`.
fn raw_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => map.get("raw").and_then(|v| v.as_f64()),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Daily bars from a v8 chart response, in ascending date order.
///
/// Rows with any missing OHLC value are skipped; a missing volume counts as 0.
/// Timestamps are shifted by the exchange's GMT offset before taking the date.
pub(crate) fn chart_bars(json: &Value, symbol: &str) -> Result<Vec<PriceBar>, FetchError> {
    let chart = first_result(json, "chart")
        .filter(|v| !v.is_null())
        .ok_or_else(|| FetchError::NoData(format!("no chart data for {}", symbol)))?;

    let Some(timestamps) = chart.get("timestamp").and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };

    let gmt_offset = chart
        .get("meta")
        .and_then(|m| m.get("gmtoffset"))
        .and_then(|v| v.as_i64())
        .unwrap_or(0);

    let quotes = chart
        .get("indicators")
        .and_then(|v| v.get("quote"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| FetchError::Parse("missing quote block".to_string()))?;

    let opens = array(quotes, "open")?;
    let highs = array(quotes, "high")?;
    let lows = array(quotes, "low")?;
    let closes = array(quotes, "close")?;
    let volumes = array(quotes, "volume")?;

    let mut by_date = BTreeMap::new();
    for (i, ts) in timestamps.iter().enumerate() {
        let value = |col: &Vec<Value>| col.get(i).and_then(|v| v.as_f64());
        if let (Some(ts), Some(open), Some(high), Some(low), Some(close)) = (
            ts.as_i64(),
            value(opens),
            value(highs),
            value(lows),
            value(closes),
        ) {
            let Some(date) = local_date(ts, gmt_offset) else {
                continue;
            };
            by_date.insert(
                date,
                PriceBar {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume: value(volumes).unwrap_or(0.0),
                },
            );
        }
    }

    Ok(by_date.into_values().collect())
}

/// Flatten the quoteSummary modules into one key/value map.
pub(crate) fn summary_snapshot(json: &Value, symbol: &str) -> Result<RawSnapshot, FetchError> {
    let result = first_result(json, "quoteSummary")
        .and_then(|v| v.as_object())
        .ok_or_else(|| FetchError::NoData(format!("no fundamentals for {}", symbol)))?;

    let mut snapshot = RawSnapshot::new();
    for module in result.values() {
        if let Some(fields) = module.as_object() {
            for (key, value) in fields {
                snapshot.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
    }
    Ok(snapshot)
}

/// Quarterly revenue and net income from a fundamentals-timeseries response,
/// keyed by period end.
pub(crate) fn quarterly_statements(json: &Value) -> Result<Vec<QuarterlyStatement>, FetchError> {
    let results = json
        .get("timeseries")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| FetchError::Parse("missing timeseries result".to_string()))?;

    let mut quarters: BTreeMap<NaiveDate, QuarterlyStatement> = BTreeMap::new();
    for series in results {
        let Some(kind) = series
            .get("meta")
            .and_then(|m| m.get("type"))
            .and_then(|t| t.as_array())
            .and_then(|t| t.first())
            .and_then(|t| t.as_str())
        else {
            continue;
        };
        if kind != REVENUE_SERIES && kind != NET_INCOME_SERIES {
            continue;
        }
        let Some(points) = series.get(kind).and_then(|v| v.as_array()) else {
            continue;
        };

        for point in points {
            let Some(period_end) = point
                .get("asOfDate")
                .and_then(|v| v.as_str())
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            else {
                continue;
            };
            let value = point.get("reportedValue").and_then(raw_number);
            let entry = quarters.entry(period_end).or_insert(QuarterlyStatement {
                period_end,
                total_revenue: None,
                net_income: None,
            });
            if kind == REVENUE_SERIES {
                entry.total_revenue = value;
            } else {
                entry.net_income = value;
            }
        }
    }

    Ok(quarters.into_values().collect())
}

/// Shares-outstanding history: parallel `timestamp` and `shares_out` arrays.
pub(crate) fn shares_records(json: &Value) -> Result<Vec<SharesRecord>, FetchError> {
    let result = first_result(json, "timeseries")
        .ok_or_else(|| FetchError::NoData("no shares history".to_string()))?;

    let (Some(timestamps), Some(shares)) = (
        result.get("timestamp").and_then(|v| v.as_array()),
        result.get("shares_out").and_then(|v| v.as_array()),
    ) else {
        return Err(FetchError::NoData("no shares history".to_string()));
    };

    let mut records: Vec<SharesRecord> = timestamps
        .iter()
        .zip(shares)
        .filter_map(|(ts, count)| {
            let date = local_date(ts.as_i64()?, 0)?;
            let shares = count.as_f64().filter(|n| n.is_finite() && *n > 0.0)?;
            Some(SharesRecord { date, shares })
        })
        .collect();
    records.sort_by_key(|r| r.date);
    Ok(records)
}

pub(crate) fn search_quotes(json: &Value) -> Result<Vec<TickerInfo>, FetchError> {
    let quotes = array(json, "quotes")?;
    Ok(quotes
        .iter()
        .filter_map(|q| {
            let symbol = q.get("symbol")?.as_str()?.to_string();
            let name = q
                .get("shortname")
                .or_else(|| q.get("longname"))
                .and_then(|v| v.as_str())
                .unwrap_or(&symbol)
                .to_string();
            Some(TickerInfo { symbol, name })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_chart_bars_uses_exchange_offset_and_skips_gaps() {
        // 2024-01-02 14:30 UTC and 2024-01-03 14:30 UTC; offset -5h
        let json = json!({
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": -18000},
                    "timestamp": [1704205800, 1704292200, 1704378600],
                    "indicators": {"quote": [{
                        "open": [10.0, 11.0, null],
                        "high": [10.5, 11.5, 12.5],
                        "low": [9.5, 10.5, 11.5],
                        "close": [10.2, 11.2, 12.2],
                        "volume": [1000, null, 3000]
                    }]}
                }],
                "error": null
            }
        });

        let bars = chart_bars(&json, "AAPL").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date(2024, 1, 2));
        assert_eq!(bars[0].volume, 1000.0);
        assert_eq!(bars[1].date, date(2024, 1, 3));
        assert_eq!(bars[1].volume, 0.0);
        assert_eq!(bars[1].close, 11.2);
    }

    #[test]
    fn test_chart_without_result_is_no_data() {
        let json = json!({"chart": {"result": null, "error": {"code": "Not Found"}}});
        assert!(matches!(chart_bars(&json, "ZZZZ"), Err(FetchError::NoData(_))));
    }

    #[test]
    fn test_chart_without_timestamps_is_empty() {
        let json = json!({"chart": {"result": [{"meta": {}, "indicators": {"quote": [{}]}}]}});
        assert!(chart_bars(&json, "NEW").unwrap().is_empty());
    }

    #[test]
    fn test_summary_flattens_modules() {
        let json = json!({
            "quoteSummary": {
                "result": [{
                    "summaryDetail": {"trailingPE": {"raw": 28.5, "fmt": "28.50"}, "dividendYield": {"raw": 0.005}},
                    "defaultKeyStatistics": {"pegRatio": {"raw": 2.1}, "trailingEps": {"raw": 6.4}},
                    "financialData": {"returnOnEquity": {"raw": 1.47}, "profitMargins": {"raw": 0.25}}
                }],
                "error": null
            }
        });

        let snapshot = summary_snapshot(&json, "AAPL").unwrap();
        assert_eq!(snapshot.len(), 6);
        assert_eq!(snapshot["trailingPE"]["raw"], json!(28.5));
        assert_eq!(snapshot["profitMargins"]["raw"], json!(0.25));
    }

    #[test]
    fn test_quarterly_statements_outer_merge_series() {
        let json = json!({
            "timeseries": {
                "result": [
                    {
                        "meta": {"type": ["quarterlyTotalRevenue"]},
                        "quarterlyTotalRevenue": [
                            {"asOfDate": "2023-03-31", "reportedValue": {"raw": 1000.0}},
                            {"asOfDate": "2023-06-30", "reportedValue": {"raw": 1100.0}}
                        ]
                    },
                    {
                        "meta": {"type": ["quarterlyNetIncome"]},
                        "quarterlyNetIncome": [
                            null,
                            {"asOfDate": "2023-06-30", "reportedValue": {"raw": 180.0}},
                            {"asOfDate": "2023-09-30", "reportedValue": {"raw": 200.0}}
                        ]
                    }
                ]
            }
        });

        let statements = quarterly_statements(&json).unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0].period_end, date(2023, 3, 31));
        assert_eq!(statements[0].total_revenue, Some(1000.0));
        assert_eq!(statements[0].net_income, None);
        assert_eq!(statements[1].net_income, Some(180.0));
        assert_eq!(statements[2].total_revenue, None);
    }

    #[test]
    fn test_shares_records_sorted_and_filtered() {
        let json = json!({
            "timeseries": {
                "result": [{
                    "timestamp": [1688169600, 1680307200, 1696118400],
                    "shares_out": [105.0, 100.0, null]
                }]
            }
        });

        let records = shares_records(&json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, date(2023, 4, 1));
        assert_eq!(records[0].shares, 100.0);
        assert_eq!(records[1].date, date(2023, 7, 1));
    }

    #[test]
    fn test_search_quotes_name_fallbacks() {
        let json = json!({
            "quotes": [
                {"symbol": "AAPL", "shortname": "Apple Inc."},
                {"symbol": "APLE", "longname": "Apple Hospitality REIT"},
                {"symbol": "XYZ"},
                {"shortname": "No symbol"}
            ]
        });

        let found = search_quotes(&json).unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].name, "Apple Inc.");
        assert_eq!(found[1].name, "Apple Hospitality REIT");
        assert_eq!(found[2].name, "XYZ");
    }
}
