use analysis_core::RawSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod earnings;

pub use earnings::*;

/// The eight ratios shown on the fundamentals panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FundamentalRatio {
    PeRatio,
    ForwardPe,
    PegRatio,
    Eps,
    DividendYield,
    Roe,
    DebtToEquity,
    ProfitMargins,
}

/// Reference band used to judge a ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioReference {
    pub description: &'static str,
    pub guide: &'static str,
    pub min: f64,
    /// `None` means "higher is better" above `min`.
    pub max: Option<f64>,
    pub percent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatioAssessment {
    Favorable,
    Unfavorable,
    Unknown,
}

impl FundamentalRatio {
    pub const ALL: [FundamentalRatio; 8] = [
        FundamentalRatio::PeRatio,
        FundamentalRatio::ForwardPe,
        FundamentalRatio::PegRatio,
        FundamentalRatio::Eps,
        FundamentalRatio::DividendYield,
        FundamentalRatio::Roe,
        FundamentalRatio::DebtToEquity,
        FundamentalRatio::ProfitMargins,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FundamentalRatio::PeRatio => "P/E Ratio",
            FundamentalRatio::ForwardPe => "Forward P/E",
            FundamentalRatio::PegRatio => "PEG Ratio",
            FundamentalRatio::Eps => "EPS",
            FundamentalRatio::DividendYield => "Dividend Yield",
            FundamentalRatio::Roe => "ROE",
            FundamentalRatio::DebtToEquity => "Debt to Equity",
            FundamentalRatio::ProfitMargins => "Profit Margins",
        }
    }

    /// Key of the ratio in the provider snapshot
    pub fn provider_key(&self) -> &'static str {
        match self {
            FundamentalRatio::PeRatio => "trailingPE",
            FundamentalRatio::ForwardPe => "forwardPE",
            FundamentalRatio::PegRatio => "pegRatio",
            FundamentalRatio::Eps => "trailingEps",
            FundamentalRatio::DividendYield => "dividendYield",
            FundamentalRatio::Roe => "returnOnEquity",
            FundamentalRatio::DebtToEquity => "debtToEquity",
            FundamentalRatio::ProfitMargins => "profitMargins",
        }
    }

    pub fn reference(&self) -> RatioReference {
        match self {
            FundamentalRatio::PeRatio => RatioReference {
                description: "Price to trailing earnings. Lower values suggest a cheaper stock.",
                guide: "10-20 average, <10 undervalued, >25 overvalued",
                min: 10.0,
                max: Some(20.0),
                percent: false,
            },
            FundamentalRatio::ForwardPe => RatioReference {
                description: "Price to expected (forward) earnings.",
                guide: "Same as P/E",
                min: 10.0,
                max: Some(20.0),
                percent: false,
            },
            FundamentalRatio::PegRatio => RatioReference {
                description: "P/E divided by earnings growth. Close to 1 is a balanced valuation.",
                guide: "1 fair, <1 undervalued, >1.5 overvalued",
                min: 0.0,
                max: Some(1.5),
                percent: false,
            },
            FundamentalRatio::Eps => RatioReference {
                description: "Net income per share.",
                guide: "Higher is better",
                min: 0.0,
                max: None,
                percent: false,
            },
            FundamentalRatio::DividendYield => RatioReference {
                description: "Dividend paid relative to the share price.",
                guide: "2-5% normal, >5% high",
                min: 2.0,
                max: Some(5.0),
                percent: true,
            },
            FundamentalRatio::Roe => RatioReference {
                description: "Return on equity: profitability of shareholders' capital.",
                guide: "15-20% is good",
                min: 15.0,
                max: Some(20.0),
                percent: true,
            },
            FundamentalRatio::DebtToEquity => RatioReference {
                description: "Debt relative to equity. Above 2 is risky.",
                guide: "<1 great, 1-2 acceptable, >2 risky",
                min: 0.0,
                max: Some(2.0),
                percent: false,
            },
            FundamentalRatio::ProfitMargins => RatioReference {
                description: "Net profit as a share of revenue.",
                guide: "10-20% good, >20% excellent",
                min: 10.0,
                max: Some(20.0),
                percent: true,
            },
        }
    }
}

/// Fixed set of fundamentals ratios, each independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsSnapshot {
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub roe: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub profit_margins: Option<f64>,
}

impl FundamentalsSnapshot {
    pub fn get(&self, ratio: FundamentalRatio) -> Option<f64> {
        match ratio {
            FundamentalRatio::PeRatio => self.pe_ratio,
            FundamentalRatio::ForwardPe => self.forward_pe,
            FundamentalRatio::PegRatio => self.peg_ratio,
            FundamentalRatio::Eps => self.eps,
            FundamentalRatio::DividendYield => self.dividend_yield,
            FundamentalRatio::Roe => self.roe,
            FundamentalRatio::DebtToEquity => self.debt_to_equity,
            FundamentalRatio::ProfitMargins => self.profit_margins,
        }
    }

    fn slot(&mut self, ratio: FundamentalRatio) -> &mut Option<f64> {
        match ratio {
            FundamentalRatio::PeRatio => &mut self.pe_ratio,
            FundamentalRatio::ForwardPe => &mut self.forward_pe,
            FundamentalRatio::PegRatio => &mut self.peg_ratio,
            FundamentalRatio::Eps => &mut self.eps,
            FundamentalRatio::DividendYield => &mut self.dividend_yield,
            FundamentalRatio::Roe => &mut self.roe,
            FundamentalRatio::DebtToEquity => &mut self.debt_to_equity,
            FundamentalRatio::ProfitMargins => &mut self.profit_margins,
        }
    }

    /// (ratio, value) pairs in display order
    pub fn iter(&self) -> impl Iterator<Item = (FundamentalRatio, Option<f64>)> + '_ {
        FundamentalRatio::ALL.into_iter().map(move |r| (r, self.get(r)))
    }

    /// Judge a ratio against its reference band. Missing values are `Unknown`.
    pub fn assess(&self, ratio: FundamentalRatio) -> RatioAssessment {
        let Some(value) = self.get(ratio) else {
            return RatioAssessment::Unknown;
        };
        let reference = ratio.reference();
        let in_band = match reference.max {
            Some(max) => value >= reference.min && value <= max,
            None => value >= reference.min,
        };
        if in_band {
            RatioAssessment::Favorable
        } else {
            RatioAssessment::Unfavorable
        }
    }
}

/// Extract a finite number from a provider value.
///
/// Accepts plain numbers, numeric strings and `{"raw": n, "fmt": "..."}` wrappers.
fn numeric_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Object(map) => map.get("raw").and_then(numeric_value),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Map a raw provider snapshot onto the eight named ratios.
pub fn map_fundamentals(raw: &RawSnapshot) -> FundamentalsSnapshot {
    let mut snapshot = FundamentalsSnapshot::default();
    for ratio in FundamentalRatio::ALL {
        *snapshot.slot(ratio) = raw.get(ratio.provider_key()).and_then(numeric_value);
    }
    snapshot
}
