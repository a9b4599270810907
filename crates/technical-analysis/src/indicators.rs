//! Technical indicators over a close-price series.
//!
//! Every function returns a vector of the same length as its input, with
//! `None` at positions that do not have enough history yet.

/// Simple Moving Average over the trailing `period` values (current one included).
pub fn sma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period {
        return result;
    }

    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result[i] = Some(sum / period as f64);
    }
    result
}

/// Exponential Moving Average, seeded with the SMA of the first `period` values.
pub fn ema(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period {
        return result;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);

    let mut ema_val = data[..period].iter().sum::<f64>() / period as f64;
    result[period - 1] = Some(ema_val);

    for i in period..data.len() {
        ema_val = (data[i] - ema_val) * multiplier + ema_val;
        result[i] = Some(ema_val);
    }

    result
}

/// EMA over the defined tail of an optional series.
///
/// Leading `None`s are skipped; the first defined value starts the seed window.
/// A gap after the first defined value ends the computation.
fn ema_defined(series: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let start = match series.iter().position(Option::is_some) {
        Some(start) => start,
        None => return vec![None; series.len()],
    };
    let values: Vec<f64> = series[start..].iter().map_while(|v| *v).collect();

    let mut result = vec![None; start];
    result.extend(ema(&values, period));
    result.resize(series.len(), None);
    result
}

/// Relative Strength Index over the trailing `period` close-to-close deltas.
///
/// Average gain and average loss are simple means over the window. A window
/// without losses saturates at 100.
pub fn rsi(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period + 1 {
        return result;
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);

    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    // Delta j is the move into bar j + 1, so the window ending at bar i
    // covers deltas i - period ..= i - 1.
    for i in period..data.len() {
        let window = i - period..i;
        let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[window].iter().sum::<f64>() / period as f64;

        let value = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - (100.0 / (1.0 + rs))
        };
        result[i] = Some(value.clamp(0.0, 100.0));
    }

    result
}

/// MACD (Moving Average Convergence Divergence)
#[derive(Debug, Clone, PartialEq)]
pub struct MacdResult {
    pub macd_line: Vec<Option<f64>>,
    pub signal_line: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn macd(data: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> MacdResult {
    let empty = vec![None; data.len()];
    if fast_period == 0 || slow_period == 0 || signal_period == 0 || slow_period < fast_period {
        return MacdResult {
            macd_line: empty.clone(),
            signal_line: empty.clone(),
            histogram: empty,
        };
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);

    let macd_line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(fast, slow)| Some((*fast)? - (*slow)?))
        .collect();

    let signal_line = ema_defined(&macd_line, signal_period);

    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();

    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}
