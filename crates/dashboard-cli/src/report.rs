use analysis_core::stats::last_defined;
use analysis_orchestrator::TickerReport;
use fundamental_analysis::RatioAssessment;
use std::fmt::Write;

fn opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Plain-text summary of a report.
pub fn render_text(report: &TickerReport) -> String {
    let mut out = String::new();
    write_report(&mut out, report).ok();
    out
}

fn write_report(out: &mut String, report: &TickerReport) -> std::fmt::Result {
    writeln!(out, "{} as of {}", report.symbol, report.as_of)?;
    writeln!(out)?;

    writeln!(out, "Prices: {} daily bars", report.bars.len())?;
    if let (Some(first), Some(last)) = (report.bars.first(), report.bars.last()) {
        writeln!(out, "  {} to {}, last close {:.2}", first.date, last.date, last.close)?;
    }

    let ind = &report.indicators;
    writeln!(out, "Indicators (latest):")?;
    writeln!(out, "  MA      {}", opt(last_defined(&ind.ma), 2))?;
    writeln!(out, "  RSI     {}", opt(last_defined(&ind.rsi), 1))?;
    writeln!(out, "  MACD    {}", opt(last_defined(&ind.macd), 3))?;
    writeln!(out, "  Signal  {}", opt(last_defined(&ind.signal), 3))?;

    writeln!(out, "Fundamentals:")?;
    for (ratio, value) in report.fundamentals.iter() {
        let reference = ratio.reference();
        let shown = match value {
            Some(v) if reference.percent => format!("{:.2}%", v),
            other => opt(other, 2),
        };
        let mark = match report.fundamentals.assess(ratio) {
            RatioAssessment::Favorable => "+",
            RatioAssessment::Unfavorable => "-",
            RatioAssessment::Unknown => " ",
        };
        writeln!(out, "  {} {:<15} {:>10}   ({})", mark, ratio.label(), shown, reference.guide)?;
    }

    writeln!(out, "Earnings: {} quarterly reports", report.earnings.len())?;
    if let Some(event) = report.earnings.last() {
        writeln!(
            out,
            "  latest {}: EPS {:.2}, revenue {:.0}",
            event.report_date, event.eps, event.revenue
        )?;
    }

    match &report.forecast {
        Some(forecast) => {
            writeln!(out, "Forecast: {} days after {}", forecast.future().len(), forecast.last_observed)?;
            if let Some(end) = forecast.future().last() {
                writeln!(
                    out,
                    "  {}: {:.2} (range {:.2} to {:.2})",
                    end.date, end.estimate, end.lower, end.upper
                )?;
            }
            if let Some(change) = report.forecast_change() {
                writeln!(out, "  change vs last close: {:+.2}%", change)?;
            }
        }
        None => writeln!(out, "Forecast: unavailable")?,
    }

    if !report.degraded.is_empty() {
        writeln!(out, "Unavailable data:")?;
        for source in &report.degraded {
            writeln!(out, "  {}: {}", source.source, source.reason)?;
        }
    }
    Ok(())
}
