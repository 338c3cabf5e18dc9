//! Numbers and narrative fragments for monthly and annual reports.
//!
//! Averages come from daily averages and peaks from the hourly-of-day
//! pattern, so uneven sampling density does not skew either. Text is returned
//! as styled segments and left for the renderer to lay out.

use serde::Serialize;

use super::aggregate::{DailyPoint, HourlyPattern};
use super::insights::{complete_months, max_month};
use super::stats::stats_for_values;
use super::units::TemperatureUnit;
use crate::models::{Metric, MonthSummary, StatisticsSummary, Thresholds, Trend};

const NOT_AVAILABLE: &str = "N/A";

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStyle {
    Bold,
    Normal,
}

/// A run of report text with a single style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSegment {
    // ---
    pub text: String,
    pub style: SegmentStyle,
}

impl TextSegment {
    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: SegmentStyle::Bold,
        }
    }

    pub fn normal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: SegmentStyle::Normal,
        }
    }
}

/// Average and peak of one metric over a month.
///
/// `avg` and `peak` stay in the native unit; the display strings are in the
/// requested unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReportSummary {
    // ---
    pub avg: Option<f64>,
    pub peak: Option<f64>,
    pub avg_display: String,
    pub peak_display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReportSummary {
    // ---
    pub ammonia: MetricReportSummary,
    pub temperature: MetricReportSummary,
}

fn display(value: Option<f64>, metric: Metric, unit: TemperatureUnit) -> String {
    match value {
        Some(v) => format!("{:.2}{}", unit.convert(metric, v), unit.suffix(metric)),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Line-chart statistics for a daily-of-month series.
///
/// Days without data are dropped and the remaining values re-indexed from 0
/// before the trend is fitted, so gaps do not flatten the slope.
pub fn daily_stats(daily: &[DailyPoint]) -> StatisticsSummary {
    // ---
    let present: Vec<Option<f64>> = daily
        .iter()
        .filter(|d| d.value.is_some_and(f64::is_finite))
        .map(|d| d.value)
        .collect();
    stats_for_values(&present)
}

/// Monthly average (mean of daily averages) and peak (highest hourly bucket).
pub fn metric_report_summary(
    daily: &[DailyPoint],
    hourly: &HourlyPattern,
    metric: Metric,
    unit: TemperatureUnit,
) -> MetricReportSummary {
    // ---
    let values: Vec<f64> = daily
        .iter()
        .filter_map(|d| d.value.filter(|v| v.is_finite()))
        .collect();
    let avg = if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    };
    let peak = hourly.peak().map(|(_, v)| v);

    MetricReportSummary {
        avg,
        peak,
        avg_display: display(avg, metric, unit),
        peak_display: display(peak, metric, unit),
    }
}

fn trend_phrase(trend: Trend) -> &'static str {
    match trend {
        Trend::Increasing => "an increasing",
        Trend::Decreasing => "a decreasing",
        Trend::Stable => "a stable",
    }
}

/// Narrative under a month's daily line chart.
pub fn line_chart_analysis(
    stats: &StatisticsSummary,
    metric: Metric,
    unit: TemperatureUnit,
) -> Vec<TextSegment> {
    // ---
    let heading = TextSegment::bold("Trend Analysis:\n");
    let (Some(mean), Some(min), Some(max)) = (stats.mean, stats.min, stats.max) else {
        return vec![heading, TextSegment::normal("Not enough data for a detailed trend analysis.")];
    };
    if stats.count < 2 {
        return vec![heading, TextSegment::normal("Not enough data for a detailed trend analysis.")];
    }

    let suffix = unit.suffix(metric);
    let show = |v: f64| format!("{:.2}{suffix}", unit.convert(metric, v));
    vec![
        heading,
        TextSegment::normal(format!(
            "This month showed {} trend for {}. ",
            trend_phrase(stats.trend),
            metric.as_str()
        )),
        TextSegment::bold(format!("The average was {}", show(mean))),
        TextSegment::normal(format!(
            ", with a recorded high of {} and a low of {}.",
            show(max),
            show(min)
        )),
    ]
}

/// Narrative under a month's hour-of-day bar chart.
pub fn bar_chart_analysis(
    hourly: &HourlyPattern,
    metric: Metric,
    unit: TemperatureUnit,
) -> Vec<TextSegment> {
    // ---
    let heading = TextSegment::bold("Hourly Pattern:\n");
    let Some((hour, value)) = hourly.peak() else {
        return vec![
            heading,
            TextSegment::normal("No hourly data was available to identify daily patterns."),
        ];
    };
    vec![
        heading,
        TextSegment::normal("Levels typically peaked around "),
        TextSegment::bold(format!(
            "{} at approximately {:.2}{}",
            HourlyPattern::label(hour),
            unit.convert(metric, value),
            unit.suffix(metric)
        )),
        TextSegment::normal(", suggesting a consistent daily cycle."),
    ]
}

/// Opening paragraph of a monthly report.
///
/// The safety note compares monthly averages against the house thresholds
/// (strictly above or below); branch reports pass no thresholds.
pub fn overall_summary(
    summary: &MonthlyReportSummary,
    thresholds: Option<&Thresholds>,
    ammonia_stats: &StatisticsSummary,
    temp_stats: &StatisticsSummary,
) -> Vec<TextSegment> {
    // ---
    let mut issues: Vec<&str> = Vec::new();
    if let Some(t) = thresholds {
        let ammonia = summary.ammonia.avg;
        let temp = summary.temperature.avg;
        if matches!((ammonia, t.ammonia_high), (Some(v), Some(limit)) if v > limit) {
            issues.push("high ammonia levels");
        }
        if matches!((temp, t.temp_high), (Some(v), Some(limit)) if v > limit) {
            issues.push("high temperatures");
        }
        if matches!((temp, t.temp_low), (Some(v), Some(limit)) if v < limit) {
            issues.push("low temperatures");
        }
    }

    let safety = if issues.is_empty() {
        "Overall, conditions were stable and within safe limits this month.".to_string()
    } else {
        format!(
            "Environmental metrics were outside recommended thresholds, specifically {}, suggesting a need for closer monitoring.",
            issues.join(" and ")
        )
    };

    let trend_of = |s: &StatisticsSummary| if s.count > 1 { s.trend } else { Trend::Stable };

    vec![
        TextSegment::normal("This report summarizes the environmental conditions for the month. "),
        TextSegment::normal(format!(
            "Ammonia levels showed {} trend, while temperature showed {} trend.\n\n",
            trend_phrase(trend_of(ammonia_stats)),
            trend_phrase(trend_of(temp_stats))
        )),
        TextSegment::bold("Safety Note: "),
        TextSegment::normal(safety),
    ]
}

/// Months whose average ammonia / temperature exceeded the high thresholds.
fn breach_counts(months: &[(&MonthSummary, f64, f64)], thresholds: &Thresholds) -> (usize, usize) {
    // ---
    let ammonia = thresholds
        .ammonia_high
        .map_or(0, |limit| months.iter().filter(|m| m.1 > limit).count());
    let temp = thresholds
        .temp_high
        .map_or(0, |limit| months.iter().filter(|m| m.2 > limit).count());
    (ammonia, temp)
}

/// Overview paragraph above the annual table.
pub fn annual_table_analysis(
    annual: &[MonthSummary],
    thresholds: Option<&Thresholds>,
    unit: TemperatureUnit,
) -> Vec<TextSegment> {
    // ---
    let months = complete_months(annual);
    let (Some(warmest), Some(highest_ammonia)) = (
        max_month(&months, |(_, _, temp)| *temp),
        max_month(&months, |(_, ammonia, _)| *ammonia),
    ) else {
        return sparse_year();
    };
    if months.len() < 2 {
        return sparse_year();
    }

    let several_breaches = thresholds
        .map(|t| breach_counts(&months, t))
        .is_some_and(|(ammonia, temp)| ammonia > 1 || temp > 1);
    let safety = if several_breaches {
        "Several months experienced average conditions that exceeded safety thresholds, particularly during warmer periods."
    } else {
        "Throughout the year, the monthly average conditions remained largely within safe operational thresholds."
    };

    vec![
        TextSegment::bold("Yearly Patterns:\n"),
        TextSegment::normal(format!(
            "The warmest month was {} ({}{}), while ammonia levels were highest in {} ({} ppm).\n\n",
            warmest.month,
            temperature_cell(&warmest.temp_avg, unit),
            unit.symbol(),
            highest_ammonia.month,
            highest_ammonia.ammonia_avg
        )),
        TextSegment::bold("Overall Safety: "),
        TextSegment::normal(safety),
    ]
}

fn sparse_year() -> Vec<TextSegment> {
    vec![
        TextSegment::normal("This table summarizes available monthly data for the year. "),
        TextSegment::bold("More data is needed for a full annual trend analysis."),
    ]
}

/// A stored Celsius cell shown in `unit`: unchanged for Celsius, one decimal
/// for Fahrenheit, `"N/A"` when empty.
fn temperature_cell(cell: &str, unit: TemperatureUnit) -> String {
    // ---
    if cell.is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    match unit {
        TemperatureUnit::Celsius => cell.to_string(),
        TemperatureUnit::Fahrenheit => match cell.parse::<f64>() {
            Ok(v) => format!("{:.1}", unit.from_celsius(v)),
            Err(_) => NOT_AVAILABLE.to_string(),
        },
    }
}

fn ammonia_cell(cell: &str) -> String {
    if cell.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        cell.to_string()
    }
}

/// Display rows for the annual table:
/// month, ammonia high/low/avg, temperature high/low/avg.
pub fn annual_table_rows(annual: &[MonthSummary], unit: TemperatureUnit) -> Vec<[String; 7]> {
    // ---
    annual
        .iter()
        .map(|row| {
            [
                row.month.clone(),
                ammonia_cell(&row.ammonia_max),
                ammonia_cell(&row.ammonia_min),
                ammonia_cell(&row.ammonia_avg),
                temperature_cell(&row.temp_max, unit),
                temperature_cell(&row.temp_min, unit),
                temperature_cell(&row.temp_avg, unit),
            ]
        })
        .collect()
}

/// Label/value rows describing a house's alert thresholds. Empty for branch
/// reports, which have no single set of thresholds.
pub fn threshold_display(thresholds: Option<&Thresholds>, unit: TemperatureUnit) -> Vec<[String; 2]> {
    // ---
    let Some(t) = thresholds else {
        return Vec::new();
    };
    let temp = |v: Option<f64>| match v {
        Some(c) => format!("{:.1} {}", unit.from_celsius(c), unit.symbol()),
        None => NOT_AVAILABLE.to_string(),
    };
    let ammonia = match t.ammonia_high {
        Some(v) => format!("{v} ppm"),
        None => NOT_AVAILABLE.to_string(),
    };
    vec![
        ["High Temperature".to_string(), format!("High (>) {}", temp(t.temp_high))],
        ["Low Temperature".to_string(), format!("Low (<) {}", temp(t.temp_low))],
        ["High Ammonia".to_string(), format!("High (>) {ammonia}")],
    ]
}
