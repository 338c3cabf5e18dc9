//! Data models shared by the analytics core and the service layer.
//!
//! Everything here is plain data: readings fetched from the sensor feed,
//! alerts loaded from the alert store, per-house thresholds, and the derived
//! values the analytics functions hand back to callers. Derived values carry
//! no identity and are recomputed on every request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---

/// A single timestamped sensor sample.
///
/// `value` is `None` when the feed returned nothing parseable for the field.
/// Non-finite values are treated the same way by every analytics function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    // ---
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

impl Reading {
    // ---
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value: Some(value),
        }
    }

    /// The value, if it is usable in a calculation.
    pub fn valid_value(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

/// The two quantities every poultry house reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Ammonia,
    Temperature,
}

impl Metric {
    // ---
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Ammonia => "ammonia",
            Metric::Temperature => "temperature",
        }
    }
}

/// Qualitative direction of a regression slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    // ---
    /// Classify a slope against a symmetric dead band.
    pub fn from_slope(slope: f64, band: f64) -> Self {
        if slope > band {
            Trend::Increasing
        } else if slope < -band {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---

/// Kind of condition an alert was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Ammonia,
    Temperature,
    Both,
    Info,
}

impl AlertType {
    // ---
    /// Parse the stored type string. Anything unrecognised is informational.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "both" => AlertType::Both,
            s if s.contains("ammonia") && s.contains("temp") => AlertType::Both,
            s if s.contains("ammonia") => AlertType::Ammonia,
            s if s.contains("temp") => AlertType::Temperature,
            _ => AlertType::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Ammonia => "ammonia",
            AlertType::Temperature => "temperature",
            AlertType::Both => "both",
            AlertType::Info => "info",
        }
    }

    /// Metrics this alert concerns, ammonia first.
    pub fn metrics(&self) -> &'static [Metric] {
        match self {
            AlertType::Ammonia => &[Metric::Ammonia],
            AlertType::Temperature => &[Metric::Temperature],
            AlertType::Both => &[Metric::Ammonia, Metric::Temperature],
            AlertType::Info => &[],
        }
    }
}

/// A historical alert for one poultry house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    // ---
    pub id: Uuid,
    pub house_id: Uuid,
    pub branch_name: String,
    pub alert_type: AlertType,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_acknowledged: bool,
    pub actions_taken: Vec<String>,
}

impl Alert {
    // ---
    /// Whether the alert reports a high reading. Temperature alerts are
    /// "low" only when the message says nothing about "high".
    pub fn is_high(&self) -> bool {
        self.message.to_lowercase().contains("high")
    }

    /// Same house and same kind of condition.
    pub fn is_similar_to(&self, other: &Alert) -> bool {
        self.house_id == other.house_id
            && self.branch_name == other.branch_name
            && self.alert_type == other.alert_type
    }
}

// ---

/// Per-house alert thresholds. An absent field means no comparison is possible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    // ---
    pub ammonia_high: Option<f64>,
    pub temp_high: Option<f64>,
    pub temp_low: Option<f64>,
}

impl Thresholds {
    // ---
    /// Build thresholds from the loosely typed strings the document store keeps.
    pub fn parse(
        ammonia_high: Option<&str>,
        temp_high: Option<&str>,
        temp_low: Option<&str>,
    ) -> Self {
        Self {
            ammonia_high: parse_threshold(ammonia_high),
            temp_high: parse_threshold(temp_high),
            temp_low: parse_threshold(temp_low),
        }
    }
}

fn parse_threshold(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Descriptive statistics over one series.
///
/// All numeric fields are `None` exactly when `count == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSummary {
    // ---
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std_dev: Option<f64>,
    pub trend: Trend,
    pub count: usize,
}

impl StatisticsSummary {
    pub fn empty() -> Self {
        Self {
            mean: None,
            min: None,
            max: None,
            std_dev: None,
            trend: Trend::Stable,
            count: 0,
        }
    }
}

/// Forecast for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    // ---
    pub predicted_value: f64,
    pub trend: Trend,
}

/// One month of the annual summary table.
///
/// Values are pre-formatted to two decimals. An empty string means no valid
/// samples existed for that month, which is distinct from a measured zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    // ---
    pub month: String,
    pub ammonia_max: String,
    pub ammonia_min: String,
    pub ammonia_avg: String,
    pub temp_max: String,
    pub temp_min: String,
    pub temp_avg: String,
}

impl MonthSummary {
    // ---
    /// A month with no data at all.
    pub fn empty(month: u32) -> Self {
        Self {
            month: month_name(month).to_string(),
            ..Self::default()
        }
    }

    pub fn ammonia_avg_value(&self) -> Option<f64> {
        parse_cell(&self.ammonia_avg)
    }

    pub fn temp_avg_value(&self) -> Option<f64> {
        parse_cell(&self.temp_avg)
    }

    pub fn has_data(&self) -> bool {
        [
            &self.ammonia_max,
            &self.ammonia_min,
            &self.ammonia_avg,
            &self.temp_max,
            &self.temp_min,
            &self.temp_avg,
        ]
        .iter()
        .any(|cell| !cell.is_empty())
    }
}

fn parse_cell(cell: &str) -> Option<f64> {
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English month name for a 1-based month number; empty for out-of-range input.
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("")
}
