//! Diagnostics over a house's alert history.
//!
//! `analyze_history` finds earlier alerts of the same kind in the trailing
//! recurrence window; `diagnose` turns that plus the alert itself into a short
//! narrative about likely causes.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use regex::Regex;
use serde::Serialize;

use crate::models::{Alert, AlertType, Metric};

pub const RECURRENCE_WINDOW_DAYS: i64 = 30;

/// How many of the latest similar alerts contribute their logged actions.
const ACTION_LOOKBACK: usize = 3;

const IMPROVED_AIRFLOW: &str = "Improved airflow";
const ACTIVATED_COOLING: &str = "Activated cooling system";
const ACTIVATED_HEATING: &str = "Activated heating system";

// ---

/// Recurrence of an alert within the trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAnalysis {
    // ---
    pub is_recurrent: bool,
    pub count: usize,
    pub last_occurrence: Option<DateTime<Utc>>,
    /// Actions logged against recent repeats; they did not stop the recurrence.
    pub ineffective_actions: Vec<String>,
}

/// Human-readable diagnosis for one alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    // ---
    pub title: String,
    pub insights: Vec<String>,
}

/// Look for earlier alerts of the same type at the same house within
/// `[t - 30 days, t)` of the current alert.
pub fn analyze_history(current: &Alert, history: &[Alert]) -> HistoryAnalysis {
    // ---
    let since = current.timestamp - Duration::days(RECURRENCE_WINDOW_DAYS);
    let mut similar: Vec<&Alert> = history
        .iter()
        .filter(|a| {
            a.is_similar_to(current) && a.timestamp < current.timestamp && a.timestamp >= since
        })
        .collect();
    similar.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut ineffective_actions: Vec<String> = Vec::new();
    for action in similar
        .iter()
        .take(ACTION_LOOKBACK)
        .flat_map(|a| a.actions_taken.iter())
    {
        if !ineffective_actions.contains(action) {
            ineffective_actions.push(action.clone());
        }
    }

    HistoryAnalysis {
        is_recurrent: !similar.is_empty(),
        count: similar.len(),
        last_occurrence: similar.first().map(|a| a.timestamp),
        ineffective_actions,
    }
}

/// First number appearing in an alert message, e.g. `"High ammonia: 27.5 ppm"`.
fn reported_value(message: &str) -> f64 {
    // ---
    static NUMBER: OnceLock<Option<Regex>> = OnceLock::new();
    NUMBER
        .get_or_init(|| Regex::new(r"(\d+\.?\d*)").ok())
        .as_ref()
        .and_then(|re| re.find(message))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn title_for(alert: &Alert) -> String {
    // ---
    let direction = if alert.is_high() { "High" } else { "Low" };
    match alert.alert_type {
        AlertType::Ammonia => "Ammonia Alert".to_string(),
        AlertType::Temperature => format!("{direction} Temperature Alert"),
        AlertType::Both => format!("Ammonia and {direction} Temperature Alert"),
        AlertType::Info => "Info Alert".to_string(),
    }
}

/// Explain an alert using its history. `offset` sets the local clock used for
/// time-of-day hints.
pub fn diagnose(alert: &Alert, history: &[Alert], offset: FixedOffset) -> Diagnosis {
    // ---
    let analysis = analyze_history(alert, history);
    let value = reported_value(&alert.message);
    let hour = alert.timestamp.with_timezone(&offset).hour();
    let tried = |action: &str| analysis.ineffective_actions.iter().any(|a| a == action);

    let mut insights = Vec::new();
    if analysis.is_recurrent {
        insights.push(format!(
            "This is a **repeated alert**. It happened {} time(s) in the past {RECURRENCE_WINDOW_DAYS} days.",
            analysis.count
        ));
    }

    for metric in alert.alert_type.metrics() {
        match metric {
            Metric::Ammonia => {
                insights.push(format!(
                    "High ammonia (**{value} PPM**) is often caused by animal waste or poor airflow."
                ));
                if hour >= 20 || hour <= 6 {
                    insights.push(
                        "Happened at night. Cool air and less fan activity can trap ammonia.".to_string(),
                    );
                }
                if tried(IMPROVED_AIRFLOW) {
                    insights.push("Just improving airflow didn't fix this before. The problem might be **animal waste** or **too many animals**.".to_string());
                }
            }
            Metric::Temperature if alert.is_high() => {
                insights.push(format!(
                    "High temperature (**{value}°C**) suggests a cooling problem or very hot weather outside."
                ));
                if (12..=16).contains(&hour) {
                    insights.push("Happened in the afternoon, the hottest time of day.".to_string());
                }
                if tried(ACTIVATED_COOLING) {
                    insights.push("Using the cooling system didn't prevent this alert before. The system may be **weak** or the airflow is poor.".to_string());
                }
            }
            Metric::Temperature => {
                insights.push(format!(
                    "Low temperature (**{value}°C**) points to a heater problem or cold drafts."
                ));
                if hour >= 22 || hour <= 5 {
                    insights.push("Happened overnight when it's naturally colder.".to_string());
                }
                if tried(ACTIVATED_HEATING) {
                    insights.push("Using the heater didn't prevent this alert before. It may need a **check-up or repair**.".to_string());
                }
            }
        }
    }

    if alert.alert_type.metrics().is_empty() {
        insights.push("General alert. Check all systems.".to_string());
    }

    Diagnosis {
        title: title_for(alert),
        insights,
    }
}
