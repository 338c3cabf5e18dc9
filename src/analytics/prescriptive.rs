//! Ranked corrective actions for an alert.
//!
//! Urgent actions come from a worsening forecast, defaults from the alert
//! kind and direction, and long-term actions from recurrence. The list is
//! de-duplicated by text (first occurrence wins) and stably ordered by
//! priority.

use serde::Serialize;

use super::diagnostic::HistoryAnalysis;
use super::forecast::ForecastPair;
use crate::models::{Alert, Metric, Trend};

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    High,
    Medium,
    Low,
    LongTerm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    // ---
    pub text: String,
    pub priority: Priority,
}

impl Recommendation {
    pub fn new(text: impl Into<String>, priority: Priority) -> Self {
        Self {
            text: text.into(),
            priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prescription {
    // ---
    pub title: String,
    pub recommendations: Vec<String>,
}

/// Recommend actions for `alert`.
///
/// `forecasts` is `None` when the house has no sensor channel configured;
/// a missing alert or channel yields a single explanatory entry.
pub fn recommend(
    alert: Option<&Alert>,
    forecasts: Option<&ForecastPair>,
    history: &HistoryAnalysis,
) -> Prescription {
    // ---
    let (Some(alert), Some(forecasts)) = (alert, forecasts) else {
        return Prescription {
            title: "Recommendation Error".to_string(),
            recommendations: vec!["Missing data for analysis.".to_string()],
        };
    };

    let metrics = alert.alert_type.metrics();
    if metrics.is_empty() {
        return Prescription {
            title: "Recommended Actions".to_string(),
            recommendations: vec!["General alert. Check all systems.".to_string()],
        };
    }

    let is_high = alert.is_high();
    let mut recs = Vec::new();

    for metric in metrics {
        recs.extend(urgent_actions(*metric, forecasts, is_high));
    }
    for metric in metrics {
        recs.extend(default_actions(*metric, is_high));
    }
    if history.is_recurrent {
        for metric in metrics {
            recs.push(long_term_action(*metric));
        }
    }

    Prescription {
        title: "Recommended Actions".to_string(),
        recommendations: rank(recs).into_iter().map(|r| r.text).collect(),
    }
}

fn urgent_actions(metric: Metric, forecasts: &ForecastPair, is_high: bool) -> Vec<Recommendation> {
    // ---
    match metric {
        Metric::Ammonia => match forecasts.ammonia.map(|p| p.trend) {
            Some(Trend::Increasing) => vec![
                Recommendation::new("Improve airflow immediately.", Priority::High),
                Recommendation::new("Check and clean animal waste.", Priority::High),
            ],
            _ => Vec::new(),
        },
        Metric::Temperature => match (forecasts.temperature.map(|p| p.trend), is_high) {
            (Some(Trend::Increasing), true) => vec![
                Recommendation::new("Activate cooling systems now.", Priority::High),
                Recommendation::new("Ensure water sources are full and accessible.", Priority::High),
            ],
            (Some(Trend::Decreasing), false) => vec![
                Recommendation::new("Activate heating systems.", Priority::High),
                Recommendation::new("Check for and seal any drafts.", Priority::High),
            ],
            _ => Vec::new(),
        },
    }
}

fn default_actions(metric: Metric, is_high: bool) -> Vec<Recommendation> {
    // ---
    match (metric, is_high) {
        (Metric::Ammonia, _) => vec![
            Recommendation::new("Clean animal waste.", Priority::Medium),
            Recommendation::new("Check feed and water quality.", Priority::Low),
        ],
        (Metric::Temperature, true) => vec![
            Recommendation::new("Improve airflow.", Priority::Medium),
            Recommendation::new("Increase water supply.", Priority::Medium),
        ],
        (Metric::Temperature, false) => {
            vec![Recommendation::new("Activate heating system.", Priority::Medium)]
        }
    }
}

fn long_term_action(metric: Metric) -> Recommendation {
    match metric {
        Metric::Ammonia => Recommendation::new(
            "Review and improve animal waste management schedule.",
            Priority::LongTerm,
        ),
        Metric::Temperature => Recommendation::new(
            "Schedule climate control system maintenance.",
            Priority::LongTerm,
        ),
    }
}

/// Drop repeated texts (first one wins) and stable-sort by priority.
fn rank(recs: Vec<Recommendation>) -> Vec<Recommendation> {
    // ---
    let mut unique: Vec<Recommendation> = Vec::with_capacity(recs.len());
    for rec in recs {
        if !unique.iter().any(|u| u.text == rec.text) {
            unique.push(rec);
        }
    }
    unique.sort_by_key(|r| r.priority);
    unique
}
