//! Linear-trend forecasting over real time.
//!
//! Each reading's timestamp becomes "hours since the Unix epoch", a line is
//! fitted over a recent window, and the line is evaluated `horizon` hours past
//! the last valid sample.

use serde::Serialize;

use super::stats::linear_regression;
use crate::models::{Prediction, Reading, Trend};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

// ---

/// Supported forecast horizons and their fixed tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    /// 24 hours ahead from the last ~7 days.
    NextDay,
    /// 7 days ahead from the last ~30 days.
    NextWeek,
}

impl Horizon {
    // ---
    pub fn hours(&self) -> f64 {
        match self {
            Horizon::NextDay => 24.0,
            Horizon::NextWeek => 168.0,
        }
    }

    /// Minimum number of valid samples before a forecast is offered.
    pub fn min_samples(&self) -> usize {
        match self {
            Horizon::NextDay => 10,
            Horizon::NextWeek => 20,
        }
    }

    /// Only this many of the most recent samples feed the regression.
    pub fn window(&self) -> usize {
        match self {
            Horizon::NextDay => 168,
            Horizon::NextWeek => 720,
        }
    }

    /// Dead band on `slope * hours()`.
    pub fn trend_band(&self) -> f64 {
        match self {
            Horizon::NextDay => 0.5,
            Horizon::NextWeek => 1.0,
        }
    }
}

/// Forecasts for both metrics of one house.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ForecastPair {
    // ---
    pub ammonia: Option<Prediction>,
    pub temperature: Option<Prediction>,
}

fn hours_since_epoch(reading: &Reading) -> f64 {
    reading.timestamp.timestamp_millis() as f64 / MILLIS_PER_HOUR
}

/// Project the series `horizon` ahead.
///
/// Returns `None` when there are too few valid samples, or when every sample
/// shares one timestamp. The projected value is clamped at zero for every
/// metric, temperature included.
pub fn predict_ahead(series: &[Reading], horizon: Horizon) -> Option<Prediction> {
    // ---
    let min_samples = horizon.min_samples();
    if series.len() < min_samples {
        return None;
    }

    let start = series.len().saturating_sub(horizon.window());
    let points: Vec<(f64, f64)> = series[start..]
        .iter()
        .filter_map(|r| r.valid_value().map(|v| (hours_since_epoch(r), v)))
        .collect();

    if points.len() < min_samples {
        tracing::trace!(
            valid = points.len(),
            required = min_samples,
            "not enough valid samples to forecast"
        );
        return None;
    }

    let line = linear_regression(&points)?;
    let last_hour = points.last().map(|(t, _)| *t)?;
    let predicted_value = line.at(last_hour + horizon.hours()).max(0.0);
    let trend = Trend::from_slope(line.slope * horizon.hours(), horizon.trend_band());

    Some(Prediction {
        predicted_value,
        trend,
    })
}
