//! Statistics kernel: mean / min / max / population standard deviation and a
//! least-squares trend over `(x, value)` points.

use crate::models::{Reading, StatisticsSummary, Trend};

/// Slope band for index-based trends. Operates on "per sample" slope, not on
/// real hours, so it is unrelated to the forecaster's bands.
const TREND_BAND: f64 = 0.05;

// ---

/// Fitted line `value = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    // ---
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least-squares fit.
///
/// A single point yields a flat line through it. Returns `None` for an empty
/// input or when every `x` is identical (vertical data has no slope).
pub fn linear_regression(points: &[(f64, f64)]) -> Option<Line> {
    // ---
    match points {
        [] => None,
        [(_, y)] => Some(Line {
            slope: 0.0,
            intercept: *y,
        }),
        _ => {
            let n = points.len() as f64;
            let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
            let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

            // Centred sums; raw sums lose precision on epoch-hour x values.
            let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
                let dx = x - mean_x;
                (sxy + dx * (y - mean_y), sxx + dx * dx)
            });

            if sxx == 0.0 {
                return None;
            }

            let slope = sxy / sxx;
            Some(Line {
                slope,
                intercept: mean_y - slope * mean_x,
            })
        }
    }
}

/// Summarize clean `(index, value)` points. Callers filter non-finite values.
pub fn summarize(points: &[(f64, f64)]) -> StatisticsSummary {
    // ---
    let count = points.len();
    if count == 0 {
        return StatisticsSummary::empty();
    }

    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();

    if count == 1 {
        let single = values[0];
        return StatisticsSummary {
            mean: Some(single),
            min: Some(single),
            max: Some(single),
            std_dev: Some(0.0),
            trend: Trend::Stable,
            count,
        };
    }

    let n = count as f64;
    let mean = values.iter().sum::<f64>() / n;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let trend = linear_regression(points)
        .map(|line| Trend::from_slope(line.slope, TREND_BAND))
        .unwrap_or(Trend::Stable);

    StatisticsSummary {
        mean: Some(mean),
        min: Some(min),
        max: Some(max),
        std_dev: Some(variance.sqrt()),
        trend,
        count,
    }
}

/// Statistics over a reading series, indexed by position in the series.
///
/// Positions are assigned before invalid samples are dropped, so gaps keep
/// their place on the x axis.
pub fn stats_for_readings(readings: &[Reading]) -> StatisticsSummary {
    // ---
    let points: Vec<(f64, f64)> = readings
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.valid_value().map(|v| (i as f64, v)))
        .collect();
    summarize(&points)
}

/// Statistics over a plain value series (e.g. one value per day of a month).
pub fn stats_for_values(values: &[Option<f64>]) -> StatisticsSummary {
    // ---
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|v| v.is_finite()).map(|v| (i as f64, v)))
        .collect();
    summarize(&points)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_summarize_empty() {
        // ---
        let s = summarize(&[]);
        assert_eq!(s, StatisticsSummary::empty());
        assert_eq!(s.count, 0);
        assert!(s.mean.is_none() && s.std_dev.is_none());
    }

    #[test]
    fn test_summarize_single_point() {
        // ---
        let s = summarize(&[(0.0, 5.0)]);
        assert_eq!(s.mean, Some(5.0));
        assert_eq!(s.min, Some(5.0));
        assert_eq!(s.max, Some(5.0));
        assert_eq!(s.std_dev, Some(0.0));
        assert_eq!(s.trend, Trend::Stable);
        assert_eq!(s.count, 1);
    }

    #[test]
    fn test_summarize_increasing_series() {
        // ---
        let points = [(0.0, 1.0), (1.0, 2.0), (2.0, 3.0), (3.0, 4.0), (4.0, 5.0)];
        let s = summarize(&points);
        assert_eq!(s.mean, Some(3.0));
        assert_eq!(s.min, Some(1.0));
        assert_eq!(s.max, Some(5.0));
        assert_eq!(s.trend, Trend::Increasing);
        assert_eq!(s.count, 5);
        // Population standard deviation of 1..=5 is sqrt(2)
        assert!(approx(s.std_dev.unwrap(), 2f64.sqrt()));
    }

    #[test]
    fn test_summarize_small_slope_is_stable() {
        // ---
        let points = [(0.0, 10.0), (1.0, 10.04), (2.0, 10.08)];
        assert_eq!(summarize(&points).trend, Trend::Stable);

        let falling = [(0.0, 10.0), (1.0, 9.9), (2.0, 9.8)];
        assert_eq!(summarize(&falling).trend, Trend::Decreasing);
    }

    #[test]
    fn test_regression_degenerate_x() {
        // ---
        assert!(linear_regression(&[(1.0, 2.0), (1.0, 4.0)]).is_none());
        assert_eq!(summarize(&[(1.0, 2.0), (1.0, 4.0)]).trend, Trend::Stable);
    }

    #[test]
    fn test_regression_on_epoch_hours() {
        // ---
        let base = 480_000.0;
        let points: Vec<(f64, f64)> = (0..168).map(|i| (base + i as f64, 2.0 * i as f64 + 1.0)).collect();
        let line = linear_regression(&points).unwrap();
        assert!(approx(line.slope, 2.0));
        assert!(approx(line.at(base + 10.0), 21.0));
    }

    #[test]
    fn test_stats_for_readings_skips_invalid() {
        // ---
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let readings = vec![
            Reading::new(t0, 1.0),
            Reading {
                timestamp: t0 + Duration::hours(1),
                value: None,
            },
            Reading::new(t0 + Duration::hours(2), f64::NAN),
            Reading::new(t0 + Duration::hours(3), 3.0),
        ];
        let s = stats_for_readings(&readings);
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, Some(2.0));
    }

    #[test]
    fn test_stats_for_values_keeps_positions() {
        // ---
        // Slope over positions 0 and 10 is 0.1, above the band.
        let mut values = vec![None; 11];
        values[0] = Some(1.0);
        values[10] = Some(2.0);
        let s = stats_for_values(&values);
        assert_eq!(s.count, 2);
        assert_eq!(s.trend, Trend::Increasing);
    }
}
