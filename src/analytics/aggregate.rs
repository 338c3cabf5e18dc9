//! Bucket-then-reduce aggregation of reading series.
//!
//! Three calendar partitions are supported: hour of day, day of month and
//! month of year. Bucketing happens in an explicit `FixedOffset` chosen by the
//! caller; pass `FixedOffset::east_opt(0)` for UTC buckets.

use std::collections::BTreeMap;

use chrono::{Datelike, FixedOffset, NaiveDate, Timelike};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::models::{month_name, Metric, MonthSummary, Reading};

// ---

/// Average value per hour of day. Always 24 slots; `None` marks an empty bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HourlyPattern([Option<f64>; 24]);

impl HourlyPattern {
    // ---
    pub fn from_values(values: [Option<f64>; 24]) -> Self {
        Self(values)
    }

    pub fn get(&self, hour: usize) -> Option<f64> {
        self.0.get(hour).copied().flatten()
    }

    /// `"00:00"` … `"23:00"`.
    pub fn label(hour: usize) -> String {
        format!("{hour:02}:00")
    }

    /// Hour with the highest value. Ties go to the earliest hour.
    pub fn peak(&self) -> Option<(usize, f64)> {
        // ---
        self.0
            .iter()
            .enumerate()
            .filter_map(|(h, v)| v.filter(|v| v.is_finite()).map(|v| (h, v)))
            .fold(None, |best, (h, v)| match best {
                Some((_, best_v)) if v <= best_v => best,
                _ => Some((h, v)),
            })
    }
}

impl Serialize for HourlyPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // ---
        let mut map = serializer.serialize_map(Some(24))?;
        for (hour, value) in self.0.iter().enumerate() {
            map.serialize_entry(&Self::label(hour), value)?;
        }
        map.end()
    }
}

/// Average of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct DailyPoint {
    // ---
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Ammonia and temperature readings covering one month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthSeries {
    // ---
    pub ammonia: Vec<Reading>,
    pub temperature: Vec<Reading>,
}

impl MonthSeries {
    pub fn get(&self, metric: Metric) -> &[Reading] {
        match metric {
            Metric::Ammonia => &self.ammonia,
            Metric::Temperature => &self.temperature,
        }
    }
}

/// What the annual aggregation should do for one month.
#[derive(Debug, Clone, PartialEq)]
pub enum MonthPlan {
    /// Not started yet; never fetched, always empty.
    Future,
    /// Fully elapsed and already in the cache.
    Cached(MonthSummary),
    /// Needs readings from the feed.
    Compute,
}

// ---

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Number of days in `month` of `year`; 0 for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    // ---
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.map(|n| (n - first).num_days() as u32).unwrap_or(0)
}

/// Bucket readings by hour of day and average each bucket (two decimals).
pub fn hourly_of_day(readings: &[Reading], offset: FixedOffset) -> HourlyPattern {
    // ---
    let mut buckets: [Vec<f64>; 24] = Default::default();
    for reading in readings {
        if let Some(v) = reading.valid_value() {
            let hour = reading.timestamp.with_timezone(&offset).hour() as usize;
            buckets[hour].push(v);
        }
    }

    let mut values = [None; 24];
    for (slot, bucket) in values.iter_mut().zip(buckets.iter()) {
        *slot = mean(bucket).map(round2);
    }
    HourlyPattern(values)
}

/// One averaged value per calendar day of the month, `None` for days without
/// data. The output length always equals the number of days in the month.
pub fn daily_of_month(
    readings: &[Reading],
    year: i32,
    month: u32,
    offset: FixedOffset,
) -> Vec<DailyPoint> {
    // ---
    let days = days_in_month(year, month);
    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); days as usize];

    for reading in readings {
        let Some(v) = reading.valid_value() else {
            continue;
        };
        let local = reading.timestamp.with_timezone(&offset);
        if local.year() == year && local.month() == month {
            buckets[(local.day() - 1) as usize].push(v);
        }
    }

    buckets
        .iter()
        .enumerate()
        .filter_map(|(i, bucket)| {
            NaiveDate::from_ymd_opt(year, month, i as u32 + 1).map(|date| DailyPoint {
                date,
                value: mean(bucket),
            })
        })
        .collect()
}

/// Average several hourly patterns slot by slot (branch roll-up).
pub fn combine_hourly(patterns: &[HourlyPattern]) -> HourlyPattern {
    // ---
    let mut values = [None; 24];
    for (hour, slot) in values.iter_mut().enumerate() {
        let present: Vec<f64> = patterns.iter().filter_map(|p| p.get(hour)).collect();
        *slot = mean(&present);
    }
    HourlyPattern(values)
}

/// Average several daily series date by date (branch roll-up).
///
/// Like [`daily_of_month`], the output has one entry per calendar day of
/// `month`, even when `series` is empty.
pub fn combine_daily(series: &[Vec<DailyPoint>], year: i32, month: u32) -> Vec<DailyPoint> {
    // ---
    let mut by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for point in series.iter().flatten() {
        if let Some(v) = point.value.filter(|v| v.is_finite()) {
            by_date.entry(point.date).or_default().push(v);
        }
    }
    (1..=days_in_month(year, month))
        .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .map(|date| DailyPoint {
            date,
            value: by_date.get(&date).and_then(|values| mean(values)),
        })
        .collect()
}

struct MinMaxAvg {
    min: f64,
    max: f64,
    avg: f64,
}

fn min_max_avg(readings: &[Reading]) -> Option<MinMaxAvg> {
    // ---
    let values: Vec<f64> = readings.iter().filter_map(Reading::valid_value).collect();
    let avg = mean(&values)?;
    Some(MinMaxAvg {
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        avg,
    })
}

fn cells(stats: Option<MinMaxAvg>) -> (String, String, String) {
    match stats {
        Some(s) => (
            format!("{:.2}", s.max),
            format!("{:.2}", s.min),
            format!("{:.2}", s.avg),
        ),
        None => (String::new(), String::new(), String::new()),
    }
}

/// Reduce one month of readings to the annual-table row.
pub fn summarize_month(month: u32, series: &MonthSeries) -> MonthSummary {
    // ---
    let (ammonia_max, ammonia_min, ammonia_avg) = cells(min_max_avg(&series.ammonia));
    let (temp_max, temp_min, temp_avg) = cells(min_max_avg(&series.temperature));
    MonthSummary {
        month: month_name(month).to_string(),
        ammonia_max,
        ammonia_min,
        ammonia_avg,
        temp_max,
        temp_min,
        temp_avg,
    }
}

/// Whether `month` of `year` has fully elapsed as of `today`.
pub fn is_completed_month(year: i32, month: u32, today: NaiveDate) -> bool {
    year < today.year() || (year == today.year() && month < today.month())
}

fn is_future_month(year: i32, month: u32, today: NaiveDate) -> bool {
    year > today.year() || (year == today.year() && month > today.month())
}

/// Decide per month whether to skip, reuse the cache or compute.
///
/// `cached` is indexed by `month - 1`; missing trailing entries count as
/// cache misses. Only fully elapsed months are served from the cache.
pub fn plan_annual(year: i32, today: NaiveDate, cached: &[Option<MonthSummary>]) -> Vec<MonthPlan> {
    // ---
    (1..=12u32)
        .map(|month| {
            if is_future_month(year, month, today) {
                return MonthPlan::Future;
            }
            let hit = cached.get(month as usize - 1).cloned().flatten();
            match hit {
                Some(summary) if is_completed_month(year, month, today) => MonthPlan::Cached(summary),
                _ => MonthPlan::Compute,
            }
        })
        .collect()
}

/// Assemble the 12-row annual summary.
///
/// Months planned for computation are reduced from `series` (a month absent
/// from the map has no data); future months are always empty.
pub fn aggregate_annual(
    year: i32,
    today: NaiveDate,
    cached: &[Option<MonthSummary>],
    series: &BTreeMap<u32, MonthSeries>,
) -> Vec<MonthSummary> {
    // ---
    let empty = MonthSeries::default();
    plan_annual(year, today, cached)
        .into_iter()
        .zip(1..=12u32)
        .map(|(plan, month)| match plan {
            MonthPlan::Future => MonthSummary::empty(month),
            MonthPlan::Cached(summary) => summary,
            MonthPlan::Compute => summarize_month(month, series.get(&month).unwrap_or(&empty)),
        })
        .collect()
}
