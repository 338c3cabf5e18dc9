//! Sensor feed client (ThingSpeak channel API).
//!
//! Each poultry house owns one channel with an ammonia field and a temperature
//! field. The client pulls one field at a time and hands back plain
//! [`Reading`]s; nothing here interprets the values.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use pems_sensorflow::analytics::days_in_month;
use pems_sensorflow::{Metric, Reading};
use serde::Deserialize;
use serde_json::Value;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("feed response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no calendar month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
}

/// Where a house's readings live in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    // ---
    pub channel_id: String,
    pub read_key: String,
    pub ammonia_field: u8,
    pub temp_field: u8,
}

impl Channel {
    pub fn field(&self, metric: Metric) -> u8 {
        match metric {
            Metric::Ammonia => self.ammonia_field,
            Metric::Temperature => self.temp_field,
        }
    }
}

/// Time span of a feed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// The trailing `n` days up to now.
    Days(u32),
    /// An explicit UTC range, both ends inclusive.
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A window plus the server-side averaging interval, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedQuery {
    // ---
    pub window: Window,
    pub average_minutes: Option<u32>,
}

impl FeedQuery {
    /// Last 24 hours at 10-minute averages.
    pub fn last_day() -> Self {
        Self {
            window: Window::Days(1),
            average_minutes: Some(10),
        }
    }

    /// Last 7 days at hourly averages.
    pub fn last_week() -> Self {
        Self {
            window: Window::Days(7),
            average_minutes: Some(60),
        }
    }

    /// Last 30 days at hourly averages.
    pub fn last_month() -> Self {
        Self {
            window: Window::Days(30),
            average_minutes: Some(60),
        }
    }

    /// One calendar month, as seen from `offset`, at hourly averages.
    pub fn calendar_month(year: i32, month: u32, offset: FixedOffset) -> Result<Self, FeedError> {
        // ---
        let invalid = || FeedError::InvalidMonth { year, month };
        let days = days_in_month(year, month);
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let last = NaiveDate::from_ymd_opt(year, month, days).ok_or_else(invalid)?;
        let start = local_to_utc(first.and_hms_opt(0, 0, 0), offset).ok_or_else(invalid)?;
        let end = local_to_utc(last.and_hms_opt(23, 59, 59), offset).ok_or_else(invalid)?;
        Ok(Self {
            window: Window::Range { start, end },
            average_minutes: Some(60),
        })
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        // ---
        let mut params = Vec::with_capacity(3);
        match self.window {
            Window::Days(days) => params.push(("days", days.to_string())),
            Window::Range { start, end } => {
                params.push(("start", start.format(TIME_FORMAT).to_string()));
                params.push(("end", end.format(TIME_FORMAT).to_string()));
            }
        }
        if let Some(minutes) = self.average_minutes {
            params.push(("average", minutes.to_string()));
        }
        params
    }
}

fn local_to_utc(local: Option<NaiveDateTime>, offset: FixedOffset) -> Option<DateTime<Utc>> {
    local
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
}

/// HTTP client for the sensor feed. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FeedClient {
    // ---
    http: reqwest::Client,
    base_url: String,
}

impl FeedClient {
    // ---
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch one metric of `channel` over `query`.
    ///
    /// An empty channel is reported by ThingSpeak as `400` with body `"0"`;
    /// that is an empty series, not an error.
    pub async fn fetch(
        &self,
        channel: &Channel,
        metric: Metric,
        query: &FeedQuery,
    ) -> Result<Vec<Reading>, FeedError> {
        // ---
        let field = channel.field(metric);
        let url = format!(
            "{}/channels/{}/fields/{}.json",
            self.base_url, channel.channel_id, field
        );
        tracing::debug!(%url, ?query, metric = metric.as_str(), "fetching feed");

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", channel.read_key.as_str())])
            .query(&query.params())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == reqwest::StatusCode::BAD_REQUEST && body.trim() == "0" {
            tracing::debug!(%url, "feed has no data for the window");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(FeedError::Status { status, body });
        }

        let readings = parse_feeds(&body, field)?;
        tracing::debug!(%url, count = readings.len(), "feed fetched");
        Ok(readings)
    }
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    feeds: Vec<serde_json::Map<String, Value>>,
}

/// Decode a channel-field response body into readings.
///
/// Entries with an unreadable `created_at` are dropped; unreadable values
/// keep their timestamp with `value: None`.
pub fn parse_feeds(body: &str, field: u8) -> Result<Vec<Reading>, FeedError> {
    // ---
    let response: FeedResponse = serde_json::from_str(body)?;
    let key = format!("field{field}");

    let mut readings = Vec::with_capacity(response.feeds.len());
    for entry in &response.feeds {
        let Some(timestamp) = entry
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        else {
            tracing::trace!(?entry, "dropping feed entry without a valid timestamp");
            continue;
        };
        readings.push(Reading {
            timestamp: timestamp.with_timezone(&Utc),
            value: entry.get(&key).and_then(field_value),
        });
    }
    Ok(readings)
}

fn field_value(value: &Value) -> Option<f64> {
    // ---
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_parse_feeds() {
        // ---
        let body = r#"{
            "channel": {"id": 42},
            "feeds": [
                {"created_at": "2025-08-01T10:00:00Z", "entry_id": 1, "field2": "24.5"},
                {"created_at": "2025-08-01T11:00:00Z", "entry_id": 2, "field2": null},
                {"created_at": "not a time", "entry_id": 3, "field2": "25.0"},
                {"created_at": "2025-08-01T12:00:00+08:00", "entry_id": 4, "field2": 26},
                {"created_at": "2025-08-01T13:00:00Z", "entry_id": 5, "field2": "nan"}
            ]
        }"#;
        let readings = parse_feeds(body, 2).unwrap();
        assert_eq!(readings.len(), 4);
        assert_eq!(readings[0].value, Some(24.5));
        assert_eq!(readings[1].value, None);
        assert_eq!(readings[2].value, Some(26.0));
        assert_eq!(
            readings[2].timestamp,
            Utc.with_ymd_and_hms(2025, 8, 1, 4, 0, 0).unwrap()
        );
        assert_eq!(readings[3].value, None);
    }

    #[test]
    fn test_parse_feeds_without_feeds_key() {
        // ---
        assert!(parse_feeds(r#"{"channel": {}}"#, 1).unwrap().is_empty());
        assert!(parse_feeds("not json", 1).is_err());
    }

    #[test]
    fn test_calendar_month_window() {
        // ---
        let utc8 = FixedOffset::east_opt(8 * 3600).unwrap();
        let query = FeedQuery::calendar_month(2024, 2, utc8).unwrap();
        assert_eq!(
            query.window,
            Window::Range {
                start: Utc.with_ymd_and_hms(2024, 1, 31, 16, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2024, 2, 29, 15, 59, 59).unwrap(),
            }
        );
        assert_eq!(
            query.params(),
            vec![
                ("start", "2024-01-31 16:00:00".to_string()),
                ("end", "2024-02-29 15:59:59".to_string()),
                ("average", "60".to_string()),
            ]
        );
        assert!(FeedQuery::calendar_month(2024, 13, utc8).is_err());
    }

    #[test]
    fn test_trailing_window_params() {
        // ---
        assert_eq!(
            FeedQuery::last_day().params(),
            vec![("days", "1".to_string()), ("average", "10".to_string())]
        );
        assert_eq!(FeedQuery::last_month().window, Window::Days(30));
    }
}
