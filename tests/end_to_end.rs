//! End-to-end scenarios through the public analytics API: a week of rising
//! ammonia is forecast, turned into dashboard insights, and fed to the alert
//! recommender.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use pems_sensorflow::analytics::{
    analyze_history, generate_insights, hourly_of_day, predict_ahead, recommend,
    stats_for_readings, summarize, ForecastPair, Horizon, InsightCategory, InsightInputs,
    MetricSeries,
};
use pems_sensorflow::{Alert, AlertType, MonthSummary, Reading, Thresholds, Trend};
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 15, 12, 0, 0).unwrap()
}

/// 168 hourly points rising linearly from 5 to 20 ppm, ending at `now`.
fn rising_week() -> Vec<Reading> {
    (0..168)
        .map(|i| {
            let value = 5.0 + 15.0 * i as f64 / 167.0;
            Reading::new(now() - Duration::hours(167 - i as i64), value)
        })
        .collect()
}

fn ammonia_alert(days_ago: i64) -> Alert {
    Alert {
        id: Uuid::new_v4(),
        house_id: Uuid::nil(),
        branch_name: "North".to_string(),
        alert_type: AlertType::Ammonia,
        message: "High ammonia detected: 22 ppm".to_string(),
        timestamp: now() - Duration::days(days_ago),
        is_acknowledged: days_ago > 0,
        actions_taken: vec!["Improved airflow".to_string()],
    }
}

#[test]
fn test_statistics_kernel_boundaries() {
    // ---
    let empty = summarize(&[]);
    assert_eq!(empty.count, 0);
    assert!(empty.mean.is_none() && empty.min.is_none() && empty.max.is_none());

    let single = summarize(&[(0.0, 5.0)]);
    assert_eq!((single.mean, single.min, single.max), (Some(5.0), Some(5.0), Some(5.0)));
    assert_eq!(single.std_dev, Some(0.0));
    assert_eq!(single.trend, Trend::Stable);

    let line = summarize(&[(0.0, 1.0), (1.0, 2.0), (2.0, 3.0), (3.0, 4.0), (4.0, 5.0)]);
    assert_eq!(line.mean, Some(3.0));
    assert_eq!((line.min, line.max), (Some(1.0), Some(5.0)));
    assert_eq!(line.trend, Trend::Increasing);
}

#[test]
fn test_rising_week_forecasts_increase() {
    // ---
    let week = rising_week();
    let p = predict_ahead(&week, Horizon::NextDay).unwrap();
    assert_eq!(p.trend, Trend::Increasing);
    assert!(p.predicted_value > 20.0, "predicted {}", p.predicted_value);
}

#[test]
fn test_daily_threshold_breach_is_reported() {
    // ---
    let mut day: Vec<Reading> = (0..24)
        .map(|i| Reading::new(now() - Duration::hours(23 - i), 15.0))
        .collect();
    day[18].value = Some(22.0);

    let week = rising_week();
    let hourly = hourly_of_day(&week, FixedOffset::east_opt(0).unwrap());
    let empty = hourly_of_day(&[], FixedOffset::east_opt(0).unwrap());
    let annual: Vec<MonthSummary> = (1..=12).map(MonthSummary::empty).collect();

    let inputs = InsightInputs {
        thresholds: Thresholds {
            ammonia_high: Some(20.0),
            temp_high: None,
            temp_low: None,
        },
        daily: MetricSeries {
            ammonia: &day,
            temperature: &[],
        },
        weekly: MetricSeries {
            ammonia: &week,
            temperature: &[],
        },
        annual: &annual,
        hourly_ammonia: &hourly,
        hourly_temperature: &empty,
        alerts: &[],
        now: now().with_timezone(&FixedOffset::east_opt(0).unwrap()),
    };
    let insights = generate_insights(&inputs).unwrap();

    let daily = &insights[&InsightCategory::Daily];
    assert!(daily
        .insights
        .iter()
        .any(|i| i.text.contains("22") && i.text.contains("20")));

    let weekly = &insights[&InsightCategory::Weekly];
    assert!(weekly.insights[0].text.contains("increasing"));
    assert!(insights.contains_key(&InsightCategory::Alerts));
    assert!(!insights.contains_key(&InsightCategory::Annual));
}

#[test]
fn test_recurring_alert_gets_long_term_action() {
    // ---
    let current = ammonia_alert(0);
    let history = vec![ammonia_alert(40), ammonia_alert(20), ammonia_alert(5)];
    let analysis = analyze_history(&current, &history);
    assert_eq!(analysis.count, 2);
    assert_eq!(analysis.ineffective_actions, vec!["Improved airflow"]);

    let week = rising_week();
    let forecasts = ForecastPair {
        ammonia: predict_ahead(&week, Horizon::NextDay),
        temperature: None,
    };
    let prescription = recommend(Some(&current), Some(&forecasts), &analysis);
    assert_eq!(prescription.recommendations[0], "Improve airflow immediately.");
    assert_eq!(
        prescription.recommendations.last().map(String::as_str),
        Some("Review and improve animal waste management schedule.")
    );
}

#[test]
fn test_weekly_stats_match_forecast_direction() {
    // ---
    let stats = stats_for_readings(&rising_week());
    assert_eq!(stats.count, 168);
    assert_eq!(stats.trend, Trend::Increasing);
    assert!((stats.min.unwrap() - 5.0).abs() < 1e-9);
    assert!((stats.max.unwrap() - 20.0).abs() < 1e-9);
}
