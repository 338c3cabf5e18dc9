//! Descriptive insights for the house dashboard.
//!
//! Six fixed categories are evaluated independently from precomputed inputs.
//! Texts use `**bold**` markers and are always in Celsius / ppm; converting
//! them for display is the presentation layer's job.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc};
use serde::Serialize;

use super::aggregate::HourlyPattern;
use super::stats::stats_for_readings;
use crate::models::{month_name, Alert, AlertType, MonthSummary, Reading, Thresholds, Trend};

/// Standard deviation (°C) above which a day counts as volatile.
const VOLATILITY_STD_DEV: f64 = 2.0;

const ALERT_WINDOW_DAYS: i64 = 30;

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightCategory {
    Daily,
    Weekly,
    Monthly,
    Annual,
    Hourly,
    Alerts,
}

impl InsightCategory {
    // ---
    pub const ALL: [InsightCategory; 6] = [
        InsightCategory::Daily,
        InsightCategory::Weekly,
        InsightCategory::Monthly,
        InsightCategory::Annual,
        InsightCategory::Hourly,
        InsightCategory::Alerts,
    ];

    fn empty_group(&self) -> InsightGroup {
        // ---
        let (title, icon, color) = match self {
            InsightCategory::Daily => ("Daily Summary", "bi-sun", "#fd7e14"),
            InsightCategory::Weekly => ("Weekly Trends", "bi-graph-up", "#0dcaf0"),
            InsightCategory::Monthly => ("This Month At a Glance", "bi-calendar-check", "#6f42c1"),
            InsightCategory::Annual => ("Annual Overview", "bi-calendar3", "#198754"),
            InsightCategory::Hourly => ("Hourly Patterns", "bi-clock-history", "#d63384"),
            InsightCategory::Alerts => ("Alert Analysis", "bi-exclamation-triangle", "#dc3545"),
        };
        InsightGroup {
            title,
            icon,
            color,
            insights: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    // ---
    pub text: String,
    pub icon: &'static str,
}

impl Insight {
    fn new(text: impl Into<String>, icon: &'static str) -> Self {
        Self {
            text: text.into(),
            icon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightGroup {
    // ---
    pub title: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub insights: Vec<Insight>,
}

/// Non-empty insight groups keyed by category, in category order.
pub type Insights = BTreeMap<InsightCategory, InsightGroup>;

/// Ammonia and temperature series for one time window.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricSeries<'a> {
    // ---
    pub ammonia: &'a [Reading],
    pub temperature: &'a [Reading],
}

/// Everything the generator looks at for one house.
#[derive(Debug, Clone, Copy)]
pub struct InsightInputs<'a> {
    // ---
    pub thresholds: Thresholds,
    /// Last 24 hours.
    pub daily: MetricSeries<'a>,
    /// Last 7 days.
    pub weekly: MetricSeries<'a>,
    /// Annual summary for the current year, one row per month.
    pub annual: &'a [MonthSummary],
    pub hourly_ammonia: &'a HourlyPattern,
    pub hourly_temperature: &'a HourlyPattern,
    pub alerts: &'a [Alert],
    /// Evaluation instant, in the house's reporting offset.
    pub now: DateTime<FixedOffset>,
}

// ---

/// Build categorized insights. `None` means there was nothing to say.
pub fn generate_insights(inputs: &InsightInputs<'_>) -> Option<Insights> {
    // ---
    let groups = InsightCategory::ALL.iter().map(|category| {
        let insights = match category {
            InsightCategory::Daily => daily_insights(inputs),
            InsightCategory::Weekly => weekly_insights(inputs),
            InsightCategory::Monthly => monthly_insights(inputs),
            InsightCategory::Annual => annual_insights(inputs.annual),
            InsightCategory::Hourly => hourly_insights(inputs),
            InsightCategory::Alerts => alert_insights(inputs),
        };
        let mut group = category.empty_group();
        group.insights = insights;
        (*category, group)
    });
    collect_groups(groups)
}

fn collect_groups(groups: impl IntoIterator<Item = (InsightCategory, InsightGroup)>) -> Option<Insights> {
    // ---
    let map: Insights = groups
        .into_iter()
        .filter(|(_, group)| !group.insights.is_empty())
        .collect();
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn daily_insights(inputs: &InsightInputs<'_>) -> Vec<Insight> {
    // ---
    let thresholds = &inputs.thresholds;
    let ammonia = stats_for_readings(inputs.daily.ammonia);
    let temp = stats_for_readings(inputs.daily.temperature);
    let mut out = Vec::new();

    if let (Some(mean), Some(max)) = (ammonia.mean, ammonia.max) {
        match thresholds.ammonia_high {
            Some(high) if max >= high => out.push(Insight::new(
                format!("Ammonia peaked at **{max:.2} ppm**, exceeding the **{high} ppm** threshold."),
                "bi-exclamation-circle-fill",
            )),
            _ => out.push(Insight::new(
                format!("Average ammonia in the last 24h was **{mean:.2} ppm**."),
                "bi-wind",
            )),
        }
    }

    if let (Some(min), Some(max), Some(std_dev)) = (temp.min, temp.max, temp.std_dev) {
        let high = thresholds.temp_high.filter(|high| max >= *high);
        let low = thresholds.temp_low.filter(|low| min <= *low);
        let text = match (high, low) {
            (Some(high), _) => (
                format!("Temperature hit a high of **{max:.2}°C**, exceeding the **{high}°C** limit."),
                "bi-thermometer-high",
            ),
            (None, Some(low)) => (
                format!("Temperature dropped to **{min:.2}°C**, below the **{low}°C** limit."),
                "bi-thermometer-low",
            ),
            (None, None) => (
                format!("Temperature ranged from **{min:.2}°C** to **{max:.2}°C**."),
                "bi-thermometer-half",
            ),
        };
        out.push(Insight::new(text.0, text.1));

        if std_dev > VOLATILITY_STD_DEV {
            out.push(Insight::new(
                format!("Temperature was **volatile**, fluctuating by ~**{std_dev:.1}°C** from the average."),
                "bi-activity",
            ));
        }
    }

    if ammonia.count == 0 && temp.count == 0 {
        out.push(Insight::new(
            "No new data recorded in the last 24 hours.",
            "bi-info-circle",
        ));
    }
    out
}

fn trend_icon(trend: Trend) -> &'static str {
    match trend {
        Trend::Increasing => "bi-arrow-up-right",
        Trend::Decreasing => "bi-arrow-down-right",
        Trend::Stable => "bi-check-circle",
    }
}

fn weekly_insights(inputs: &InsightInputs<'_>) -> Vec<Insight> {
    // ---
    let ammonia = stats_for_readings(inputs.weekly.ammonia);
    let temp = stats_for_readings(inputs.weekly.temperature);
    let mut out = Vec::new();

    if ammonia.count >= 2 {
        out.push(Insight::new(
            format!("Ammonia levels showed a **{}** trend this week.", ammonia.trend),
            trend_icon(ammonia.trend),
        ));
    }
    if temp.count >= 2 {
        out.push(Insight::new(
            format!("Temperature showed a **{}** trend this week.", temp.trend),
            trend_icon(temp.trend),
        ));
    }
    if out.is_empty() {
        out.push(Insight::new(
            "Not enough data for weekly trend analysis.",
            "bi-info-circle",
        ));
    }
    out
}

fn monthly_insights(inputs: &InsightInputs<'_>) -> Vec<Insight> {
    // ---
    let current = month_name(inputs.now.month());
    let Some(row) = inputs.annual.iter().find(|row| row.month == current) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    if !row.ammonia_avg.is_empty() {
        out.push(Insight::new(
            format!("This month's average ammonia is **{} ppm**.", row.ammonia_avg),
            "bi-wind",
        ));
    }
    if !row.temp_avg.is_empty() {
        out.push(Insight::new(
            format!("The average temperature this month is **{}°C**.", row.temp_avg),
            "bi-thermometer-half",
        ));
    }
    out
}

/// First month with the strictly greatest value of `key`.
pub(crate) fn max_month<'a>(
    months: &[(&'a MonthSummary, f64, f64)],
    key: impl Fn(&(&'a MonthSummary, f64, f64)) -> f64,
) -> Option<&'a MonthSummary> {
    // ---
    months
        .iter()
        .fold(None::<(&MonthSummary, f64)>, |best, entry| {
            let value = key(entry);
            match best {
                Some((_, best_value)) if value <= best_value => best,
                _ => Some((entry.0, value)),
            }
        })
        .map(|(month, _)| month)
}

/// Months with both averages present, paired with (ammonia, temperature).
pub(crate) fn complete_months(annual: &[MonthSummary]) -> Vec<(&MonthSummary, f64, f64)> {
    annual
        .iter()
        .filter_map(|m| Some((m, m.ammonia_avg_value()?, m.temp_avg_value()?)))
        .collect()
}

fn annual_insights(annual: &[MonthSummary]) -> Vec<Insight> {
    // ---
    let months = complete_months(annual);
    if months.len() < 2 {
        return Vec::new();
    }

    let mut out = Vec::new();
    if let Some(hottest) = max_month(&months, |(_, _, temp)| *temp) {
        out.push(Insight::new(
            format!(
                "**{}** was the hottest month on average (**{}°C**).",
                hottest.month, hottest.temp_avg
            ),
            "bi-thermometer-sun",
        ));
    }
    if let Some(worst) = max_month(&months, |(_, ammonia, _)| *ammonia) {
        out.push(Insight::new(
            format!(
                "Ammonia levels were highest in **{}** (**{} ppm**).",
                worst.month, worst.ammonia_avg
            ),
            "bi-wind",
        ));
    }
    out
}

fn hourly_insights(inputs: &InsightInputs<'_>) -> Vec<Insight> {
    // ---
    let mut out = Vec::new();
    if let Some((hour, _)) = inputs.hourly_ammonia.peak() {
        out.push(Insight::new(
            format!(
                "Ammonia levels typically peak around **{}**.",
                HourlyPattern::label(hour)
            ),
            "bi-clock",
        ));
    }
    if let Some((hour, _)) = inputs.hourly_temperature.peak() {
        out.push(Insight::new(
            format!(
                "The warmest part of the day is usually around **{}**.",
                HourlyPattern::label(hour)
            ),
            "bi-clock-fill",
        ));
    }
    out
}

fn alert_insights(inputs: &InsightInputs<'_>) -> Vec<Insight> {
    // ---
    let since = (inputs.now - Duration::days(ALERT_WINDOW_DAYS)).with_timezone(&Utc);
    let recent: Vec<&Alert> = inputs
        .alerts
        .iter()
        .filter(|a| a.timestamp >= since)
        .collect();

    if recent.is_empty() {
        return vec![Insight::new(
            "No critical alerts have been triggered in the past 30 days.",
            "bi-shield-check",
        )];
    }

    let mut out = vec![Insight::new(
        format!("Triggered **{}** alert(s) in the last 30 days.", recent.len()),
        "bi-bell-fill",
    )];
    if let Some(kind) = most_frequent_type(&recent) {
        out.push(Insight::new(
            format!("The most frequent alert type was **'{}'**.", kind.as_str()),
            "bi-bar-chart-fill",
        ));
    }
    out
}

/// Most common alert type; ties go to the type seen first.
fn most_frequent_type(alerts: &[&Alert]) -> Option<AlertType> {
    // ---
    let mut counts: Vec<(AlertType, usize)> = Vec::new();
    for alert in alerts {
        match counts.iter_mut().find(|(kind, _)| *kind == alert.alert_type) {
            Some((_, n)) => *n += 1,
            None => counts.push((alert.alert_type, 1)),
        }
    }
    counts
        .into_iter()
        .fold(None::<(AlertType, usize)>, |best, (kind, n)| match best {
            Some((_, best_n)) if n <= best_n => best,
            _ => Some((kind, n)),
        })
        .map(|(kind, _)| kind)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn now() -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0)
            .unwrap()
            .with_timezone(&FixedOffset::east_opt(0).unwrap())
    }

    fn series(values: &[f64]) -> Vec<Reading> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Reading::new(now().with_timezone(&Utc) - Duration::hours(24 - i as i64), *v))
            .collect()
    }

    fn alert(kind: AlertType, days_ago: i64) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            house_id: Uuid::nil(),
            branch_name: "North".to_string(),
            alert_type: kind,
            message: "High reading".to_string(),
            timestamp: now().with_timezone(&Utc) - Duration::days(days_ago),
            is_acknowledged: false,
            actions_taken: vec![],
        }
    }

    fn row(month: u32, ammonia: &str, temp: &str) -> MonthSummary {
        MonthSummary {
            ammonia_avg: ammonia.to_string(),
            temp_avg: temp.to_string(),
            ..MonthSummary::empty(month)
        }
    }

    struct Fixture {
        daily_ammonia: Vec<Reading>,
        daily_temp: Vec<Reading>,
        weekly_ammonia: Vec<Reading>,
        weekly_temp: Vec<Reading>,
        annual: Vec<MonthSummary>,
        hourly_ammonia: HourlyPattern,
        hourly_temp: HourlyPattern,
        alerts: Vec<Alert>,
        thresholds: Thresholds,
    }

    impl Fixture {
        fn empty() -> Self {
            Self {
                daily_ammonia: vec![],
                daily_temp: vec![],
                weekly_ammonia: vec![],
                weekly_temp: vec![],
                annual: vec![],
                hourly_ammonia: HourlyPattern::default(),
                hourly_temp: HourlyPattern::default(),
                alerts: vec![],
                thresholds: Thresholds::default(),
            }
        }

        fn generate(&self) -> Option<Insights> {
            generate_insights(&InsightInputs {
                thresholds: self.thresholds,
                daily: MetricSeries {
                    ammonia: &self.daily_ammonia,
                    temperature: &self.daily_temp,
                },
                weekly: MetricSeries {
                    ammonia: &self.weekly_ammonia,
                    temperature: &self.weekly_temp,
                },
                annual: &self.annual,
                hourly_ammonia: &self.hourly_ammonia,
                hourly_temperature: &self.hourly_temp,
                alerts: &self.alerts,
                now: now(),
            })
        }
    }

    fn texts(insights: &Insights, category: InsightCategory) -> Vec<String> {
        insights
            .get(&category)
            .map(|g| g.insights.iter().map(|i| i.text.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_collect_groups_all_empty_is_none() {
        // ---
        let groups = InsightCategory::ALL.iter().map(|c| (*c, c.empty_group()));
        assert!(collect_groups(groups).is_none());
    }

    #[test]
    fn test_no_data_everywhere() {
        // ---
        let insights = Fixture::empty().generate().unwrap();
        assert_eq!(
            texts(&insights, InsightCategory::Daily),
            vec!["No new data recorded in the last 24 hours."]
        );
        assert_eq!(
            texts(&insights, InsightCategory::Weekly),
            vec!["Not enough data for weekly trend analysis."]
        );
        assert!(!insights.contains_key(&InsightCategory::Monthly));
        assert!(!insights.contains_key(&InsightCategory::Annual));
        assert!(!insights.contains_key(&InsightCategory::Hourly));
        assert_eq!(
            texts(&insights, InsightCategory::Alerts),
            vec!["No critical alerts have been triggered in the past 30 days."]
        );
    }

    #[test]
    fn test_daily_ammonia_breach_cites_max_and_threshold() {
        // ---
        let mut f = Fixture::empty();
        f.thresholds.ammonia_high = Some(20.0);
        f.daily_ammonia = series(&[12.0, 22.0, 15.0]);
        let daily = texts(&f.generate().unwrap(), InsightCategory::Daily);
        assert_eq!(
            daily,
            vec!["Ammonia peaked at **22.00 ppm**, exceeding the **20 ppm** threshold."]
        );
    }

    #[test]
    fn test_daily_without_threshold_reports_average() {
        // ---
        let mut f = Fixture::empty();
        f.daily_ammonia = series(&[10.0, 20.0]);
        let daily = texts(&f.generate().unwrap(), InsightCategory::Daily);
        assert_eq!(daily, vec!["Average ammonia in the last 24h was **15.00 ppm**."]);
    }

    #[test]
    fn test_daily_temperature_rules() {
        // ---
        let mut f = Fixture::empty();
        f.thresholds.temp_high = Some(35.0);
        f.thresholds.temp_low = Some(18.0);

        f.daily_temp = series(&[16.0, 25.0]);
        let daily = texts(&f.generate().unwrap(), InsightCategory::Daily);
        assert_eq!(daily[0], "Temperature dropped to **16.00°C**, below the **18°C** limit.");
        // std dev 4.5 > 2
        assert!(daily[1].contains("**volatile**"));
        assert!(daily[1].contains("~**4.5°C**"));

        f.daily_temp = series(&[20.0, 21.0]);
        let daily = texts(&f.generate().unwrap(), InsightCategory::Daily);
        assert_eq!(daily, vec!["Temperature ranged from **20.00°C** to **21.00°C**."]);

        f.daily_temp = series(&[30.0, 36.0]);
        let daily = texts(&f.generate().unwrap(), InsightCategory::Daily);
        assert!(daily[0].starts_with("Temperature hit a high of **36.00°C**"));
    }

    #[test]
    fn test_weekly_trends_need_two_samples() {
        // ---
        let mut f = Fixture::empty();
        f.weekly_ammonia = series(&[1.0, 2.0, 3.0]);
        f.weekly_temp = series(&[20.0]);
        let weekly = texts(&f.generate().unwrap(), InsightCategory::Weekly);
        assert_eq!(weekly, vec!["Ammonia levels showed a **increasing** trend this week."]);
    }

    #[test]
    fn test_monthly_reads_current_month_row() {
        // ---
        let mut f = Fixture::empty();
        f.annual = vec![row(2, "9.00", "25.00"), row(3, "11.50", "")];
        let monthly = texts(&f.generate().unwrap(), InsightCategory::Monthly);
        assert_eq!(monthly, vec!["This month's average ammonia is **11.50 ppm**."]);
    }

    #[test]
    fn test_annual_needs_two_complete_months() {
        // ---
        let mut f = Fixture::empty();
        f.annual = vec![row(1, "9.00", "25.00"), row(2, "", "30.00")];
        assert!(!f.generate().unwrap().contains_key(&InsightCategory::Annual));

        f.annual = vec![
            row(1, "9.00", "25.00"),
            row(2, "14.00", "31.00"),
            row(3, "14.00", "31.00"),
        ];
        let annual = texts(&f.generate().unwrap(), InsightCategory::Annual);
        assert_eq!(
            annual,
            vec![
                "**February** was the hottest month on average (**31.00°C**).",
                "Ammonia levels were highest in **February** (**14.00 ppm**).",
            ]
        );
    }

    #[test]
    fn test_hourly_peaks() {
        // ---
        let mut ammonia = [None; 24];
        ammonia[6] = Some(12.0);
        ammonia[7] = Some(10.0);
        let mut temp = [None; 24];
        temp[14] = Some(31.0);
        let mut f = Fixture::empty();
        f.hourly_ammonia = HourlyPattern::from_values(ammonia);
        f.hourly_temp = HourlyPattern::from_values(temp);
        let hourly = texts(&f.generate().unwrap(), InsightCategory::Hourly);
        assert_eq!(
            hourly,
            vec![
                "Ammonia levels typically peak around **06:00**.",
                "The warmest part of the day is usually around **14:00**.",
            ]
        );
    }

    #[test]
    fn test_alerts_count_and_tie_break() {
        // ---
        let mut f = Fixture::empty();
        f.alerts = vec![
            alert(AlertType::Temperature, 1),
            alert(AlertType::Ammonia, 2),
            alert(AlertType::Ammonia, 3),
            alert(AlertType::Temperature, 4),
            alert(AlertType::Ammonia, 45),
        ];
        let alerts = texts(&f.generate().unwrap(), InsightCategory::Alerts);
        assert_eq!(
            alerts,
            vec![
                "Triggered **4** alert(s) in the last 30 days.",
                "The most frequent alert type was **'temperature'**.",
            ]
        );
    }
}
