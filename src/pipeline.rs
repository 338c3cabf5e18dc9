//! Request-level orchestration: fetch from the feed and the store, run the
//! analytics core, and hand back serializable results.
//!
//! Independent fetches run concurrently. Dropping a returned future (for
//! example when the client disconnects) cancels every outstanding fetch,
//! including spawned per-month tasks, which are owned by a `JoinSet`.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use pems_sensorflow::analytics::{
    aggregate_annual, analyze_history, annual_table_analysis, annual_table_rows,
    bar_chart_analysis, combine_daily, combine_hourly, daily_of_month, daily_stats, diagnose,
    generate_insights, hourly_of_day, is_completed_month, line_chart_analysis,
    metric_report_summary, overall_summary, plan_annual, predict_ahead, recommend,
    threshold_display, DailyPoint, Diagnosis, ForecastPair, HistoryAnalysis,
    Horizon, HourlyPattern, InsightInputs, Insights, MetricSeries, MonthPlan, MonthSeries,
    MonthlyReportSummary, Prescription, TemperatureUnit, TextSegment,
};
use pems_sensorflow::{month_name, Alert, Metric, MonthSummary, Reading, Thresholds};
use serde::Serialize;
use sqlx::PgPool;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::feed::{Channel, FeedClient, FeedError, FeedQuery};
use crate::store::{self, House, StoreError};

// ---

#[derive(Debug, thiserror::Error)]
pub enum MissingChannel {
    #[error("house {0} has no sensor channel configured")]
    House(Uuid),
    #[error("no house in branch {0} has a sensor channel configured")]
    Branch(String),
}

/// Houses of a branch that can contribute readings to a report.
///
/// A branch with no houses is unknown; one whose houses all lack a channel
/// has nothing to report.
fn reporting_houses(branch_name: &str, houses: Vec<House>) -> Result<Vec<House>> {
    // ---
    if houses.is_empty() {
        return Err(StoreError::BranchNotFound(branch_name.to_string()).into());
    }
    let configured: Vec<House> = houses.into_iter().filter(|h| h.channel.is_some()).collect();
    if configured.is_empty() {
        return Err(MissingChannel::Branch(branch_name.to_string()).into());
    }
    Ok(configured)
}

/// Forecasts for both horizons.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Predictions {
    // ---
    pub next_24_hours: ForecastPair,
    pub next_7_days: ForecastPair,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourlyPatterns {
    // ---
    pub ammonia: HourlyPattern,
    pub temperature: HourlyPattern,
}

/// Chart data and narrative for one metric of a monthly report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSection {
    // ---
    pub daily: Vec<DailyPoint>,
    pub hourly: HourlyPattern,
    pub trend_analysis: Vec<TextSegment>,
    pub hourly_analysis: Vec<TextSegment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    // ---
    /// House name, or the branch name for branch roll-ups.
    pub scope: String,
    pub year: i32,
    pub month: String,
    pub unit: TemperatureUnit,
    pub summary: MonthlyReportSummary,
    pub thresholds: Vec<[String; 2]>,
    pub overview: Vec<TextSegment>,
    pub ammonia: MetricSection,
    pub temperature: MetricSection,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualReport {
    // ---
    pub scope: String,
    pub year: i32,
    pub unit: TemperatureUnit,
    pub overview: Vec<TextSegment>,
    pub rows: Vec<[String; 7]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertAnalysis {
    // ---
    pub alert: Alert,
    pub history: HistoryAnalysis,
    pub diagnosis: Diagnosis,
    pub prescription: Prescription,
}

/// Shared handles for every request. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Pipeline {
    // ---
    pool: PgPool,
    feed: FeedClient,
    offset: FixedOffset,
}

impl Pipeline {
    // ---
    pub fn new(pool: PgPool, feed: FeedClient, offset: FixedOffset) -> Self {
        Self { pool, feed, offset }
    }

    /// Current instant in the bucketing offset.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    fn channel<'a>(&self, house: &'a House) -> Result<&'a Channel> {
        house
            .channel
            .as_ref()
            .ok_or_else(|| MissingChannel::House(house.id).into())
    }

    async fn fetch_pair(
        &self,
        channel: &Channel,
        query: FeedQuery,
    ) -> Result<(Vec<Reading>, Vec<Reading>)> {
        // ---
        let pair = tokio::try_join!(
            self.feed.fetch(channel, Metric::Ammonia, &query),
            self.feed.fetch(channel, Metric::Temperature, &query),
        )?;
        Ok(pair)
    }

    /// Fetch many (channel, window) pairs concurrently, each tagged with a key.
    async fn fetch_many<K>(&self, jobs: Vec<(K, Channel, FeedQuery)>) -> Result<Vec<(K, MonthSeries)>>
    where
        K: Send + 'static,
    {
        // ---
        let mut tasks = JoinSet::new();
        for (key, channel, query) in jobs {
            let feed = self.feed.clone();
            tasks.spawn(async move {
                let (ammonia, temperature) = tokio::try_join!(
                    feed.fetch(&channel, Metric::Ammonia, &query),
                    feed.fetch(&channel, Metric::Temperature, &query),
                )?;
                Ok::<_, FeedError>((key, MonthSeries { ammonia, temperature }))
            });
        }

        let mut out = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            out.push(joined??);
        }
        Ok(out)
    }

    // ---

    pub async fn house(&self, house_id: Uuid) -> Result<House> {
        Ok(store::get_house(&self.pool, house_id).await?)
    }

    pub async fn insights(&self, house_id: Uuid) -> Result<Option<Insights>> {
        // ---
        let house = self.house(house_id).await?;
        let channel = self.channel(&house)?;
        let now = self.now();
        let month_query = FeedQuery::calendar_month(now.year(), now.month(), self.offset)?;

        let (day, week, month, annual, alerts) = tokio::try_join!(
            self.fetch_pair(channel, FeedQuery::last_day()),
            self.fetch_pair(channel, FeedQuery::last_week()),
            self.fetch_pair(channel, month_query),
            self.annual_for_house(&house, now.year(), now.date_naive()),
            async {
                store::list_house_alerts(&self.pool, house.id)
                    .await
                    .map_err(anyhow::Error::from)
            },
        )?;

        let hourly_ammonia = hourly_of_day(&month.0, self.offset);
        let hourly_temperature = hourly_of_day(&month.1, self.offset);

        let inputs = InsightInputs {
            thresholds: house.thresholds,
            daily: MetricSeries {
                ammonia: &day.0,
                temperature: &day.1,
            },
            weekly: MetricSeries {
                ammonia: &week.0,
                temperature: &week.1,
            },
            annual: &annual,
            hourly_ammonia: &hourly_ammonia,
            hourly_temperature: &hourly_temperature,
            alerts: &alerts,
            now,
        };
        let insights = generate_insights(&inputs);
        tracing::debug!(%house_id, groups = insights.as_ref().map_or(0, |i| i.len()), "insights generated");
        Ok(insights)
    }

    async fn forecast(&self, channel: &Channel, query: FeedQuery, horizon: Horizon) -> Result<ForecastPair> {
        // ---
        let (ammonia, temperature) = self.fetch_pair(channel, query).await?;
        Ok(ForecastPair {
            ammonia: predict_ahead(&ammonia, horizon),
            temperature: predict_ahead(&temperature, horizon),
        })
    }

    pub async fn predictions(&self, house_id: Uuid) -> Result<Predictions> {
        // ---
        let house = self.house(house_id).await?;
        let channel = self.channel(&house)?;
        let (next_24_hours, next_7_days) = tokio::try_join!(
            self.forecast(channel, FeedQuery::last_week(), Horizon::NextDay),
            self.forecast(channel, FeedQuery::last_month(), Horizon::NextWeek),
        )?;
        Ok(Predictions {
            next_24_hours,
            next_7_days,
        })
    }

    pub async fn hourly(&self, house_id: Uuid, year: i32, month: u32) -> Result<HourlyPatterns> {
        // ---
        let house = self.house(house_id).await?;
        let channel = self.channel(&house)?;
        let query = FeedQuery::calendar_month(year, month, self.offset)?;
        let (ammonia, temperature) = self.fetch_pair(channel, query).await?;
        Ok(HourlyPatterns {
            ammonia: hourly_of_day(&ammonia, self.offset),
            temperature: hourly_of_day(&temperature, self.offset),
        })
    }

    pub async fn annual(&self, house_id: Uuid, year: i32) -> Result<Vec<MonthSummary>> {
        // ---
        let house = self.house(house_id).await?;
        self.annual_for_house(&house, year, self.now().date_naive()).await
    }

    /// Read-through annual aggregation.
    ///
    /// Completed months come from the cache when present; everything else up
    /// to the current month is recomputed from hourly-averaged readings.
    /// Freshly computed completed months are written back, and a failed write
    /// only logs a warning.
    async fn annual_for_house(&self, house: &House, year: i32, today: NaiveDate) -> Result<Vec<MonthSummary>> {
        // ---
        let cached = match store::load_annual(&self.pool, house.id, year).await {
            Ok(slots) => slots,
            Err(e) => {
                tracing::warn!(house_id = %house.id, year, "Annual cache read failed: {}", e);
                vec![None; 12]
            }
        };

        let to_compute: Vec<u32> = plan_annual(year, today, &cached)
            .iter()
            .zip(1..=12u32)
            .filter(|(plan, _)| matches!(plan, MonthPlan::Compute))
            .map(|(_, month)| month)
            .collect();

        let series: BTreeMap<u32, MonthSeries> = match &house.channel {
            Some(channel) => {
                let mut jobs = Vec::with_capacity(to_compute.len());
                for month in &to_compute {
                    jobs.push((*month, channel.clone(), FeedQuery::calendar_month(year, *month, self.offset)?));
                }
                self.fetch_many(jobs).await?.into_iter().collect()
            }
            None => BTreeMap::new(),
        };

        let summaries = aggregate_annual(year, today, &cached, &series);

        for month in to_compute {
            let Some(summary) = summaries.get(month as usize - 1) else {
                continue;
            };
            if !is_completed_month(year, month, today) || !series.contains_key(&month) || !summary.has_data() {
                continue;
            }
            if let Err(e) = store::save_month(&self.pool, house.id, year, month, summary).await {
                tracing::warn!(house_id = %house.id, year, month, "Annual cache write failed: {}", e);
            }
        }

        Ok(summaries)
    }

    // ---

    pub async fn monthly_report(
        &self,
        house_id: Uuid,
        year: i32,
        month: u32,
        unit: TemperatureUnit,
    ) -> Result<MonthlyReport> {
        // ---
        let house = self.house(house_id).await?;
        self.channel(&house)?;
        let thresholds = house.thresholds;
        self.build_monthly_report(house.name.clone(), &[house], Some(thresholds), year, month, unit)
            .await
    }

    /// Monthly report averaged across every configured house in a branch.
    pub async fn branch_monthly_report(
        &self,
        branch_name: &str,
        year: i32,
        month: u32,
        unit: TemperatureUnit,
    ) -> Result<MonthlyReport> {
        // ---
        let houses = reporting_houses(
            branch_name,
            store::list_branch_houses(&self.pool, branch_name).await?,
        )?;
        tracing::debug!(branch_name, houses = houses.len(), "building branch report");
        self.build_monthly_report(branch_name.to_string(), &houses, None, year, month, unit)
            .await
    }

    async fn build_monthly_report(
        &self,
        scope: String,
        houses: &[House],
        thresholds: Option<Thresholds>,
        year: i32,
        month: u32,
        unit: TemperatureUnit,
    ) -> Result<MonthlyReport> {
        // ---
        let query = FeedQuery::calendar_month(year, month, self.offset)?;
        let jobs: Vec<(Uuid, Channel, FeedQuery)> = houses
            .iter()
            .filter_map(|h| h.channel.clone().map(|c| (h.id, c, query)))
            .collect();
        let per_house = self.fetch_many(jobs).await?;

        let section_data = |metric: Metric| {
            let daily: Vec<Vec<DailyPoint>> = per_house
                .iter()
                .map(|(_, s)| daily_of_month(s.get(metric), year, month, self.offset))
                .collect();
            let hourly: Vec<HourlyPattern> = per_house
                .iter()
                .map(|(_, s)| hourly_of_day(s.get(metric), self.offset))
                .collect();
            (combine_daily(&daily, year, month), combine_hourly(&hourly))
        };
        let (ammonia_daily, ammonia_hourly) = section_data(Metric::Ammonia);
        let (temp_daily, temp_hourly) = section_data(Metric::Temperature);

        let ammonia_stats = daily_stats(&ammonia_daily);
        let temp_stats = daily_stats(&temp_daily);

        let summary = MonthlyReportSummary {
            ammonia: metric_report_summary(&ammonia_daily, &ammonia_hourly, Metric::Ammonia, unit),
            temperature: metric_report_summary(&temp_daily, &temp_hourly, Metric::Temperature, unit),
        };
        let overview = overall_summary(&summary, thresholds.as_ref(), &ammonia_stats, &temp_stats);

        Ok(MonthlyReport {
            scope,
            year,
            month: month_name(month).to_string(),
            unit,
            thresholds: threshold_display(thresholds.as_ref(), unit),
            overview,
            summary,
            ammonia: MetricSection {
                trend_analysis: line_chart_analysis(&ammonia_stats, Metric::Ammonia, unit),
                hourly_analysis: bar_chart_analysis(&ammonia_hourly, Metric::Ammonia, unit),
                daily: ammonia_daily,
                hourly: ammonia_hourly,
            },
            temperature: MetricSection {
                trend_analysis: line_chart_analysis(&temp_stats, Metric::Temperature, unit),
                hourly_analysis: bar_chart_analysis(&temp_hourly, Metric::Temperature, unit),
                daily: temp_daily,
                hourly: temp_hourly,
            },
        })
    }

    pub async fn annual_report(&self, house_id: Uuid, year: i32, unit: TemperatureUnit) -> Result<AnnualReport> {
        // ---
        let house = self.house(house_id).await?;
        let annual = self.annual_for_house(&house, year, self.now().date_naive()).await?;
        Ok(AnnualReport {
            overview: annual_table_analysis(&annual, Some(&house.thresholds), unit),
            rows: annual_table_rows(&annual, unit),
            scope: house.name,
            year,
            unit,
        })
    }

    // ---

    /// Diagnosis and recommendations for one alert.
    ///
    /// A house without a sensor channel still gets a diagnosis; its
    /// prescription reports the missing data instead of failing.
    pub async fn alert_analysis(&self, alert_id: Uuid) -> Result<AlertAnalysis> {
        // ---
        let alert = store::get_alert(&self.pool, alert_id).await?;
        let house = self.house(alert.house_id).await?;

        let forecasts = async {
            match &house.channel {
                Some(channel) => self
                    .forecast(channel, FeedQuery::last_week(), Horizon::NextDay)
                    .await
                    .map(Some),
                None => Ok(None),
            }
        };
        let (history, forecasts) = tokio::try_join!(
            async {
                store::list_house_alerts(&self.pool, house.id)
                    .await
                    .map_err(anyhow::Error::from)
            },
            forecasts,
        )?;

        let analysis = analyze_history(&alert, &history);
        let diagnosis = diagnose(&alert, &history, self.offset);
        let prescription = recommend(Some(&alert), forecasts.as_ref(), &analysis);

        Ok(AlertAnalysis {
            alert,
            history: analysis,
            diagnosis,
            prescription,
        })
    }

    pub async fn acknowledge(&self, alert_id: Uuid, actions_taken: &[String]) -> Result<Alert> {
        // ---
        let alert = store::acknowledge_alert(&self.pool, alert_id, actions_taken).await?;
        tracing::info!(%alert_id, actions = actions_taken.len(), "alert acknowledged");
        Ok(alert)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::feed::Channel;

    fn house(name: &str, channel: Option<Channel>) -> House {
        House {
            id: Uuid::new_v4(),
            branch_name: "North".to_string(),
            name: name.to_string(),
            channel,
            thresholds: Thresholds::default(),
        }
    }

    fn channel() -> Channel {
        Channel {
            channel_id: "123456".to_string(),
            read_key: "READKEY".to_string(),
            ammonia_field: 1,
            temp_field: 2,
        }
    }

    #[test]
    fn test_unknown_branch_is_not_found() {
        // ---
        let err = reporting_houses("Nowhere", vec![]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::BranchNotFound(name)) if name == "Nowhere"
        ));
    }

    #[test]
    fn test_branch_without_channels_is_missing_channel() {
        // ---
        let err = reporting_houses("North", vec![house("A", None), house("B", None)]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MissingChannel>(),
            Some(MissingChannel::Branch(_))
        ));
    }

    #[test]
    fn test_branch_keeps_only_configured_houses() {
        // ---
        let houses = vec![house("A", None), house("B", Some(channel()))];
        let configured = reporting_houses("North", houses).unwrap();
        assert_eq!(configured.len(), 1);
        assert_eq!(configured[0].name, "B");
    }
}
