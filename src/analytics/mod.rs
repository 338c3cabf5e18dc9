//! Gateway for the analytics pipeline.
//!
//! Data flows one way: reading series → `aggregate` / `forecast` →
//! `insights`, `diagnostic`, `prescriptive` → `report` text for presentation.
//! `stats` is the shared kernel underneath; `units` is the only place a
//! temperature ever leaves Celsius.

mod aggregate;
mod diagnostic;
mod forecast;
mod insights;
mod prescriptive;
mod report;
mod stats;
mod units;

pub use aggregate::{
    aggregate_annual, combine_daily, combine_hourly, daily_of_month, days_in_month,
    hourly_of_day, is_completed_month, plan_annual, summarize_month, DailyPoint, HourlyPattern,
    MonthPlan, MonthSeries,
};
pub use diagnostic::{analyze_history, diagnose, Diagnosis, HistoryAnalysis, RECURRENCE_WINDOW_DAYS};
pub use forecast::{predict_ahead, ForecastPair, Horizon};
pub use insights::{
    generate_insights, Insight, InsightCategory, InsightGroup, InsightInputs, Insights,
    MetricSeries,
};
pub use prescriptive::{recommend, Prescription, Priority, Recommendation};
pub use report::{
    annual_table_analysis, annual_table_rows, bar_chart_analysis, daily_stats, line_chart_analysis,
    metric_report_summary, overall_summary, threshold_display, MetricReportSummary,
    MonthlyReportSummary, SegmentStyle, TextSegment,
};
pub use stats::{linear_regression, stats_for_readings, stats_for_values, summarize, Line};
pub use units::{celsius_to_fahrenheit, TemperatureUnit};
