//! Analytics core for the poultry-house environmental monitoring service.
//!
//! The library holds only pure, synchronous transformations: raw sensor
//! readings and alert history go in, statistics, aggregates, forecasts,
//! insights, diagnostics and recommendations come out. Nothing here performs
//! I/O or keeps state between calls; fetching, caching and persistence live in
//! the `pems-sensorflow` binary.
//!
//! Modules follow the Explicit Module Boundary Pattern (EMBP): callers go
//! through the `analytics` gateway rather than reaching into its children.

pub mod analytics;
pub mod models;

pub use models::{
    month_name, Alert, AlertType, Metric, MonthSummary, Prediction, Reading, StatisticsSummary,
    Thresholds, Trend,
};
