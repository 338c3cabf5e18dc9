//! Presentation units. Readings stay in Celsius everywhere else; conversion
//! happens only when report text and tables are rendered.

use serde::{Deserialize, Serialize};

use crate::models::Metric;

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Temperature unit requested by a report consumer (`?unit=C` or `?unit=F`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C", alias = "c")]
    Celsius,
    #[serde(rename = "F", alias = "f")]
    Fahrenheit,
}

impl TemperatureUnit {
    // ---
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    /// Convert a Celsius temperature into this unit.
    pub fn from_celsius(&self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
        }
    }

    /// Convert a native value of `metric`; ammonia is never converted.
    pub fn convert(&self, metric: Metric, value: f64) -> f64 {
        match metric {
            Metric::Ammonia => value,
            Metric::Temperature => self.from_celsius(value),
        }
    }

    /// Suffix appended to a displayed value of `metric`.
    pub fn suffix(&self, metric: Metric) -> &'static str {
        match metric {
            Metric::Ammonia => " ppm",
            Metric::Temperature => self.symbol(),
        }
    }
}
