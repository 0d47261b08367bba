use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn from_celsius(self, celsius: f32) -> f32 {
        match self {
            UnitSystem::Metric => celsius,
            UnitSystem::Imperial => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnitSystem::Metric => "°C",
            UnitSystem::Imperial => "°F",
        }
    }
}

/// One wake cycle worth of measurements.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub temperature_c: f32,
    pub battery_v: f32,
    /// `None` until the clock has been set from NTP.
    pub taken_at: Option<DateTime<Utc>>,
}

/// A reading rendered for the sinks.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Report {
    pub temperature: f32,
    pub units: UnitSystem,
    pub battery_v: f32,
    pub time_synced: bool,
    pub timestamp_unix_s: Option<i64>,
    /// Local wall-clock time, e.g. `08:15 19.10.2026`.
    pub last_update: Option<String>,
    pub timezone: String,
}

impl Report {
    pub fn temperature_label(&self) -> String {
        format!("{:.2}{}", self.temperature, self.units.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_keeps_celsius() {
        assert_eq!(UnitSystem::Metric.from_celsius(27.5), 27.5);
        assert_eq!(UnitSystem::Metric.symbol(), "°C");
    }

    #[test]
    fn imperial_converts_to_fahrenheit() {
        assert_eq!(UnitSystem::Imperial.from_celsius(0.0), 32.0);
        assert_eq!(UnitSystem::Imperial.from_celsius(100.0), 212.0);
        let crossover = UnitSystem::Imperial.from_celsius(-40.0);
        assert!((crossover + 40.0).abs() < f32::EPSILON);
        assert_eq!(UnitSystem::Imperial.symbol(), "°F");
    }
}
