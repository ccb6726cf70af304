//! Forecasts read from a local JSON file.
//!
//! The file holds an array of `{date, slot, temperature, condition}`
//! objects, typically refreshed by a cron job that queries a weather API.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use court_core::{Slot, Weather, WeatherProvider};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ForecastLine {
    date: NaiveDate,
    slot: Slot,
    temperature: f64,
    condition: String,
}

/// Forecasts keyed by date and slot.
#[derive(Debug, Default)]
pub struct FileWeather {
    forecasts: HashMap<(NaiveDate, Slot), Weather>,
}

impl FileWeather {
    /// Loads forecasts from `path`.
    ///
    /// A missing or malformed file yields an empty provider.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "weather file unreadable");
                return Self::default();
            }
        };
        match Self::parse(&content) {
            Ok(weather) => {
                tracing::debug!(count = weather.forecasts.len(), "loaded forecasts");
                weather
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "weather file malformed");
                Self::default()
            }
        }
    }

    fn parse(content: &str) -> Result<Self, serde_json::Error> {
        let lines: Vec<ForecastLine> = serde_json::from_str(content)?;
        let forecasts = lines
            .into_iter()
            .map(|line| {
                (
                    (line.date, line.slot),
                    Weather {
                        temperature: line.temperature,
                        condition: line.condition,
                    },
                )
            })
            .collect();
        Ok(Self { forecasts })
    }

    pub fn len(&self) -> usize {
        self.forecasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forecasts.is_empty()
    }
}

impl WeatherProvider for FileWeather {
    fn forecast(&self, date: NaiveDate, slot: Slot) -> Option<Weather> {
        self.forecasts.get(&(date, slot)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_forecasts_by_date_and_slot() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("weather.json");
        std::fs::write(
            &path,
            r#"[
                {"date": "2026-03-02", "slot": "09:00", "temperature": 21.5, "condition": "sunny"},
                {"date": "2026-03-02", "slot": "10:00", "temperature": 23.0, "condition": "cloudy"}
            ]"#,
        )
        .unwrap();

        let weather = FileWeather::load(&path);
        assert_eq!(weather.len(), 2);

        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let nine = weather.forecast(date, "09:00".parse().unwrap()).unwrap();
        assert_eq!(nine.condition, "sunny");
        assert!(weather.forecast(date, "11:00".parse().unwrap()).is_none());
    }

    #[test]
    fn test_missing_or_malformed_file_yields_no_data() {
        let temp = tempfile::tempdir().unwrap();
        assert!(FileWeather::load(&temp.path().join("absent.json")).is_empty());

        let path = temp.path().join("weather.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(FileWeather::load(&path).is_empty());
    }
}
