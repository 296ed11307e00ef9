//! Data models for the city alerting pipeline.
//!
//! Readings and alerts are immutable once created; the only mutable field in
//! the whole model is the per-recipient `read` flag on an inbox entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

// ---

/// One environmental sensor reading for a city, as submitted by ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    // ---
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub air_quality: AirQuality,
    pub weather: Weather,
    pub traffic: Traffic,
    pub water_level: WaterLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQuality {
    // ---
    pub aqi: f64,
    pub pm25: f64,
    pub pm10: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    // ---
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub precipitation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traffic {
    // ---
    pub congestion_level: f64,
    pub average_speed: f64,
    pub incident_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterLevel {
    // ---
    pub level: f64,
    pub status: WaterStatus,
}

/// Categorical water-level status reported by the gauge itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterStatus {
    Normal,
    Warning,
    Critical,
}

/// Every queryable dotted field path, mirroring [`SensorReading::numeric_fields`].
pub const NUMERIC_FIELD_PATHS: &[&str] = &[
    "airQuality.aqi",
    "airQuality.pm25",
    "airQuality.pm10",
    "airQuality.no2",
    "airQuality.so2",
    "airQuality.co",
    "weather.temperature",
    "weather.humidity",
    "weather.windSpeed",
    "weather.windDirection",
    "weather.precipitation",
    "traffic.congestionLevel",
    "traffic.averageSpeed",
    "traffic.incidentCount",
    "waterLevel.level",
];

impl SensorReading {
    /// Validate a reading at the ingestion boundary.
    ///
    /// Rejects an empty city, coordinates outside WGS84 bounds, and any
    /// non-finite numeric measurement. Readings that pass are stored as-is.
    pub fn validate(&self) -> Result<()> {
        // ---
        if self.city.trim().is_empty() {
            return Err(CoreError::Validation("city must not be empty".into()));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CoreError::Validation(format!(
                "latitude {} out of range [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(CoreError::Validation(format!(
                "longitude {} out of range [-180, 180]",
                self.longitude
            )));
        }
        for (name, value) in self.numeric_fields() {
            if !value.is_finite() {
                return Err(CoreError::Validation(format!(
                    "field '{}' must be finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// All dotted numeric field paths and their values, in declaration order.
    ///
    /// Single source of truth for `historical` parameter paths, so validation
    /// and query resolution cannot drift apart.
    pub fn numeric_fields(&self) -> Vec<(&'static str, f64)> {
        // ---
        vec![
            ("airQuality.aqi", self.air_quality.aqi),
            ("airQuality.pm25", self.air_quality.pm25),
            ("airQuality.pm10", self.air_quality.pm10),
            ("airQuality.no2", self.air_quality.no2),
            ("airQuality.so2", self.air_quality.so2),
            ("airQuality.co", self.air_quality.co),
            ("weather.temperature", self.weather.temperature),
            ("weather.humidity", self.weather.humidity),
            ("weather.windSpeed", self.weather.wind_speed),
            ("weather.windDirection", self.weather.wind_direction),
            ("weather.precipitation", self.weather.precipitation),
            ("traffic.congestionLevel", self.traffic.congestion_level),
            ("traffic.averageSpeed", self.traffic.average_speed),
            ("traffic.incidentCount", f64::from(self.traffic.incident_count)),
            ("waterLevel.level", self.water_level.level),
        ]
    }

    /// Look up a single numeric field by its dotted path.
    pub fn field_value(&self, path: &str) -> Option<f64> {
        // ---
        self.numeric_fields()
            .into_iter()
            .find(|(name, _)| *name == path)
            .map(|(_, value)| value)
    }
}

/// A validated reading after `append`, with its assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReading {
    // ---
    pub id: Uuid,
    #[serde(flatten)]
    pub reading: SensorReading,
}

// ---

/// Alert taxonomy. The fixed variants cover the automatic rules and common
/// administrative categories; anything else round-trips as free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertType {
    AirQuality,
    Traffic,
    WaterLevel,
    Energy,
    General,
    Custom(String),
}

impl From<String> for AlertType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "AirQuality" => AlertType::AirQuality,
            "Traffic" => AlertType::Traffic,
            "WaterLevel" => AlertType::WaterLevel,
            "Energy" => AlertType::Energy,
            "General" => AlertType::General,
            _ => AlertType::Custom(value),
        }
    }
}

impl From<AlertType> for String {
    fn from(value: AlertType) -> Self {
        match value {
            AlertType::AirQuality => "AirQuality".to_string(),
            AlertType::Traffic => "Traffic".to_string(),
            AlertType::WaterLevel => "WaterLevel".to_string(),
            AlertType::Energy => "Energy".to_string(),
            AlertType::General => "General".to_string(),
            AlertType::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from(self.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    High,
    Critical,
}

/// One alert, either derived from a threshold breach or authored by an
/// administrator. Immutable after creation; fan-out into inboxes copies the
/// content per recipient rather than sharing this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    // ---
    pub id: Uuid,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// `None` means broadcast to all cities.
    pub origin_city: Option<String>,
    /// Weak back-reference to the triggering reading, if any.
    pub source_reading_id: Option<Uuid>,
}

impl AlertEvent {
    /// Build a manually authored alert. This is the only alert constructor
    /// that bypasses the threshold evaluator.
    pub fn manual(
        alert_type: AlertType,
        severity: Severity,
        message: String,
        origin_city: Option<String>,
    ) -> Self {
        // ---
        AlertEvent {
            id: Uuid::new_v4(),
            alert_type,
            severity,
            message,
            timestamp: Utc::now(),
            origin_city,
            source_reading_id: None,
        }
    }
}

// ---

/// Per-user (or global default) alerting thresholds.
///
/// `water_level_min` is carried for personalized configs; the automatic water
/// rule itself is categorical on the gauge status, not numeric.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    // ---
    pub air_quality_aqi_max: f64,
    pub traffic_congestion_max: f64,
    pub water_level_min: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            air_quality_aqi_max: 150.0,
            traffic_congestion_max: 75.0,
            water_level_min: 2.0,
        }
    }
}
