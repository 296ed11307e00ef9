//! Threshold evaluation: map one reading to zero or more derived alerts.
//!
//! `evaluate` is a pure function. The same reading and thresholds always
//! yield the same alert set; it performs no dedup, so callers that re-run
//! evaluation own any cooldown logic.

use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    AlertEvent, AlertType, SensorReading, Severity, ThresholdConfig, WaterStatus,
};

// ---

/// Evaluate a reading against a threshold set.
///
/// The default rule set yields at most three alerts:
/// - AQI above `air_quality_aqi_max` → `AirQuality` / High
/// - congestion above `traffic_congestion_max` → `Traffic` / High
/// - water status `Critical` → `WaterLevel` / Critical (categorical)
///
/// Energy figures are informational only and never evaluated.
pub fn evaluate(reading: &SensorReading, thresholds: &ThresholdConfig) -> Vec<AlertEvent> {
    // ---
    let mut alerts = Vec::new();

    if reading.air_quality.aqi > thresholds.air_quality_aqi_max {
        alerts.push(derived(
            reading,
            AlertType::AirQuality,
            Severity::High,
            format!(
                "Air quality alert in {}: AQI {} exceeds {}",
                reading.city, reading.air_quality.aqi, thresholds.air_quality_aqi_max
            ),
        ));
    }

    if reading.traffic.congestion_level > thresholds.traffic_congestion_max {
        alerts.push(derived(
            reading,
            AlertType::Traffic,
            Severity::High,
            format!(
                "Traffic alert in {}: congestion {} exceeds {}",
                reading.city, reading.traffic.congestion_level, thresholds.traffic_congestion_max
            ),
        ));
    }

    if reading.water_level.status == WaterStatus::Critical {
        alerts.push(derived(
            reading,
            AlertType::WaterLevel,
            Severity::Critical,
            format!(
                "Water level CRITICAL in {}: level {}",
                reading.city, reading.water_level.level
            ),
        ));
    }

    alerts
}

fn derived(
    reading: &SensorReading,
    alert_type: AlertType,
    severity: Severity,
    message: String,
) -> AlertEvent {
    // ---
    AlertEvent {
        id: Uuid::new_v4(),
        alert_type,
        severity,
        message,
        timestamp: Utc::now(),
        origin_city: Some(reading.city.clone()),
        // Filled in by the pipeline once the reading has a stored id.
        source_reading_id: None,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::tests::test_reading;

    fn defaults() -> ThresholdConfig {
        ThresholdConfig::default()
    }

    #[test]
    fn quiet_reading_produces_no_alerts() {
        // ---
        let reading = test_reading("Mumbai");
        assert!(evaluate(&reading, &defaults()).is_empty());
    }

    #[test]
    fn thresholds_are_exclusive_at_the_boundary() {
        // ---
        let mut reading = test_reading("Mumbai");
        reading.air_quality.aqi = 150.0;
        reading.traffic.congestion_level = 75.0;
        assert!(evaluate(&reading, &defaults()).is_empty());
    }

    #[test]
    fn aqi_breach_names_value_and_city() {
        // ---
        let mut reading = test_reading("Delhi");
        reading.air_quality.aqi = 151.0;

        let alerts = evaluate(&reading, &defaults());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::AirQuality);
        assert_eq!(alerts[0].severity, Severity::High);
        assert!(alerts[0].message.contains("151"));
        assert!(alerts[0].message.contains("Delhi"));
        assert_eq!(alerts[0].origin_city.as_deref(), Some("Delhi"));
    }

    #[test]
    fn congestion_breach_fires_traffic_alert() {
        // ---
        let mut reading = test_reading("Mumbai");
        reading.traffic.congestion_level = 80.0;

        let alerts = evaluate(&reading, &defaults());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Traffic);
        assert_eq!(alerts[0].severity, Severity::High);
    }

    #[test]
    fn critical_water_status_fires_regardless_of_level() {
        // ---
        let mut reading = test_reading("Chennai");
        reading.water_level.status = WaterStatus::Critical;
        reading.water_level.level = 10.0;

        let alerts = evaluate(&reading, &defaults());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::WaterLevel);
        assert_eq!(alerts[0].severity, Severity::Critical);

        // Warning status does not fire.
        reading.water_level.status = WaterStatus::Warning;
        assert!(evaluate(&reading, &defaults()).is_empty());
    }

    #[test]
    fn all_three_rules_can_fire_together() {
        // ---
        let mut reading = test_reading("Kolkata");
        reading.air_quality.aqi = 200.0;
        reading.traffic.congestion_level = 90.0;
        reading.water_level.status = WaterStatus::Critical;

        let alerts = evaluate(&reading, &defaults());
        assert_eq!(alerts.len(), 3);
    }

    #[test]
    fn personalized_thresholds_change_the_outcome() {
        // ---
        let mut reading = test_reading("Mumbai");
        reading.air_quality.aqi = 120.0;

        assert!(evaluate(&reading, &defaults()).is_empty());

        let strict = ThresholdConfig {
            air_quality_aqi_max: 100.0,
            ..ThresholdConfig::default()
        };
        let alerts = evaluate(&reading, &strict);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::AirQuality);
    }

    #[test]
    fn evaluation_is_deterministic() {
        // ---
        let mut reading = test_reading("Mumbai");
        reading.traffic.congestion_level = 80.0;

        let first = evaluate(&reading, &defaults());
        let second = evaluate(&reading, &defaults());
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].message, second[0].message);
        assert_eq!(first[0].alert_type, second[0].alert_type);
    }
}
