//! Configuration loader for the `citypulse` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.

use std::env;

use anyhow::{anyhow, Result};

use crate::models::ThresholdConfig;

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional float environment variable with a default value.
macro_rules! parse_env_f64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<f64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// TCP port the HTTP server binds to.
    pub port: u16,

    /// Readings older than this many days are evicted from the store.
    pub retention_days: u32,

    /// Hard cap on retained readings per city; bounds every query scan.
    pub max_readings_per_city: u32,

    /// Queue depth for each real-time subscriber; a full queue drops.
    pub subscriber_queue_capacity: u32,

    /// Global default alerting thresholds, used unless a user has set
    /// personal ones.
    pub default_thresholds: ThresholdConfig,
}

/// Load configuration from environment variables with defaults.
///
/// All variables are optional:
/// - `PORT` – HTTP listen port (default: 8080)
/// - `RETENTION_DAYS` – reading retention window (default: 30)
/// - `MAX_READINGS_PER_CITY` – per-city reading cap (default: 10000)
/// - `SUBSCRIBER_QUEUE_CAP` – per-subscriber push queue depth (default: 64)
/// - `AQI_ALERT_MAX` – default AQI alert threshold (default: 150)
/// - `CONGESTION_ALERT_MAX` – default congestion alert threshold (default: 75)
/// - `WATER_LEVEL_ALERT_MIN` – default water-level floor (default: 2.0)
///
/// Returns an error if any variable is present but unparseable.
pub fn load_from_env() -> Result<Config> {
    // ---
    let port = parse_env_u32!("PORT", 8080);
    let port = u16::try_from(port).map_err(|_| anyhow!("Invalid PORT: {} out of range", port))?;

    let retention_days = parse_env_u32!("RETENTION_DAYS", 30);
    let max_readings_per_city = parse_env_u32!("MAX_READINGS_PER_CITY", 10_000);
    let subscriber_queue_capacity = parse_env_u32!("SUBSCRIBER_QUEUE_CAP", 64);

    let default_thresholds = ThresholdConfig {
        air_quality_aqi_max: parse_env_f64!("AQI_ALERT_MAX", 150.0),
        traffic_congestion_max: parse_env_f64!("CONGESTION_ALERT_MAX", 75.0),
        water_level_min: parse_env_f64!("WATER_LEVEL_ALERT_MIN", 2.0),
    };

    Ok(Config {
        port,
        retention_days,
        max_readings_per_city,
        subscriber_queue_capacity,
        default_thresholds,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  PORT                  : {}", self.port);
        tracing::info!("  RETENTION_DAYS        : {}", self.retention_days);
        tracing::info!("  MAX_READINGS_PER_CITY : {}", self.max_readings_per_city);
        tracing::info!("  SUBSCRIBER_QUEUE_CAP  : {}", self.subscriber_queue_capacity);
        tracing::info!(
            "  AQI_ALERT_MAX         : {}",
            self.default_thresholds.air_quality_aqi_max
        );
        tracing::info!(
            "  CONGESTION_ALERT_MAX  : {}",
            self.default_thresholds.traffic_congestion_max
        );
        tracing::info!(
            "  WATER_LEVEL_ALERT_MIN : {}",
            self.default_thresholds.water_level_min
        );
    }
}

impl Default for Config {
    /// Built-in defaults, used by tests that bypass the environment.
    fn default() -> Self {
        Config {
            port: 8080,
            retention_days: 30,
            max_readings_per_city: 10_000,
            subscriber_queue_capacity: 64,
            default_thresholds: ThresholdConfig::default(),
        }
    }
}
