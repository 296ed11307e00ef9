//! Reading store: a bounded in-memory window of sensor readings per city.
//!
//! Readings accumulate; "latest" is derived by maximum timestamp, never by an
//! enforced single-current-reading rule. The source may emit out of order, so
//! the store inserts in timestamp order and tolerates arbitrary arrival order.
//! Retention (age window plus a per-city cap) bounds every scan, which is what
//! lets `nearby` and `historical` run without an explicit query timeout.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::{SensorReading, StoredReading};

/// Mean Earth radius in meters, for great-circle distance.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

// ---

pub struct ReadingStore {
    // ---
    /// Per-city readings, kept ascending by timestamp.
    by_city: RwLock<HashMap<String, Vec<Arc<StoredReading>>>>,
    retention: Duration,
    max_per_city: usize,
}

impl ReadingStore {
    pub fn new(retention_days: u32, max_per_city: u32) -> Self {
        // ---
        ReadingStore {
            by_city: RwLock::new(HashMap::new()),
            retention: Duration::days(i64::from(retention_days)),
            max_per_city: max_per_city as usize,
        }
    }

    /// Validate and append a reading, returning the stored copy with its id.
    ///
    /// Readings are immutable once stored. Appending also evicts entries that
    /// have aged out of the retention window or overflow the per-city cap
    /// (oldest first), so the window stays bounded without a sweeper task.
    pub async fn append(&self, reading: SensorReading) -> Result<Arc<StoredReading>> {
        // ---
        reading.validate()?;

        let stored = Arc::new(StoredReading {
            id: Uuid::new_v4(),
            reading,
        });

        let mut by_city = self.by_city.write().await;
        let entries = by_city
            .entry(stored.reading.city.clone())
            .or_insert_with(Vec::new);

        // Insert in timestamp order so reads never need to sort.
        let at = entries
            .partition_point(|r| r.reading.timestamp <= stored.reading.timestamp);
        entries.insert(at, Arc::clone(&stored));

        let cutoff = Utc::now() - self.retention;
        let expired = entries.partition_point(|r| r.reading.timestamp < cutoff);
        if expired > 0 {
            entries.drain(..expired);
        }
        if entries.len() > self.max_per_city {
            let excess = entries.len() - self.max_per_city;
            entries.drain(..excess);
        }

        tracing::debug!(
            city = %stored.reading.city,
            id = %stored.id,
            retained = entries.len(),
            "reading appended"
        );
        Ok(stored)
    }

    /// The reading with the maximum timestamp for `city`.
    pub async fn latest(&self, city: &str) -> Result<Arc<StoredReading>> {
        // ---
        let by_city = self.by_city.read().await;
        by_city
            .get(city)
            .and_then(|entries| entries.last())
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("no readings for city '{}'", city)))
    }

    /// Readings within `radius_m` great-circle meters of a point, newest
    /// first. The boundary is inclusive.
    pub async fn nearby(&self, lat: f64, lon: f64, radius_m: f64) -> Vec<Arc<StoredReading>> {
        // ---
        let by_city = self.by_city.read().await;
        let mut hits: Vec<Arc<StoredReading>> = by_city
            .values()
            .flatten()
            .filter(|r| {
                haversine_m(lat, lon, r.reading.latitude, r.reading.longitude) <= radius_m
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.reading.timestamp.cmp(&a.reading.timestamp));
        hits
    }

    /// Time series of one numeric field for a city, ascending by timestamp.
    ///
    /// `parameter` is a dotted path such as `airQuality.aqi`; `since` is a
    /// duration key (`24h`, `7d`, `30d`). Unknown paths or keys are
    /// validation errors; a city with no readings is `NotFound`.
    pub async fn historical(
        &self,
        city: &str,
        parameter: &str,
        since: &str,
    ) -> Result<Vec<(DateTime<Utc>, f64)>> {
        // ---
        let window = parse_duration_key(since)?;
        if !crate::models::NUMERIC_FIELD_PATHS.contains(&parameter) {
            return Err(CoreError::Validation(format!(
                "unknown parameter path '{}'",
                parameter
            )));
        }

        let by_city = self.by_city.read().await;
        let entries = by_city
            .get(city)
            .ok_or_else(|| CoreError::NotFound(format!("no readings for city '{}'", city)))?;

        let cutoff = Utc::now() - window;
        let start = entries.partition_point(|r| r.reading.timestamp < cutoff);

        let series: Vec<(DateTime<Utc>, f64)> = entries[start..]
            .iter()
            .filter_map(|r| Some((r.reading.timestamp, r.reading.field_value(parameter)?)))
            .collect();
        Ok(series)
    }

    /// Cities with at least one retained reading, for diagnostics.
    pub async fn city_count(&self) -> usize {
        // ---
        self.by_city.read().await.len()
    }
}

// ---

/// Map a supported duration key to a window. Extensible by adding arms.
fn parse_duration_key(key: &str) -> Result<Duration> {
    // ---
    match key {
        "24h" => Ok(Duration::hours(24)),
        "7d" => Ok(Duration::days(7)),
        "30d" => Ok(Duration::days(30)),
        other => Err(CoreError::Validation(format!(
            "unknown duration key '{}', expected one of 24h, 7d, 30d",
            other
        ))),
    }
}

/// Great-circle distance between two WGS84 points, in meters.
fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    // ---
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}
