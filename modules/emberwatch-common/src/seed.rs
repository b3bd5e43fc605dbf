//! The fixed baseline batch: 3 incidents, 2 alert zones, 2 weather
//! samples. Inserted at most once per store, no matter how many clients
//! race the bootstrap (the marker id below is the idempotency key).

use chrono::{Duration, Utc};
use serde_json::json;

use crate::error::StoreError;
use crate::types::{
    IncidentStatus, NewAlertZone, NewIncident, NewWeatherSample, RiskLevel,
};

/// Idempotency key for the baseline batch. The marker row and the batch
/// records are written together in one atomic store operation; bump the
/// suffix if the batch contents ever change.
pub const SEED_BATCH_ID: &str = "seed-batch-v1";

/// A batch of records inserted as a unit during bootstrap. The store
/// writes all of it or none of it, so a failed attempt never strands
/// the marker with a partial batch.
#[derive(Debug, Clone)]
pub struct SeedBatch {
    pub incidents: Vec<NewIncident>,
    pub zones: Vec<NewAlertZone>,
    pub weather: Vec<NewWeatherSample>,
}

impl SeedBatch {
    pub fn baseline() -> Self {
        Self {
            incidents: seed_incidents(),
            zones: seed_alert_zones(),
            weather: seed_weather_samples(),
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        for incident in &self.incidents {
            incident.validate()?;
        }
        for zone in &self.zones {
            zone.validate()?;
        }
        for sample in &self.weather {
            sample.validate()?;
        }
        Ok(())
    }
}

pub fn seed_incidents() -> Vec<NewIncident> {
    let now = Utc::now();
    vec![
        NewIncident {
            latitude: 34.0522,
            longitude: -118.2437,
            image_url: None,
            description: Some("Smoke visible from hillside".into()),
            status: Some(IncidentStatus::Reported),
            severity: Some(2),
            reporter_id: "user1".into(),
            timestamp: now,
            location_name: Some("Griffith Park".into()),
            county: Some("Los Angeles".into()),
        },
        NewIncident {
            latitude: 37.7749,
            longitude: -122.4194,
            image_url: None,
            description: Some("Small brush fire near hiking trail".into()),
            status: Some(IncidentStatus::Verified),
            severity: Some(3),
            reporter_id: "user2".into(),
            timestamp: now - Duration::hours(1),
            location_name: Some("Twin Peaks".into()),
            county: Some("San Francisco".into()),
        },
        NewIncident {
            latitude: 36.7783,
            longitude: -119.4179,
            image_url: None,
            description: Some("Lightning strike caused small fire".into()),
            status: Some(IncidentStatus::Contained),
            severity: Some(1),
            reporter_id: "user3".into(),
            timestamp: now - Duration::hours(2),
            location_name: Some("Sierra National Forest".into()),
            county: Some("Fresno".into()),
        },
    ]
}

pub fn seed_alert_zones() -> Vec<NewAlertZone> {
    let now = Utc::now();
    vec![
        NewAlertZone {
            name: "Los Angeles County High Risk Zone".into(),
            county: "Los Angeles".into(),
            polygon: json!({
                "type": "Polygon",
                "coordinates": [[
                    [-118.5, 34.0],
                    [-118.2, 34.0],
                    [-118.2, 34.3],
                    [-118.5, 34.3],
                    [-118.5, 34.0]
                ]]
            })
            .to_string(),
            risk_level: RiskLevel::High,
            active_alert: true,
            last_updated: now,
            subscriber_count: 1245,
        },
        NewAlertZone {
            name: "San Francisco Bay Area".into(),
            county: "San Francisco".into(),
            polygon: json!({
                "type": "Polygon",
                "coordinates": [[
                    [-122.5, 37.7],
                    [-122.3, 37.7],
                    [-122.3, 37.9],
                    [-122.5, 37.9],
                    [-122.5, 37.7]
                ]]
            })
            .to_string(),
            risk_level: RiskLevel::Moderate,
            active_alert: false,
            last_updated: now,
            subscriber_count: 987,
        },
    ]
}

pub fn seed_weather_samples() -> Vec<NewWeatherSample> {
    let now = Utc::now();
    vec![
        NewWeatherSample {
            latitude: 34.0522,
            longitude: -118.2437,
            temperature: Some(85.4),
            humidity: Some(15.2),
            wind_speed: Some(12.5),
            wind_direction: Some(270.0),
            timestamp: now,
            fire_risk_index: Some(0.78),
            county: Some("Los Angeles".into()),
        },
        NewWeatherSample {
            latitude: 37.7749,
            longitude: -122.4194,
            temperature: Some(68.2),
            humidity: Some(42.5),
            wind_speed: Some(8.3),
            wind_direction: Some(225.0),
            timestamp: now,
            fire_risk_index: Some(0.45),
            county: Some("San Francisco".into()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_batch_passes_its_own_validation() {
        for incident in seed_incidents() {
            incident.validate().unwrap();
        }
        for zone in seed_alert_zones() {
            zone.validate().unwrap();
        }
        for sample in seed_weather_samples() {
            sample.validate().unwrap();
        }
    }
}
