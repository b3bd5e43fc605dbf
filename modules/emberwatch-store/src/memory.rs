//! In-memory store for tests and local runs. No database required.
//!
//! One lock guards everything, so the conditional primitives
//! (`insert_seed_batch`, `increment_zone_subscribers`, the conditional
//! status write) are atomic the same way the Postgres ones are. Shared
//! across simulated clients via `Arc` to exercise the concurrency
//! properties.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use emberwatch_common::{
    AlertZone, Comment, Incident, IncidentStatus, NewAlertZone, NewComment, NewIncident,
    NewSubscription, NewWeatherSample, SeedBatch, StoreError, Subscription, WeatherSample,
};

use crate::gateway::StoreGateway;

#[derive(Default)]
struct Inner {
    incidents: Vec<Incident>,
    comments: Vec<Comment>,
    zones: Vec<AlertZone>,
    subscriptions: Vec<Subscription>,
    weather: Vec<WeatherSample>,
    seed_markers: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline, every call fails `Transient`. Used to test that
    /// failures propagate instead of turning into empty results.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Transient("store offline".into()))
        } else {
            Ok(())
        }
    }

    fn next_id() -> String {
        Uuid::new_v4().to_string()
    }
}

fn build_incident(input: NewIncident) -> Incident {
    Incident {
        id: MemoryStore::next_id(),
        latitude: input.latitude,
        longitude: input.longitude,
        image_url: input.image_url,
        description: input.description,
        status: input.status.unwrap_or(IncidentStatus::Reported),
        severity: input.severity,
        reporter_id: input.reporter_id,
        timestamp: input.timestamp,
        verified_by: None,
        location_name: input.location_name,
        county: input.county,
    }
}

fn build_zone(input: NewAlertZone) -> AlertZone {
    AlertZone {
        id: MemoryStore::next_id(),
        name: input.name,
        county: input.county,
        polygon: input.polygon,
        risk_level: input.risk_level,
        active_alert: input.active_alert,
        last_updated: input.last_updated,
        subscriber_count: input.subscriber_count,
    }
}

fn build_weather_sample(input: NewWeatherSample) -> WeatherSample {
    WeatherSample {
        id: MemoryStore::next_id(),
        latitude: input.latitude,
        longitude: input.longitude,
        temperature: input.temperature,
        humidity: input.humidity,
        wind_speed: input.wind_speed,
        wind_direction: input.wind_direction,
        timestamp: input.timestamp,
        fire_risk_index: input.fire_risk_index,
        county: input.county,
    }
}

#[async_trait]
impl StoreGateway for MemoryStore {
    async fn list_incidents(&self, county: Option<&str>) -> Result<Vec<Incident>, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .incidents
            .iter()
            .filter(|i| county.is_none() || i.county.as_deref() == county)
            .cloned()
            .collect())
    }

    async fn get_incident(&self, id: &str) -> Result<Option<Incident>, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.incidents.iter().find(|i| i.id == id).cloned())
    }

    async fn create_incident(&self, input: NewIncident) -> Result<Incident, StoreError> {
        self.check_online()?;
        input.validate()?;
        let incident = build_incident(input);
        self.inner.lock().unwrap().incidents.push(incident.clone());
        Ok(incident)
    }

    async fn update_incident_status(
        &self,
        id: &str,
        expected: IncidentStatus,
        next: IncidentStatus,
    ) -> Result<Incident, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.lock().unwrap();
        let incident = inner
            .incidents
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::not_found("incident", id))?;
        if incident.status != expected {
            return Err(StoreError::Conflict(format!(
                "incident {id} status is {}, expected {expected}",
                incident.status
            )));
        }
        incident.status = next;
        Ok(incident.clone())
    }

    async fn list_comments(&self, incident_id: &str) -> Result<Vec<Comment>, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .comments
            .iter()
            .filter(|c| c.incident_id == incident_id)
            .cloned()
            .collect())
    }

    async fn create_comment(&self, input: NewComment) -> Result<Comment, StoreError> {
        self.check_online()?;
        input.validate()?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.incidents.iter().any(|i| i.id == input.incident_id) {
            return Err(StoreError::not_found("incident", input.incident_id));
        }
        let comment = Comment {
            id: Self::next_id(),
            content: input.content,
            timestamp: input.timestamp,
            user_id: input.user_id,
            user_name: input.user_name,
            incident_id: input.incident_id,
        };
        inner.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_alert_zones(&self) -> Result<Vec<AlertZone>, StoreError> {
        self.check_online()?;
        Ok(self.inner.lock().unwrap().zones.clone())
    }

    async fn get_alert_zone(&self, id: &str) -> Result<Option<AlertZone>, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.zones.iter().find(|z| z.id == id).cloned())
    }

    async fn create_alert_zone(&self, input: NewAlertZone) -> Result<AlertZone, StoreError> {
        self.check_online()?;
        input.validate()?;
        let zone = build_zone(input);
        self.inner.lock().unwrap().zones.push(zone.clone());
        Ok(zone)
    }

    async fn increment_zone_subscribers(&self, zone_id: &str) -> Result<AlertZone, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.lock().unwrap();
        let zone = inner
            .zones
            .iter_mut()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| StoreError::not_found("alert zone", zone_id))?;
        zone.subscriber_count += 1;
        zone.last_updated = Utc::now();
        Ok(zone.clone())
    }

    async fn list_subscriptions_for_zone(
        &self,
        zone_id: &str,
    ) -> Result<Vec<Subscription>, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .subscriptions
            .iter()
            .filter(|s| s.alert_zone_id == zone_id)
            .cloned()
            .collect())
    }

    async fn create_subscription(
        &self,
        input: NewSubscription,
    ) -> Result<Subscription, StoreError> {
        self.check_online()?;
        input.validate()?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.zones.iter().any(|z| z.id == input.alert_zone_id) {
            return Err(StoreError::not_found("alert zone", input.alert_zone_id));
        }
        let subscription = Subscription {
            id: Self::next_id(),
            user_id: input.user_id,
            alert_zone_id: input.alert_zone_id,
            preference: input.preference,
            created_at: input.created_at,
        };
        inner.subscriptions.push(subscription.clone());
        Ok(subscription)
    }

    async fn list_weather_samples(
        &self,
        county: Option<&str>,
    ) -> Result<Vec<WeatherSample>, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .weather
            .iter()
            .filter(|w| county.is_none() || w.county.as_deref() == county)
            .cloned()
            .collect())
    }

    async fn create_weather_sample(
        &self,
        input: NewWeatherSample,
    ) -> Result<WeatherSample, StoreError> {
        self.check_online()?;
        input.validate()?;
        let sample = build_weather_sample(input);
        self.inner.lock().unwrap().weather.push(sample.clone());
        Ok(sample)
    }

    async fn insert_seed_batch(
        &self,
        batch_id: &str,
        batch: SeedBatch,
    ) -> Result<bool, StoreError> {
        self.check_online()?;
        // Validate before touching state: a bad batch leaves no marker.
        batch.validate()?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.seed_markers.insert(batch_id.to_string()) {
            return Ok(false);
        }
        for input in batch.incidents {
            inner.incidents.push(build_incident(input));
        }
        for input in batch.zones {
            inner.zones.push(build_zone(input));
        }
        for input in batch.weather {
            inner.weather.push(build_weather_sample(input));
        }
        Ok(true)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use emberwatch_common::seed;

    fn incident_input() -> NewIncident {
        seed::seed_incidents().remove(0)
    }

    #[tokio::test]
    async fn create_assigns_id_and_defaults_status() {
        let store = MemoryStore::new();
        let mut input = incident_input();
        input.status = None;
        let created = store.create_incident(input).await.unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(created.status, IncidentStatus::Reported);
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let store = MemoryStore::new();
        for input in seed::seed_incidents() {
            store.create_incident(input).await.unwrap();
        }
        let all = store.list_incidents(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].county.as_deref(), Some("Los Angeles"));
        assert_eq!(all[1].county.as_deref(), Some("San Francisco"));
        assert_eq!(all[2].county.as_deref(), Some("Fresno"));
    }

    #[tokio::test]
    async fn conditional_status_write_detects_races() {
        let store = MemoryStore::new();
        let created = store.create_incident(incident_input()).await.unwrap();

        let updated = store
            .update_incident_status(&created.id, IncidentStatus::Reported, IncidentStatus::Verified)
            .await
            .unwrap();
        assert_eq!(updated.status, IncidentStatus::Verified);

        // Same expectation again: the stored status has moved on.
        let err = store
            .update_incident_status(&created.id, IncidentStatus::Reported, IncidentStatus::FalseAlarm)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let err = store
            .update_incident_status("no-such-id", IncidentStatus::Reported, IncidentStatus::Verified)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn seed_batch_inserted_exactly_once() {
        let store = MemoryStore::new();
        assert!(store
            .insert_seed_batch("seed-batch-v1", SeedBatch::baseline())
            .await
            .unwrap());
        assert!(!store
            .insert_seed_batch("seed-batch-v1", SeedBatch::baseline())
            .await
            .unwrap());
        assert_eq!(store.list_incidents(None).await.unwrap().len(), 3);
        assert_eq!(store.list_alert_zones().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejected_seed_batch_leaves_no_marker() {
        let store = MemoryStore::new();
        let mut batch = SeedBatch::baseline();
        batch.incidents[0].latitude = 999.0;

        let err = store
            .insert_seed_batch("seed-batch-v1", batch)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.list_incidents(None).await.unwrap().is_empty());

        // The failed attempt did not claim the batch id; a clean retry
        // still gets to insert.
        assert!(store
            .insert_seed_batch("seed-batch-v1", SeedBatch::baseline())
            .await
            .unwrap());
        assert_eq!(store.list_incidents(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn offline_store_fails_transient_not_empty() {
        let store = MemoryStore::new();
        store.create_incident(incident_input()).await.unwrap();
        store.set_offline(true);
        let err = store.list_incidents(None).await.unwrap_err();
        assert!(err.is_transient());
        store.set_offline(false);
        assert_eq!(store.list_incidents(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn subscription_requires_existing_zone() {
        let store = MemoryStore::new();
        let input = NewSubscription {
            user_id: "u1".into(),
            alert_zone_id: "ghost".into(),
            preference: emberwatch_common::NotificationPreference::Email,
            created_at: Utc::now(),
        };
        let err = store.create_subscription(input).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
