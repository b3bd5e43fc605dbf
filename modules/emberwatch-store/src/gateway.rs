//! The store contract.
//!
//! One trait covers all five record kinds: list (insertion order by
//! creation, optionally county-filtered), create, and the two update
//! shapes that exist (incident status, zone subscriber count). Every
//! method returns a typed `StoreError` — a backend failure is never
//! collapsed into an empty result set.
//!
//! Two primitives carry the concurrency guarantees the sync layer
//! builds on:
//!
//! - `insert_seed_batch` claims a batch id and writes the batch in one
//!   atomic step: exactly one of N concurrent callers gets `true`, and
//!   a failed attempt leaves neither marker nor records behind.
//! - `increment_zone_subscribers` bumps the counter server-side,
//!   atomically. Clients never read-modify-write the count.

use std::sync::Arc;

use async_trait::async_trait;

use emberwatch_common::{
    AlertZone, Comment, Incident, IncidentStatus, NewAlertZone, NewComment, NewIncident,
    NewSubscription, NewWeatherSample, SeedBatch, StoreError, Subscription, WeatherSample,
};

/// Implemented by PgStore (production) and MemoryStore (tests).
#[async_trait]
pub trait StoreGateway: Send + Sync {
    // --- Incidents ---

    /// All incidents in creation order, or only those whose county
    /// exactly equals `county` (no normalization, no partial match).
    async fn list_incidents(&self, county: Option<&str>) -> Result<Vec<Incident>, StoreError>;

    async fn get_incident(&self, id: &str) -> Result<Option<Incident>, StoreError>;

    /// Create with store-assigned id. Status defaults to `Reported`
    /// when the input leaves it unset.
    async fn create_incident(&self, input: NewIncident) -> Result<Incident, StoreError>;

    /// Conditional status write: succeeds only while the stored status
    /// still equals `expected`. `Conflict` when another writer got
    /// there first, `NotFound` for an unknown id. Transition legality
    /// is the caller's concern.
    async fn update_incident_status(
        &self,
        id: &str,
        expected: IncidentStatus,
        next: IncidentStatus,
    ) -> Result<Incident, StoreError>;

    // --- Comments ---

    async fn list_comments(&self, incident_id: &str) -> Result<Vec<Comment>, StoreError>;

    async fn create_comment(&self, input: NewComment) -> Result<Comment, StoreError>;

    // --- Alert zones ---

    async fn list_alert_zones(&self) -> Result<Vec<AlertZone>, StoreError>;

    async fn get_alert_zone(&self, id: &str) -> Result<Option<AlertZone>, StoreError>;

    async fn create_alert_zone(&self, input: NewAlertZone) -> Result<AlertZone, StoreError>;

    /// Atomic `count + 1` keyed by zone id. Returns the updated zone.
    async fn increment_zone_subscribers(&self, zone_id: &str) -> Result<AlertZone, StoreError>;

    // --- Subscriptions (append-only) ---

    async fn list_subscriptions_for_zone(
        &self,
        zone_id: &str,
    ) -> Result<Vec<Subscription>, StoreError>;

    /// `NotFound` when the referenced zone does not exist.
    async fn create_subscription(
        &self,
        input: NewSubscription,
    ) -> Result<Subscription, StoreError>;

    // --- Weather samples ---

    async fn list_weather_samples(
        &self,
        county: Option<&str>,
    ) -> Result<Vec<WeatherSample>, StoreError>;

    async fn create_weather_sample(
        &self,
        input: NewWeatherSample,
    ) -> Result<WeatherSample, StoreError>;

    // --- Bootstrap ---

    /// Claim `batch_id` and insert the batch, atomically. `true`
    /// exactly once per batch id across all concurrent callers; `false`
    /// means someone else already claimed it. On `Err` nothing was
    /// written, so a later retry starts clean.
    async fn insert_seed_batch(
        &self,
        batch_id: &str,
        batch: SeedBatch,
    ) -> Result<bool, StoreError>;
}

// ---------------------------------------------------------------------------
// Arc<G> blanket — lets tests share one store across simulated clients
// ---------------------------------------------------------------------------

#[async_trait]
impl<G: StoreGateway + ?Sized> StoreGateway for Arc<G> {
    async fn list_incidents(&self, county: Option<&str>) -> Result<Vec<Incident>, StoreError> {
        (**self).list_incidents(county).await
    }

    async fn get_incident(&self, id: &str) -> Result<Option<Incident>, StoreError> {
        (**self).get_incident(id).await
    }

    async fn create_incident(&self, input: NewIncident) -> Result<Incident, StoreError> {
        (**self).create_incident(input).await
    }

    async fn update_incident_status(
        &self,
        id: &str,
        expected: IncidentStatus,
        next: IncidentStatus,
    ) -> Result<Incident, StoreError> {
        (**self).update_incident_status(id, expected, next).await
    }

    async fn list_comments(&self, incident_id: &str) -> Result<Vec<Comment>, StoreError> {
        (**self).list_comments(incident_id).await
    }

    async fn create_comment(&self, input: NewComment) -> Result<Comment, StoreError> {
        (**self).create_comment(input).await
    }

    async fn list_alert_zones(&self) -> Result<Vec<AlertZone>, StoreError> {
        (**self).list_alert_zones().await
    }

    async fn get_alert_zone(&self, id: &str) -> Result<Option<AlertZone>, StoreError> {
        (**self).get_alert_zone(id).await
    }

    async fn create_alert_zone(&self, input: NewAlertZone) -> Result<AlertZone, StoreError> {
        (**self).create_alert_zone(input).await
    }

    async fn increment_zone_subscribers(&self, zone_id: &str) -> Result<AlertZone, StoreError> {
        (**self).increment_zone_subscribers(zone_id).await
    }

    async fn list_subscriptions_for_zone(
        &self,
        zone_id: &str,
    ) -> Result<Vec<Subscription>, StoreError> {
        (**self).list_subscriptions_for_zone(zone_id).await
    }

    async fn create_subscription(
        &self,
        input: NewSubscription,
    ) -> Result<Subscription, StoreError> {
        (**self).create_subscription(input).await
    }

    async fn list_weather_samples(
        &self,
        county: Option<&str>,
    ) -> Result<Vec<WeatherSample>, StoreError> {
        (**self).list_weather_samples(county).await
    }

    async fn create_weather_sample(
        &self,
        input: NewWeatherSample,
    ) -> Result<WeatherSample, StoreError> {
        (**self).create_weather_sample(input).await
    }

    async fn insert_seed_batch(
        &self,
        batch_id: &str,
        batch: SeedBatch,
    ) -> Result<bool, StoreError> {
        (**self).insert_seed_batch(batch_id, batch).await
    }
}
