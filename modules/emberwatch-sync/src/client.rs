//! The per-session facade the UI layer consumes.
//!
//! One `SessionClient` per client session (tab, device). It owns the
//! session caches and the seed flag, and turns UI intents into store
//! calls plus reconciliation. Every operation returns data or a typed
//! `StoreError` — nothing throws past this boundary, and failure is
//! never reported as empty data.
//!
//! Lock discipline: cache locks are taken before and after a store
//! call, never across one. The generation token captured before the
//! call decides whether the result may still touch the view.

use std::sync::Mutex;

use tracing::debug;

use emberwatch_common::{
    AlertZone, Comment, Incident, IncidentStatus, NewComment, NewIncident, NotificationPreference,
    StoreError, Subscription, WeatherSample,
};
use emberwatch_store::StoreGateway;

use crate::effector;
use crate::queries;
use crate::reconcile::SessionCache;
use crate::seeder::{SeedOutcome, Seeder};

pub struct SessionClient<G> {
    store: G,
    seeder: Seeder,
    incidents: Mutex<SessionCache<Incident>>,
    zones: Mutex<SessionCache<AlertZone>>,
    weather: Mutex<SessionCache<WeatherSample>>,
}

impl<G: StoreGateway> SessionClient<G> {
    pub fn new(store: G) -> Self {
        Self {
            store,
            seeder: Seeder::new(),
            incidents: Mutex::new(SessionCache::new()),
            zones: Mutex::new(SessionCache::new()),
            weather: Mutex::new(SessionCache::new()),
        }
    }

    /// Bootstrap the shared store on first use. Safe to call from any
    /// number of sessions concurrently; at most one inserts the batch.
    pub async fn seed_if_empty(&self) -> Result<SeedOutcome, StoreError> {
        self.seeder.seed_if_empty(&self.store).await
    }

    // --- Incidents ---

    /// Full (or county-filtered) fetch. The result becomes the
    /// session's incident view unless a newer list or teardown
    /// superseded this one while it was in flight.
    pub async fn list_incidents(
        &self,
        county: Option<&str>,
    ) -> Result<Vec<Incident>, StoreError> {
        let token = self.incidents.lock().unwrap().begin_list();
        let records = self.store.list_incidents(county).await?;
        let installed = self
            .incidents
            .lock()
            .unwrap()
            .install(token, records.clone());
        if !installed {
            debug!("incident list result superseded, discarded");
        }
        Ok(records)
    }

    /// Validate, create with status defaulted to `Reported`, and
    /// reconcile into the session view.
    pub async fn report_incident(&self, input: NewIncident) -> Result<Incident, StoreError> {
        input.validate()?;
        let token = self.incidents.lock().unwrap().token();
        let created = self.store.create_incident(input).await?;
        self.incidents
            .lock()
            .unwrap()
            .apply_create(token, created.clone());
        Ok(created)
    }

    /// Enforce the transition table, then write conditionally so a
    /// concurrent writer surfaces as `Conflict` instead of being
    /// silently overwritten.
    pub async fn update_incident_status(
        &self,
        id: &str,
        next: IncidentStatus,
    ) -> Result<Incident, StoreError> {
        let cached = self
            .incidents
            .lock()
            .unwrap()
            .get(id)
            .map(|i| i.status);
        let current = match cached {
            Some(status) => status,
            None => self
                .store
                .get_incident(id)
                .await?
                .ok_or_else(|| StoreError::not_found("incident", id))?
                .status,
        };

        if !current.can_transition_to(next) {
            return Err(StoreError::Validation(format!(
                "illegal status transition: {current} -> {next}"
            )));
        }

        let token = self.incidents.lock().unwrap().token();
        let updated = self
            .store
            .update_incident_status(id, current, next)
            .await?;
        self.incidents
            .lock()
            .unwrap()
            .apply_update(token, updated.clone());
        Ok(updated)
    }

    /// The session's current incident view (cache contents).
    pub fn cached_incidents(&self) -> Vec<Incident> {
        self.incidents.lock().unwrap().records().to_vec()
    }

    /// County-filter the session's incident view without a refetch.
    /// Exact match only, order preserved.
    pub fn cached_incidents_in_county(&self, county: Option<&str>) -> Vec<Incident> {
        let cache = self.incidents.lock().unwrap();
        queries::filter_by_county(cache.records(), county)
            .into_iter()
            .cloned()
            .collect()
    }

    // --- Comments ---

    pub async fn list_comments(&self, incident_id: &str) -> Result<Vec<Comment>, StoreError> {
        self.store.list_comments(incident_id).await
    }

    pub async fn add_comment(&self, input: NewComment) -> Result<Comment, StoreError> {
        input.validate()?;
        self.store.create_comment(input).await
    }

    // --- Alert zones & subscriptions ---

    pub async fn list_alert_zones(&self) -> Result<Vec<AlertZone>, StoreError> {
        let token = self.zones.lock().unwrap().begin_list();
        let records = self.store.list_alert_zones().await?;
        self.zones.lock().unwrap().install(token, records.clone());
        Ok(records)
    }

    /// Record a subscription and bump the zone counter atomically at
    /// the store. The updated zone is reconciled into the session view.
    pub async fn subscribe_to_zone(
        &self,
        user_id: &str,
        zone_id: &str,
        preference: NotificationPreference,
    ) -> Result<(Subscription, AlertZone), StoreError> {
        let token = self.zones.lock().unwrap().token();
        let (subscription, zone) =
            effector::subscribe_to_zone(&self.store, user_id, zone_id, preference).await?;
        self.zones
            .lock()
            .unwrap()
            .apply_update(token, zone.clone());
        Ok((subscription, zone))
    }

    /// Subscriber count computed from the Subscription rows; correct
    /// even when a stored counter lags an interrupted subscribe.
    pub async fn derived_subscriber_count(&self, zone_id: &str) -> Result<i64, StoreError> {
        effector::derived_subscriber_count(&self.store, zone_id).await
    }

    pub fn cached_alert_zones(&self) -> Vec<AlertZone> {
        self.zones.lock().unwrap().records().to_vec()
    }

    // --- Weather ---

    pub async fn list_weather_samples(
        &self,
        county: Option<&str>,
    ) -> Result<Vec<WeatherSample>, StoreError> {
        let token = self.weather.lock().unwrap().begin_list();
        let records = self.store.list_weather_samples(county).await?;
        self.weather.lock().unwrap().install(token, records.clone());
        Ok(records)
    }

    /// County-filter the session's weather view without a refetch.
    pub fn cached_weather_in_county(&self, county: Option<&str>) -> Vec<WeatherSample> {
        let cache = self.weather.lock().unwrap();
        queries::filter_by_county(cache.records(), county)
            .into_iter()
            .cloned()
            .collect()
    }

    // --- View lifecycle ---

    /// Tear down the current view: drop all caches and supersede any
    /// in-flight reads and un-landed mutation side effects.
    pub fn end_view(&self) {
        self.incidents.lock().unwrap().invalidate();
        self.zones.lock().unwrap().invalidate();
        self.weather.lock().unwrap().invalidate();
    }
}
