//! Domain records and wire enums.
//!
//! Field names and enum values mirror the shared store's schema: enums
//! travel as SCREAMING_SNAKE strings, timestamps as ISO-8601, zone
//! boundaries as GeoJSON-encoded strings. Ids are opaque strings the
//! store assigns at creation.

use chrono::{DateTime, Utc};
use geojson::{GeoJson, Geometry, Value as GeoValue};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Reported,
    Verified,
    FalseAlarm,
    Contained,
    Extinguished,
}

impl IncidentStatus {
    /// The legal transition graph. `Reported` is the creation state;
    /// `FalseAlarm` and `Extinguished` are terminal. Writing the
    /// current status back is not a transition and is rejected.
    pub fn can_transition_to(self, next: IncidentStatus) -> bool {
        use IncidentStatus::*;
        matches!(
            (self, next),
            (Reported, Verified)
                | (Reported, FalseAlarm)
                | (Verified, Contained)
                | (Verified, Extinguished)
                | (Contained, Extinguished)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Reported => "REPORTED",
            IncidentStatus::Verified => "VERIFIED",
            IncidentStatus::FalseAlarm => "FALSE_ALARM",
            IncidentStatus::Contained => "CONTAINED",
            IncidentStatus::Extinguished => "EXTINGUISHED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "REPORTED" => Ok(IncidentStatus::Reported),
            "VERIFIED" => Ok(IncidentStatus::Verified),
            "FALSE_ALARM" => Ok(IncidentStatus::FalseAlarm),
            "CONTAINED" => Ok(IncidentStatus::Contained),
            "EXTINGUISHED" => Ok(IncidentStatus::Extinguished),
            other => Err(StoreError::Validation(format!(
                "unknown incident status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Moderate => write!(f, "MODERATE"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Extreme => write!(f, "EXTREME"),
        }
    }
}

impl RiskLevel {
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "LOW" => Ok(RiskLevel::Low),
            "MODERATE" => Ok(RiskLevel::Moderate),
            "HIGH" => Ok(RiskLevel::High),
            "EXTREME" => Ok(RiskLevel::Extreme),
            other => Err(StoreError::Validation(format!(
                "unknown risk level: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPreference {
    Email,
    Sms,
    Push,
    All,
}

impl std::fmt::Display for NotificationPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationPreference::Email => write!(f, "EMAIL"),
            NotificationPreference::Sms => write!(f, "SMS"),
            NotificationPreference::Push => write!(f, "PUSH"),
            NotificationPreference::All => write!(f, "ALL"),
        }
    }
}

impl NotificationPreference {
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "EMAIL" => Ok(NotificationPreference::Email),
            "SMS" => Ok(NotificationPreference::Sms),
            "PUSH" => Ok(NotificationPreference::Push),
            "ALL" => Ok(NotificationPreference::All),
            other => Err(StoreError::Validation(format!(
                "unknown notification preference: {other}"
            ))),
        }
    }
}

// --- Records (store-assigned id + timestamps) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub status: IncidentStatus,
    pub severity: Option<i32>,
    pub reporter_id: String,
    pub timestamp: DateTime<Utc>,
    pub verified_by: Option<String>,
    pub location_name: Option<String>,
    pub county: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub user_name: Option<String>,
    pub incident_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertZone {
    pub id: String,
    pub name: String,
    pub county: String,
    /// GeoJSON Polygon, stored as a string exactly as the UI sends it.
    pub polygon: String,
    pub risk_level: RiskLevel,
    pub active_alert: bool,
    pub last_updated: DateTime<Utc>,
    pub subscriber_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub alert_zone_id: String,
    pub preference: NotificationPreference,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSample {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub fire_risk_index: Option<f64>,
    pub county: Option<String>,
}

// --- Creation inputs (caller builds; store assigns id) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIncident {
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: Option<String>,
    pub description: Option<String>,
    /// Defaults to `Reported` when absent. Seed data sets it explicitly.
    pub status: Option<IncidentStatus>,
    pub severity: Option<i32>,
    pub reporter_id: String,
    pub timestamp: DateTime<Utc>,
    pub location_name: Option<String>,
    pub county: Option<String>,
}

impl NewIncident {
    pub fn validate(&self) -> Result<(), StoreError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(StoreError::Validation(format!(
                "latitude out of range: {}",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(StoreError::Validation(format!(
                "longitude out of range: {}",
                self.longitude
            )));
        }
        if let Some(sev) = self.severity {
            if !(1..=5).contains(&sev) {
                return Err(StoreError::Validation(format!(
                    "severity must be in 1..=5, got {sev}"
                )));
            }
        }
        if self.reporter_id.is_empty() {
            return Err(StoreError::Validation("reporter_id is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub user_name: Option<String>,
    pub incident_id: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.content.trim().is_empty() {
            return Err(StoreError::Validation("comment content is required".into()));
        }
        if self.user_id.is_empty() {
            return Err(StoreError::Validation("user_id is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlertZone {
    pub name: String,
    pub county: String,
    pub polygon: String,
    pub risk_level: RiskLevel,
    pub active_alert: bool,
    pub last_updated: DateTime<Utc>,
    pub subscriber_count: i64,
}

impl NewAlertZone {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.is_empty() {
            return Err(StoreError::Validation("zone name is required".into()));
        }
        if self.county.is_empty() {
            return Err(StoreError::Validation("zone county is required".into()));
        }
        if self.subscriber_count < 0 {
            return Err(StoreError::Validation(format!(
                "subscriber_count must be >= 0, got {}",
                self.subscriber_count
            )));
        }
        validate_polygon(&self.polygon)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
    pub user_id: String,
    pub alert_zone_id: String,
    pub preference: NotificationPreference,
    pub created_at: DateTime<Utc>,
}

impl NewSubscription {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.user_id.is_empty() {
            return Err(StoreError::Validation("user_id is required".into()));
        }
        if self.alert_zone_id.is_empty() {
            return Err(StoreError::Validation("alert_zone_id is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWeatherSample {
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub fire_risk_index: Option<f64>,
    pub county: Option<String>,
}

impl NewWeatherSample {
    pub fn validate(&self) -> Result<(), StoreError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(StoreError::Validation(format!(
                "latitude out of range: {}",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(StoreError::Validation(format!(
                "longitude out of range: {}",
                self.longitude
            )));
        }
        if let Some(idx) = self.fire_risk_index {
            if !(0.0..=1.0).contains(&idx) {
                return Err(StoreError::Validation(format!(
                    "fire_risk_index must be in [0, 1], got {idx}"
                )));
            }
        }
        Ok(())
    }
}

// --- Geo validation ---

/// Require a syntactically valid GeoJSON Polygon. Zone boundaries are
/// stored as opaque strings; this is the only place their shape is
/// checked.
pub fn validate_polygon(raw: &str) -> Result<(), StoreError> {
    let parsed: GeoJson = raw
        .parse()
        .map_err(|e| StoreError::Validation(format!("invalid GeoJSON: {e}")))?;

    let geometry: Geometry = match parsed {
        GeoJson::Geometry(g) => g,
        other => {
            return Err(StoreError::Validation(format!(
                "expected a GeoJSON geometry, got {}",
                geojson_kind(&other)
            )))
        }
    };

    match geometry.value {
        GeoValue::Polygon(_) => Ok(()),
        _ => Err(StoreError::Validation(
            "zone boundary must be a GeoJSON Polygon".into(),
        )),
    }
}

fn geojson_kind(g: &GeoJson) -> &'static str {
    match g {
        GeoJson::Geometry(_) => "Geometry",
        GeoJson::Feature(_) => "Feature",
        GeoJson::FeatureCollection(_) => "FeatureCollection",
    }
}

// =========================================================================
// Tests
// =========================================================================
