//! Postgres-backed store. The shared, authoritative copy.
//!
//! Insertion order is a BIGSERIAL per table; list reads order by it.
//! The two conditional primitives lean on the database: the seed batch
//! goes in as one transaction gated on `INSERT .. ON CONFLICT DO
//! NOTHING` of its marker, and the subscriber counter is a single
//! server-side UPDATE, so neither can lose a race no matter how many
//! clients run the same logic at once.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use emberwatch_common::{
    AlertZone, Comment, Incident, IncidentStatus, NewAlertZone, NewComment, NewIncident,
    NewSubscription, NewWeatherSample, NotificationPreference, RiskLevel, SeedBatch,
    StoreError, Subscription, WeatherSample,
};

use crate::gateway::StoreGateway;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create all tables if absent. Safe to run repeatedly.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS incidents (
                id            TEXT         PRIMARY KEY,
                created_seq   BIGSERIAL    UNIQUE,
                latitude      DOUBLE PRECISION NOT NULL,
                longitude     DOUBLE PRECISION NOT NULL,
                image_url     TEXT,
                description   TEXT,
                status        TEXT         NOT NULL,
                severity      INTEGER,
                reporter_id   TEXT         NOT NULL,
                ts            TIMESTAMPTZ  NOT NULL,
                verified_by   TEXT,
                location_name TEXT,
                county        TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id          TEXT        PRIMARY KEY,
                created_seq BIGSERIAL   UNIQUE,
                content     TEXT        NOT NULL,
                ts          TIMESTAMPTZ NOT NULL,
                user_id     TEXT        NOT NULL,
                user_name   TEXT,
                incident_id TEXT        NOT NULL REFERENCES incidents(id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS alert_zones (
                id               TEXT        PRIMARY KEY,
                created_seq      BIGSERIAL   UNIQUE,
                name             TEXT        NOT NULL,
                county           TEXT        NOT NULL,
                polygon          TEXT        NOT NULL,
                risk_level       TEXT        NOT NULL,
                active_alert     BOOLEAN     NOT NULL,
                last_updated     TIMESTAMPTZ NOT NULL,
                subscriber_count BIGINT      NOT NULL CHECK (subscriber_count >= 0)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS subscriptions (
                id            TEXT        PRIMARY KEY,
                created_seq   BIGSERIAL   UNIQUE,
                user_id       TEXT        NOT NULL,
                alert_zone_id TEXT        NOT NULL REFERENCES alert_zones(id),
                preference    TEXT        NOT NULL,
                created_at    TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS weather_samples (
                id              TEXT        PRIMARY KEY,
                created_seq     BIGSERIAL   UNIQUE,
                latitude        DOUBLE PRECISION NOT NULL,
                longitude       DOUBLE PRECISION NOT NULL,
                temperature     DOUBLE PRECISION,
                humidity        DOUBLE PRECISION,
                wind_speed      DOUBLE PRECISION,
                wind_direction  DOUBLE PRECISION,
                ts              TIMESTAMPTZ NOT NULL,
                fire_risk_index DOUBLE PRECISION,
                county          TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS seed_markers (
                batch_id   TEXT        PRIMARY KEY,
                claimed_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        ];

        for sql in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx)?;
        }
        info!("schema ensured");
        Ok(())
    }
}

const INCIDENT_COLS: &str =
    "id, latitude, longitude, image_url, description, status, severity, reporter_id, ts, \
     verified_by, location_name, county";
const ZONE_COLS: &str =
    "id, name, county, polygon, risk_level, active_alert, last_updated, subscriber_count";

#[async_trait]
impl StoreGateway for PgStore {
    async fn list_incidents(&self, county: Option<&str>) -> Result<Vec<Incident>, StoreError> {
        let rows = match county {
            Some(county) => {
                sqlx::query_as::<_, IncidentRow>(&format!(
                    "SELECT {INCIDENT_COLS} FROM incidents WHERE county = $1 ORDER BY created_seq"
                ))
                .bind(county)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, IncidentRow>(&format!(
                    "SELECT {INCIDENT_COLS} FROM incidents ORDER BY created_seq"
                ))
                .fetch_all(&self.pool)
                .await
            }
        };
        let rows = rows.map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Incident::from).collect())
    }

    async fn get_incident(&self, id: &str) -> Result<Option<Incident>, StoreError> {
        sqlx::query_as::<_, IncidentRow>(&format!(
            "SELECT {INCIDENT_COLS} FROM incidents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
        .map(|row| row.map(Incident::from))
    }

    async fn create_incident(&self, input: NewIncident) -> Result<Incident, StoreError> {
        input.validate()?;
        let status = input.status.unwrap_or(IncidentStatus::Reported);
        sqlx::query_as::<_, IncidentRow>(&format!(
            r#"
            INSERT INTO incidents
                (id, latitude, longitude, image_url, description, status, severity,
                 reporter_id, ts, verified_by, location_name, county)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, $10, $11)
            RETURNING {INCIDENT_COLS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(&input.image_url)
        .bind(&input.description)
        .bind(status.as_str())
        .bind(input.severity)
        .bind(&input.reporter_id)
        .bind(input.timestamp)
        .bind(&input.location_name)
        .bind(&input.county)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
        .map(Incident::from)
    }

    async fn update_incident_status(
        &self,
        id: &str,
        expected: IncidentStatus,
        next: IncidentStatus,
    ) -> Result<Incident, StoreError> {
        let updated = sqlx::query_as::<_, IncidentRow>(&format!(
            r#"
            UPDATE incidents SET status = $3
            WHERE id = $1 AND status = $2
            RETURNING {INCIDENT_COLS}
            "#
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match updated {
            Some(incident) => Ok(incident.into()),
            // Distinguish "gone" from "someone else moved it".
            None => match self.get_incident(id).await? {
                Some(current) => Err(StoreError::Conflict(format!(
                    "incident {id} status is {}, expected {expected}",
                    current.status
                ))),
                None => Err(StoreError::not_found("incident", id)),
            },
        }
    }

    async fn list_comments(&self, incident_id: &str) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT id, content, ts, user_id, user_name, incident_id FROM comments \
             WHERE incident_id = $1 ORDER BY created_seq",
        )
        .bind(incident_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn create_comment(&self, input: NewComment) -> Result<Comment, StoreError> {
        input.validate()?;
        sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (id, content, ts, user_id, user_name, incident_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, content, ts, user_id, user_name, incident_id
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&input.content)
        .bind(input.timestamp)
        .bind(&input.user_id)
        .bind(&input.user_name)
        .bind(&input.incident_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_fk_violation(e, "incident", &input.incident_id))
        .map(Comment::from)
    }

    async fn list_alert_zones(&self) -> Result<Vec<AlertZone>, StoreError> {
        let rows = sqlx::query_as::<_, ZoneRow>(&format!(
            "SELECT {ZONE_COLS} FROM alert_zones ORDER BY created_seq"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(AlertZone::from).collect())
    }

    async fn get_alert_zone(&self, id: &str) -> Result<Option<AlertZone>, StoreError> {
        sqlx::query_as::<_, ZoneRow>(&format!(
            "SELECT {ZONE_COLS} FROM alert_zones WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
        .map(|row| row.map(AlertZone::from))
    }

    async fn create_alert_zone(&self, input: NewAlertZone) -> Result<AlertZone, StoreError> {
        input.validate()?;
        sqlx::query_as::<_, ZoneRow>(&format!(
            r#"
            INSERT INTO alert_zones
                (id, name, county, polygon, risk_level, active_alert, last_updated, subscriber_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ZONE_COLS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&input.name)
        .bind(&input.county)
        .bind(&input.polygon)
        .bind(input.risk_level.to_string())
        .bind(input.active_alert)
        .bind(input.last_updated)
        .bind(input.subscriber_count)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
        .map(AlertZone::from)
    }

    async fn increment_zone_subscribers(&self, zone_id: &str) -> Result<AlertZone, StoreError> {
        // One server-side UPDATE: concurrent callers serialize on the
        // row, so no increment is ever lost.
        sqlx::query_as::<_, ZoneRow>(&format!(
            r#"
            UPDATE alert_zones
            SET subscriber_count = subscriber_count + 1, last_updated = now()
            WHERE id = $1
            RETURNING {ZONE_COLS}
            "#
        ))
        .bind(zone_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .map(AlertZone::from)
        .ok_or_else(|| StoreError::not_found("alert zone", zone_id))
    }

    async fn list_subscriptions_for_zone(
        &self,
        zone_id: &str,
    ) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT id, user_id, alert_zone_id, preference, created_at FROM subscriptions \
             WHERE alert_zone_id = $1 ORDER BY created_seq",
        )
        .bind(zone_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    async fn create_subscription(
        &self,
        input: NewSubscription,
    ) -> Result<Subscription, StoreError> {
        input.validate()?;
        sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO subscriptions (id, user_id, alert_zone_id, preference, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, alert_zone_id, preference, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&input.user_id)
        .bind(&input.alert_zone_id)
        .bind(input.preference.to_string())
        .bind(input.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_fk_violation(e, "alert zone", &input.alert_zone_id))
        .map(Subscription::from)
    }

    async fn list_weather_samples(
        &self,
        county: Option<&str>,
    ) -> Result<Vec<WeatherSample>, StoreError> {
        let base = "SELECT id, latitude, longitude, temperature, humidity, wind_speed, \
                    wind_direction, ts, fire_risk_index, county FROM weather_samples";
        let rows = match county {
            Some(county) => {
                sqlx::query_as::<_, WeatherRow>(&format!(
                    "{base} WHERE county = $1 ORDER BY created_seq"
                ))
                .bind(county)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, WeatherRow>(&format!("{base} ORDER BY created_seq"))
                    .fetch_all(&self.pool)
                    .await
            }
        };
        let rows = rows.map_err(map_sqlx)?;
        Ok(rows.into_iter().map(WeatherSample::from).collect())
    }

    async fn create_weather_sample(
        &self,
        input: NewWeatherSample,
    ) -> Result<WeatherSample, StoreError> {
        input.validate()?;
        sqlx::query_as::<_, WeatherRow>(
            r#"
            INSERT INTO weather_samples
                (id, latitude, longitude, temperature, humidity, wind_speed, wind_direction,
                 ts, fire_risk_index, county)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, latitude, longitude, temperature, humidity, wind_speed,
                      wind_direction, ts, fire_risk_index, county
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.temperature)
        .bind(input.humidity)
        .bind(input.wind_speed)
        .bind(input.wind_direction)
        .bind(input.timestamp)
        .bind(input.fire_risk_index)
        .bind(&input.county)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
        .map(WeatherSample::from)
    }

    async fn insert_seed_batch(
        &self,
        batch_id: &str,
        batch: SeedBatch,
    ) -> Result<bool, StoreError> {
        batch.validate()?;

        // Marker and batch commit together. Losing the ON CONFLICT race
        // means another transaction holds (or committed) the claim; a
        // failure anywhere rolls the whole attempt back, marker
        // included, so a retry starts clean.
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let claimed = sqlx::query(
            "INSERT INTO seed_markers (batch_id) VALUES ($1) ON CONFLICT (batch_id) DO NOTHING",
        )
        .bind(batch_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;
        if claimed.rows_affected() == 0 {
            return Ok(false);
        }

        for input in &batch.incidents {
            let status = input.status.unwrap_or(IncidentStatus::Reported);
            sqlx::query(
                r#"
                INSERT INTO incidents
                    (id, latitude, longitude, image_url, description, status, severity,
                     reporter_id, ts, verified_by, location_name, county)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, $10, $11)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(&input.image_url)
            .bind(&input.description)
            .bind(status.as_str())
            .bind(input.severity)
            .bind(&input.reporter_id)
            .bind(input.timestamp)
            .bind(&input.location_name)
            .bind(&input.county)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }

        for input in &batch.zones {
            sqlx::query(
                r#"
                INSERT INTO alert_zones
                    (id, name, county, polygon, risk_level, active_alert, last_updated,
                     subscriber_count)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&input.name)
            .bind(&input.county)
            .bind(&input.polygon)
            .bind(input.risk_level.to_string())
            .bind(input.active_alert)
            .bind(input.last_updated)
            .bind(input.subscriber_count)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }

        for input in &batch.weather {
            sqlx::query(
                r#"
                INSERT INTO weather_samples
                    (id, latitude, longitude, temperature, humidity, wind_speed,
                     wind_direction, ts, fire_risk_index, county)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(input.temperature)
            .bind(input.humidity)
            .bind(input.wind_speed)
            .bind(input.wind_direction)
            .bind(input.timestamp)
            .bind(input.fire_risk_index)
            .bind(&input.county)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }

        tx.commit().await.map_err(map_sqlx)?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------
//
// Local newtypes carry the sqlx decoding; the domain records stay free
// of database concerns.

struct IncidentRow(Incident);
struct CommentRow(Comment);
struct ZoneRow(AlertZone);
struct SubscriptionRow(Subscription);
struct WeatherRow(WeatherSample);

impl From<IncidentRow> for Incident {
    fn from(row: IncidentRow) -> Self {
        row.0
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        row.0
    }
}

impl From<ZoneRow> for AlertZone {
    fn from(row: ZoneRow) -> Self {
        row.0
    }
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        row.0
    }
}

impl From<WeatherRow> for WeatherSample {
    fn from(row: WeatherRow) -> Self {
        row.0
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for IncidentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(IncidentRow(Incident {
            id: row.try_get("id")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            image_url: row.try_get("image_url")?,
            description: row.try_get("description")?,
            status: parse_column(row, "status", IncidentStatus::parse)?,
            severity: row.try_get("severity")?,
            reporter_id: row.try_get("reporter_id")?,
            timestamp: row.try_get("ts")?,
            verified_by: row.try_get("verified_by")?,
            location_name: row.try_get("location_name")?,
            county: row.try_get("county")?,
        }))
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for CommentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CommentRow(Comment {
            id: row.try_get("id")?,
            content: row.try_get("content")?,
            timestamp: row.try_get("ts")?,
            user_id: row.try_get("user_id")?,
            user_name: row.try_get("user_name")?,
            incident_id: row.try_get("incident_id")?,
        }))
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for ZoneRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ZoneRow(AlertZone {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            county: row.try_get("county")?,
            polygon: row.try_get("polygon")?,
            risk_level: parse_column(row, "risk_level", RiskLevel::parse)?,
            active_alert: row.try_get("active_alert")?,
            last_updated: row.try_get("last_updated")?,
            subscriber_count: row.try_get("subscriber_count")?,
        }))
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for SubscriptionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SubscriptionRow(Subscription {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            alert_zone_id: row.try_get("alert_zone_id")?,
            preference: parse_column(row, "preference", NotificationPreference::parse)?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for WeatherRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(WeatherRow(WeatherSample {
            id: row.try_get("id")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            temperature: row.try_get("temperature")?,
            humidity: row.try_get("humidity")?,
            wind_speed: row.try_get("wind_speed")?,
            wind_direction: row.try_get("wind_direction")?,
            timestamp: row.try_get("ts")?,
            fire_risk_index: row.try_get("fire_risk_index")?,
            county: row.try_get("county")?,
        }))
    }
}

fn parse_column<T>(
    row: &PgRow,
    column: &str,
    parse: impl Fn(&str) -> Result<T, StoreError>,
) -> Result<T, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    parse(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_sqlx(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Transient(e.to_string())
        }
        other => StoreError::Unknown(other.to_string()),
    }
}

/// Foreign-key violations mean the referenced record is missing.
fn map_fk_violation(e: sqlx::Error, kind: &'static str, id: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23503") {
            return StoreError::not_found(kind, id);
        }
    }
    map_sqlx(e)
}
