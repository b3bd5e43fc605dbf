//! Integration tests for PgStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use sqlx::PgPool;

use emberwatch_common::seed;
use emberwatch_common::{
    IncidentStatus, NewSubscription, NotificationPreference, SeedBatch, StoreError,
};
use emberwatch_store::{PgStore, StoreGateway};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

async fn test_store() -> Option<PgStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    let store = PgStore::new(pool.clone());
    store.ensure_schema().await.ok()?;

    sqlx::query(
        "TRUNCATE subscriptions, comments, incidents, alert_zones, weather_samples, seed_markers \
         RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .ok()?;

    Some(store)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn create_and_list_incidents_in_creation_order() {
    let Some(store) = test_store().await else {
        return;
    };

    for input in seed::seed_incidents() {
        store.create_incident(input).await.unwrap();
    }

    let all = store.list_incidents(None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].county.as_deref(), Some("Los Angeles"));
    assert_eq!(all[2].county.as_deref(), Some("Fresno"));

    let la = store.list_incidents(Some("Los Angeles")).await.unwrap();
    assert_eq!(la.len(), 1);
    assert_eq!(la[0].status, IncidentStatus::Reported);
}

#[tokio::test]
async fn conditional_status_write_conflicts_when_raced() {
    let Some(store) = test_store().await else {
        return;
    };

    let created = store
        .create_incident(seed::seed_incidents().remove(0))
        .await
        .unwrap();

    store
        .update_incident_status(&created.id, IncidentStatus::Reported, IncidentStatus::Verified)
        .await
        .unwrap();

    let err = store
        .update_incident_status(&created.id, IncidentStatus::Reported, IncidentStatus::FalseAlarm)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn concurrent_increments_lose_nothing() {
    let Some(store) = test_store().await else {
        return;
    };

    let zone = store
        .create_alert_zone(seed::seed_alert_zones().remove(0))
        .await
        .unwrap();
    let base = zone.subscriber_count;

    let n = 10;
    let mut handles = Vec::new();
    for _ in 0..n {
        let store = store.clone();
        let zone_id = zone.id.clone();
        handles.push(tokio::spawn(async move {
            store.increment_zone_subscribers(&zone_id).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let after = store.get_alert_zone(&zone.id).await.unwrap().unwrap();
    assert_eq!(after.subscriber_count, base + n);
}

#[tokio::test]
async fn seed_batch_inserted_by_exactly_one_of_many() {
    let Some(store) = test_store().await else {
        return;
    };

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .insert_seed_batch("pg-test-batch", SeedBatch::baseline())
                .await
        }));
    }

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);

    // One batch of records, not eight.
    assert_eq!(store.list_incidents(None).await.unwrap().len(), 3);
    assert_eq!(store.list_alert_zones().await.unwrap().len(), 2);
    assert_eq!(store.list_weather_samples(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn rejected_seed_batch_leaves_batch_id_claimable() {
    let Some(store) = test_store().await else {
        return;
    };

    let mut batch = SeedBatch::baseline();
    batch.zones[0].subscriber_count = -1;

    let err = store
        .insert_seed_batch("pg-test-batch", batch)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(store.list_incidents(None).await.unwrap().is_empty());

    // The batch id is still claimable.
    assert!(store
        .insert_seed_batch("pg-test-batch", SeedBatch::baseline())
        .await
        .unwrap());
    assert_eq!(store.list_incidents(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn subscription_for_missing_zone_is_not_found() {
    let Some(store) = test_store().await else {
        return;
    };

    let err = store
        .create_subscription(NewSubscription {
            user_id: "u1".into(),
            alert_zone_id: "no-such-zone".into(),
            preference: NotificationPreference::Email,
            created_at: chrono::Utc::now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}
