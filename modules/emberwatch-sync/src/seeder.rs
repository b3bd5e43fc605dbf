//! One-time store bootstrap.
//!
//! Every client session runs the same logic on first use, so the
//! protocol has to survive N concurrent runs against one store:
//!
//! 1. The session flag is a pure cache — it only short-circuits repeat
//!    calls within this session and is never trusted across clients.
//! 2. A non-empty store means someone already seeded; stop.
//! 3. The store inserts the marker and the batch as one atomic unit.
//!    Exactly one client gets the claim for a batch id; everyone else
//!    backs off even if they all observed an empty store in step 2,
//!    and a failed attempt leaves nothing behind to block a retry.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use emberwatch_common::{SeedBatch, StoreError, SEED_BATCH_ID};
use emberwatch_store::StoreGateway;

#[derive(Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    /// This session inserted the batch.
    Seeded {
        incidents: usize,
        zones: usize,
        weather: usize,
    },
    /// The store already had data, another client won the claim, or
    /// this session already ran. Distinct from failure: errors come
    /// back as `Err`.
    AlreadySeeded,
}

#[derive(Default)]
pub struct Seeder {
    done: AtomicBool,
}

impl Seeder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_if_empty<G: StoreGateway>(
        &self,
        store: &G,
    ) -> Result<SeedOutcome, StoreError> {
        if self.done.load(Ordering::SeqCst) {
            return Ok(SeedOutcome::AlreadySeeded);
        }

        let has_data = !store.list_incidents(None).await?.is_empty()
            || !store.list_alert_zones().await?.is_empty()
            || !store.list_weather_samples(None).await?.is_empty();
        if has_data {
            info!("store already has data, skipping seed");
            self.done.store(true, Ordering::SeqCst);
            return Ok(SeedOutcome::AlreadySeeded);
        }

        // The empty-store observation above can race with other
        // clients. The atomic claim-and-insert decides who seeds; an
        // Err here wrote nothing, so a later session can retry.
        let batch = SeedBatch::baseline();
        let (incidents, zones, weather) =
            (batch.incidents.len(), batch.zones.len(), batch.weather.len());
        if !store.insert_seed_batch(SEED_BATCH_ID, batch).await? {
            info!(batch = SEED_BATCH_ID, "seed batch already claimed");
            self.done.store(true, Ordering::SeqCst);
            return Ok(SeedOutcome::AlreadySeeded);
        }

        self.done.store(true, Ordering::SeqCst);
        info!(incidents, zones, weather, "seeded store with baseline batch");
        Ok(SeedOutcome::Seeded {
            incidents,
            zones,
            weather,
        })
    }
}
