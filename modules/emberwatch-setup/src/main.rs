//! Bootstrap a shared Postgres store: ensure the schema exists and,
//! unless disabled, seed the baseline demo content. Safe to run from
//! any number of hosts at once.

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use emberwatch_common::Config;
use emberwatch_store::{PgStore, StoreGateway};
use emberwatch_sync::{SeedOutcome, Seeder};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("emberwatch=info".parse()?))
        .init();

    let config = Config::from_env();

    let pool = PgPool::connect(&config.database_url).await?;
    let store = PgStore::new(pool);
    store.ensure_schema().await?;

    if config.seed_on_start {
        match Seeder::new().seed_if_empty(&store).await? {
            SeedOutcome::Seeded {
                incidents,
                zones,
                weather,
            } => info!(incidents, zones, weather, "baseline batch inserted"),
            SeedOutcome::AlreadySeeded => info!("store already seeded"),
        }
    }

    let incidents = store.list_incidents(None).await?;
    let zones = store.list_alert_zones().await?;
    let weather = store.list_weather_samples(None).await?;
    info!(
        incidents = incidents.len(),
        zones = zones.len(),
        weather = weather.len(),
        "store ready"
    );

    Ok(())
}
