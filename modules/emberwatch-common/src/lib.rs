pub mod config;
pub mod error;
pub mod seed;
pub mod types;

pub use config::Config;
pub use error::StoreError;
pub use seed::{SeedBatch, SEED_BATCH_ID};
pub use types::*;
