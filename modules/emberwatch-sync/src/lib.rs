pub mod client;
pub mod effector;
pub mod queries;
pub mod reconcile;
pub mod seeder;

pub use client::SessionClient;
pub use effector::{derived_subscriber_count, subscribe_to_zone};
pub use reconcile::{Keyed, SessionCache};
pub use seeder::{SeedOutcome, Seeder};
