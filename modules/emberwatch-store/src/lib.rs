pub mod gateway;
pub mod memory;
pub mod postgres;

pub use gateway::StoreGateway;
pub use memory::MemoryStore;
pub use postgres::PgStore;
