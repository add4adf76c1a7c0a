pub mod app_config;
pub mod database;
pub mod catalog_repo;
pub mod order_repo;
pub mod memory_repo;
pub mod events;

pub use database::DbClient;
pub use order_repo::PgLedgerStore;
pub use memory_repo::MemoryStore;
pub use events::KafkaEventPublisher;
