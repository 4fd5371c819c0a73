//! Persistence contract and backends.
//!
//! The engine consumes storage only through the [`Storage`] trait; writes
//! either land completely or fail with a distinguishable error, never as a
//! partially-written record.

mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use thiserror::Error;

use skywatch_core::{AircraftState, Notification};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sqlx::Error),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage unavailable")]
    Unavailable,
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn save_aircraft(&self, state: &AircraftState) -> Result<(), StorageError>;
    async fn load_all_aircraft(&self) -> Result<Vec<AircraftState>, StorageError>;
    async fn delete_aircraft(&self, id: &str) -> Result<(), StorageError>;
    async fn save_notification(&self, notification: &Notification) -> Result<(), StorageError>;
    async fn load_notification(&self, id: &str) -> Result<Option<Notification>, StorageError>;
    async fn list_pending_notifications(&self) -> Result<Vec<Notification>, StorageError>;
    async fn list_notifications_by_sector(
        &self,
        sector: &str,
    ) -> Result<Vec<Notification>, StorageError>;
}
