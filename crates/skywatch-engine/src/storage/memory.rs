//! In-memory storage backend for tests and the traffic simulator.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use skywatch_core::{AircraftState, Notification, NotificationStatus};

use super::{Storage, StorageError};

#[derive(Default)]
pub struct MemoryStorage {
    aircraft: DashMap<String, AircraftState>,
    notifications: DashMap<String, Notification>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`StorageError::Unavailable`].
    /// Used to exercise the engine's outage handling.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_aircraft(&self, state: &AircraftState) -> Result<(), StorageError> {
        self.check_writable()?;
        self.aircraft.insert(state.id.clone(), state.clone());
        Ok(())
    }

    async fn load_all_aircraft(&self) -> Result<Vec<AircraftState>, StorageError> {
        Ok(self.aircraft.iter().map(|r| r.value().clone()).collect())
    }

    async fn delete_aircraft(&self, id: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.aircraft.remove(id);
        Ok(())
    }

    async fn save_notification(&self, notification: &Notification) -> Result<(), StorageError> {
        self.check_writable()?;
        self.notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    async fn load_notification(&self, id: &str) -> Result<Option<Notification>, StorageError> {
        Ok(self.notifications.get(id).map(|r| r.value().clone()))
    }

    async fn list_pending_notifications(&self) -> Result<Vec<Notification>, StorageError> {
        Ok(self
            .notifications
            .iter()
            .filter(|r| r.value().status == NotificationStatus::Pending)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn list_notifications_by_sector(
        &self,
        sector: &str,
    ) -> Result<Vec<Notification>, StorageError> {
        Ok(self
            .notifications
            .iter()
            .filter(|r| r.value().sector_id.as_deref() == Some(sector))
            .map(|r| r.value().clone())
            .collect())
    }
}
