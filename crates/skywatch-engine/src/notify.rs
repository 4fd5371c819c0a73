//! Notification lifecycle: creation, dedupe, debounced resolution.
//!
//! State machine per alert identity: none -> pending -> resolved, with
//! resolved terminal. The manager is the sole writer of notification
//! state; every transition is written to storage before it is applied in
//! memory, so a failed write leaves no partial state.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use skywatch_core::{
    AlertIdentity, Notification, NotificationKind, NotificationPriority, NotificationStatus,
};

use crate::error::EngineError;
use crate::storage::Storage;

/// A qualifying condition observed this tick.
#[derive(Debug, Clone)]
pub struct AlertSpec {
    pub identity: AlertIdentity,
    pub priority: NotificationPriority,
    pub message: String,
}

pub struct NotificationManager {
    storage: Arc<dyn Storage>,
    pending: DashMap<AlertIdentity, Notification>,
    clear_streaks: DashMap<AlertIdentity, u32>,
    debounce_ticks: u32,
    write_retries: u32,
}

impl NotificationManager {
    pub fn new(storage: Arc<dyn Storage>, debounce_ticks: u32, write_retries: u32) -> Self {
        Self {
            storage,
            pending: DashMap::new(),
            clear_streaks: DashMap::new(),
            debounce_ticks: debounce_ticks.max(1),
            write_retries,
        }
    }

    /// Reload pending notifications from storage at startup.
    pub async fn hydrate(&self) -> Result<(), EngineError> {
        for notification in self.storage.list_pending_notifications().await? {
            let identity = notification.identity();
            if let Some(earliest) = self.pending.get(&identity) {
                tracing::error!(
                    kept = %earliest.id,
                    dropped = %notification.id,
                    "duplicate pending notification in storage, keeping the earliest"
                );
                continue;
            }
            self.pending.insert(identity, notification);
        }
        Ok(())
    }

    /// Open a pending notification for an identity unless one already
    /// exists. Returns the created record, or `None` when the identity is
    /// already pending (idempotent creation).
    pub async fn open(
        &self,
        spec: AlertSpec,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, EngineError> {
        if self.pending.contains_key(&spec.identity) {
            // Condition is still live; reset any clearing streak.
            self.clear_streaks.remove(&spec.identity);
            return Ok(None);
        }

        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            kind: spec.identity.kind,
            priority: spec.priority,
            status: NotificationStatus::Pending,
            aircraft: spec.identity.aircraft.clone(),
            sector_id: spec.identity.sector.clone(),
            message: spec.message,
            created_at: now,
            resolved_at: None,
        };

        // Write-ahead: a failed persist leaves the in-memory map untouched
        // and the condition re-qualifies next tick.
        self.persist(&notification).await?;

        match self.pending.entry(spec.identity) {
            dashmap::mapref::entry::Entry::Occupied(earliest) => {
                tracing::error!(
                    kept = %earliest.get().id,
                    dropped = %notification.id,
                    "duplicate pending notification for one identity, keeping the earliest"
                );
                Ok(None)
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                self.clear_streaks.remove(slot.key());
                slot.insert(notification.clone());
                Ok(Some(notification))
            }
        }
    }

    /// Reconcile this tick's qualifying conditions against the pending
    /// set: open what is new, debounce-clear what has gone quiet. Storage
    /// failures are logged per alert and retried on later ticks; they never
    /// abort the pass.
    pub async fn reconcile(
        &self,
        active: &[AlertSpec],
        now: DateTime<Utc>,
    ) -> (Vec<Notification>, Vec<Notification>) {
        let mut created = Vec::new();
        for spec in active {
            match self.open(spec.clone(), now).await {
                Ok(Some(notification)) => created.push(notification),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(error = %err, "notification create failed, will retry next tick");
                }
            }
        }

        let active_identities: HashSet<&AlertIdentity> =
            active.iter().map(|spec| &spec.identity).collect();

        let mut due: Vec<AlertIdentity> = Vec::new();
        for entry in self.pending.iter() {
            let identity = entry.key();
            if !auto_clears(identity.kind) || active_identities.contains(identity) {
                continue;
            }
            let streak = {
                let mut counter = self.clear_streaks.entry(identity.clone()).or_insert(0);
                *counter += 1;
                *counter
            };
            if streak >= self.debounce_ticks {
                due.push(identity.clone());
            }
        }

        let mut resolved = Vec::new();
        for identity in due {
            match self.resolve_identity(&identity, now).await {
                Ok(Some(notification)) => resolved.push(notification),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(error = %err, "notification resolve failed, will retry next tick");
                }
            }
        }

        (created, resolved)
    }

    /// Explicit operator resolution by notification id.
    pub async fn resolve(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Notification, EngineError> {
        let identity = self
            .pending
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.key().clone())
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

        self.resolve_identity(&identity, now)
            .await?
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    async fn resolve_identity(
        &self,
        identity: &AlertIdentity,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, EngineError> {
        let Some(current) = self.pending.get(identity).map(|e| e.value().clone()) else {
            return Ok(None);
        };

        let mut resolved = current;
        resolved.status = NotificationStatus::Resolved;
        resolved.resolved_at = Some(now);

        self.persist(&resolved).await?;
        self.pending.remove(identity);
        self.clear_streaks.remove(identity);
        Ok(Some(resolved))
    }

    async fn persist(&self, notification: &Notification) -> Result<(), EngineError> {
        let mut attempt = 0;
        loop {
            match self.storage.save_notification(notification).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.write_retries => {
                    attempt += 1;
                    tracing::warn!(
                        notification = %notification.id,
                        attempt,
                        error = %err,
                        "notification write failed, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn pending_snapshot(&self) -> Vec<Notification> {
        let mut pending: Vec<Notification> =
            self.pending.iter().map(|e| e.value().clone()).collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending
    }

    pub fn pending_by_sector(&self, sector: &str) -> Vec<Notification> {
        self.pending_snapshot()
            .into_iter()
            .filter(|n| n.sector_id.as_deref() == Some(sector))
            .collect()
    }
}

/// Condition-driven kinds auto-resolve when the condition clears;
/// operator-raised kinds resolve only explicitly.
fn auto_clears(kind: NotificationKind) -> bool {
    matches!(
        kind,
        NotificationKind::Collision | NotificationKind::Assistance
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn manager(storage: Arc<MemoryStorage>) -> NotificationManager {
        NotificationManager::new(storage, 3, 1)
    }

    fn collision_spec(pair: [&str; 2]) -> AlertSpec {
        AlertSpec {
            identity: AlertIdentity::new(
                NotificationKind::Collision,
                vec![pair[0].into(), pair[1].into()],
                Some("ZKC".into()),
            ),
            priority: NotificationPriority::High,
            message: "loss of separation".into(),
        }
    }

    #[tokio::test]
    async fn creation_is_idempotent_while_pending() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = manager(storage.clone());
        let spec = collision_spec(["N100", "N200"]);

        for _ in 0..5 {
            manager.reconcile(&[spec.clone()], Utc::now()).await;
        }
        assert_eq!(manager.pending_snapshot().len(), 1);
        assert_eq!(storage.list_pending_notifications().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn condition_must_stay_clear_for_the_full_debounce_window() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = manager(storage);
        let spec = collision_spec(["N100", "N200"]);
        let now = Utc::now();

        manager.reconcile(&[spec.clone()], now).await;
        assert_eq!(manager.pending_snapshot().len(), 1);

        // Two clear ticks: still pending.
        for _ in 0..2 {
            let (_, resolved) = manager.reconcile(&[], now).await;
            assert!(resolved.is_empty());
        }
        // A recurrence resets the streak.
        manager.reconcile(&[spec.clone()], now).await;
        for _ in 0..2 {
            let (_, resolved) = manager.reconcile(&[], now).await;
            assert!(resolved.is_empty());
        }
        // Third consecutive clear tick resolves.
        let (_, resolved) = manager.reconcile(&[], now).await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].status, NotificationStatus::Resolved);
        assert!(resolved[0].resolved_at.is_some());
        assert!(manager.pending_snapshot().is_empty());
    }

    #[tokio::test]
    async fn operator_raised_kinds_never_auto_clear() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = manager(storage);
        let spec = AlertSpec {
            identity: AlertIdentity::new(NotificationKind::Handoff, vec!["N100".into()], None),
            priority: NotificationPriority::Normal,
            message: "handoff requested".into(),
        };

        manager.open(spec, Utc::now()).await.unwrap();
        for _ in 0..10 {
            let (_, resolved) = manager.reconcile(&[], Utc::now()).await;
            assert!(resolved.is_empty());
        }
        assert_eq!(manager.pending_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn second_resolve_returns_not_found() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = manager(storage);
        let created = manager
            .open(collision_spec(["N100", "N200"]), Utc::now())
            .await
            .unwrap()
            .unwrap();

        let resolved = manager.resolve(&created.id, Utc::now()).await.unwrap();
        assert_eq!(resolved.status, NotificationStatus::Resolved);

        let err = manager.resolve(&created.id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn recurrence_after_resolution_creates_a_fresh_record() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = manager(storage);
        let spec = collision_spec(["N100", "N200"]);

        let first = manager
            .open(spec.clone(), Utc::now())
            .await
            .unwrap()
            .unwrap();
        manager.resolve(&first.id, Utc::now()).await.unwrap();

        let second = manager.open(spec, Utc::now()).await.unwrap().unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.status, NotificationStatus::Pending);
    }

    #[tokio::test]
    async fn failed_write_leaves_no_partial_state() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = manager(storage.clone());
        storage.set_fail_writes(true);

        let (created, _) = manager
            .reconcile(&[collision_spec(["N100", "N200"])], Utc::now())
            .await;
        assert!(created.is_empty());
        assert!(manager.pending_snapshot().is_empty());

        // Outage over: the still-live condition creates on the next tick.
        storage.set_fail_writes(false);
        let (created, _) = manager
            .reconcile(&[collision_spec(["N100", "N200"])], Utc::now())
            .await;
        assert_eq!(created.len(), 1);
    }

    #[tokio::test]
    async fn hydrate_restores_pending_records() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let manager = manager(storage.clone());
            manager
                .open(collision_spec(["N100", "N200"]), Utc::now())
                .await
                .unwrap();
        }

        let restarted = manager(storage);
        restarted.hydrate().await.unwrap();
        assert_eq!(restarted.pending_snapshot().len(), 1);
    }
}
