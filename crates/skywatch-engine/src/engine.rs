//! Engine facade and the per-tick pipeline.
//!
//! One tick runs the stages in fixed order: drain buffered reports, apply
//! them through the correlator, sweep stale aircraft, snapshot, detect
//! conflicts, reconcile notifications, publish deltas. No stage reorders
//! across another, and every per-aircraft failure is contained to that
//! aircraft.

use std::sync::Arc;

use chrono::Utc;

use skywatch_core::{
    conflict, verify, AircraftState, AlertIdentity, ConflictCandidate, ConflictSeverity,
    Notification, NotificationKind, NotificationPriority, VerificationReport,
};

use crate::boundary::SectorMap;
use crate::config::EngineConfig;
use crate::dispatch::{Dispatcher, EngineEvent, EventStream};
use crate::error::EngineError;
use crate::notify::{AlertSpec, NotificationManager};
use crate::state::LiveStore;
use crate::storage::Storage;

pub struct Engine {
    config: EngineConfig,
    store: LiveStore,
    notifications: NotificationManager,
    dispatcher: Dispatcher,
    storage: Arc<dyn Storage>,
    sectors: Arc<dyn SectorMap>,
}

impl Engine {
    /// Build an engine, rehydrating live aircraft and pending
    /// notifications from storage.
    pub async fn new(
        config: EngineConfig,
        storage: Arc<dyn Storage>,
        sectors: Arc<dyn SectorMap>,
    ) -> Result<Arc<Self>, EngineError> {
        let store = LiveStore::new();
        store.hydrate(storage.load_all_aircraft().await?);

        let notifications = NotificationManager::new(
            storage.clone(),
            config.debounce_ticks,
            config.storage_write_retries,
        );
        notifications.hydrate().await?;

        let dispatcher = Dispatcher::new(config.event_capacity);

        Ok(Arc::new(Self {
            config,
            store,
            notifications,
            dispatcher,
            storage,
            sectors,
        }))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Feed one verification report into the next tick's snapshot.
    /// Malformed reports are rejected here and never reach the pipeline.
    pub fn apply_report(&self, report: VerificationReport) -> Result<(), EngineError> {
        verify::validate_report(&report)?;
        self.store.buffer_report(report);
        Ok(())
    }

    /// Current consistent snapshot of the live aircraft set.
    pub fn current_aircraft(&self) -> Vec<AircraftState> {
        self.store.snapshot()
    }

    pub fn pending_notifications(&self) -> Vec<Notification> {
        self.notifications.pending_snapshot()
    }

    pub fn notifications_by_sector(&self, sector: &str) -> Vec<Notification> {
        self.notifications.pending_by_sector(sector)
    }

    /// Explicit operator resolution.
    pub async fn resolve_notification(&self, id: &str) -> Result<Notification, EngineError> {
        let resolved = self.notifications.resolve(id, Utc::now()).await?;
        self.dispatcher.publish(EngineEvent::NotificationResolved {
            notification: resolved.clone(),
        });
        Ok(resolved)
    }

    /// Raise an externally triggered alert (handoff, airspace, system).
    /// Idempotent per identity while a matching notification is pending.
    pub async fn raise_alert(
        &self,
        kind: NotificationKind,
        aircraft: Vec<String>,
        sector: Option<String>,
        priority: NotificationPriority,
        message: impl Into<String>,
    ) -> Result<Option<Notification>, EngineError> {
        let spec = AlertSpec {
            identity: AlertIdentity::new(kind, aircraft, sector),
            priority,
            message: message.into(),
        };
        let created = self.notifications.open(spec, Utc::now()).await?;
        if let Some(notification) = &created {
            self.dispatcher.publish(EngineEvent::NotificationCreated {
                notification: notification.clone(),
            });
        }
        Ok(created)
    }

    pub fn subscribe(&self) -> EventStream {
        self.dispatcher.subscribe()
    }

    /// One full detection pass. Called by the tick loop; exposed so tests
    /// can drive the pipeline without a timer.
    pub async fn run_tick(&self) {
        let now = Utc::now();

        // Stage 1: apply the buffered reports, one consistent batch.
        for report in self.store.drain_reports() {
            let sector = self.sectors.sector_for(report.lat, report.lon);
            let state = self
                .store
                .apply_report(&report, &self.config.verification, sector);
            if let Err(err) = self.storage.save_aircraft(&state).await {
                tracing::warn!(aircraft = %state.id, error = %err, "aircraft persist failed");
            }
            self.dispatcher
                .publish(EngineEvent::AircraftUpdated { state });
        }

        // Stage 2: drop aircraft no source has reported recently.
        for id in self.store.remove_stale(now, self.config.stale_after) {
            if let Err(err) = self.storage.delete_aircraft(&id).await {
                tracing::warn!(aircraft = %id, error = %err, "aircraft delete failed");
            }
            tracing::debug!(aircraft = %id, "removed stale aircraft");
            self.dispatcher.publish(EngineEvent::AircraftRemoved { id });
        }

        // Stages 3-4: detect over the snapshot, reconcile notifications.
        let snapshot = self.store.snapshot();
        let candidates = conflict::detect_conflicts(&snapshot, &self.config.separation);
        if !candidates.is_empty() {
            tracing::warn!(count = candidates.len(), "conflict candidates this tick");
        }

        let specs = self.alert_specs(&snapshot, &candidates);
        let (created, resolved) = self.notifications.reconcile(&specs, now).await;

        for notification in created {
            self.dispatcher
                .publish(EngineEvent::NotificationCreated { notification });
        }
        for notification in resolved {
            self.dispatcher
                .publish(EngineEvent::NotificationResolved { notification });
        }
    }

    /// Translate this tick's conditions into alert specs.
    fn alert_specs(
        &self,
        snapshot: &[AircraftState],
        candidates: &[ConflictCandidate],
    ) -> Vec<AlertSpec> {
        let mut specs = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let sector = snapshot
                .iter()
                .find(|state| state.id == candidate.aircraft[0])
                .and_then(|state| state.sector_id.clone());
            specs.push(AlertSpec {
                identity: AlertIdentity::new(
                    NotificationKind::Collision,
                    candidate.aircraft.to_vec(),
                    sector,
                ),
                priority: severity_priority(candidate.severity),
                message: format!(
                    "predicted loss of separation between {} and {}: {:.1} nm, {:.0} ft apart",
                    candidate.aircraft[0],
                    candidate.aircraft[1],
                    candidate.distance_nm,
                    candidate.altitude_delta_ft,
                ),
            });
        }

        for state in snapshot.iter().filter(|state| state.needs_assistance) {
            specs.push(AlertSpec {
                identity: AlertIdentity::new(
                    NotificationKind::Assistance,
                    vec![state.id.clone()],
                    state.sector_id.clone(),
                ),
                priority: NotificationPriority::High,
                message: format!("{} requested assistance", state.callsign),
            });
        }

        specs
    }
}

fn severity_priority(severity: ConflictSeverity) -> NotificationPriority {
    match severity {
        ConflictSeverity::High => NotificationPriority::High,
        ConflictSeverity::Medium => NotificationPriority::Normal,
        ConflictSeverity::Low => NotificationPriority::Low,
    }
}
