//! Live aircraft store and report inbox.
//!
//! Reports arrive asynchronously between ticks and are buffered here; the
//! tick drains them in one atomic take so every pass works from a
//! consistent snapshot. The correlator is the only writer of aircraft
//! kinematics and verification.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use skywatch_core::{verify, AircraftState, VerificationPolicy, VerificationReport};

#[derive(Default)]
pub struct LiveStore {
    aircraft: DashMap<String, AircraftState>,
    inbox: Mutex<Vec<VerificationReport>>,
}

impl LiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a report for the next tick.
    pub fn buffer_report(&self, report: VerificationReport) {
        let mut inbox = self
            .inbox
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inbox.push(report);
    }

    /// Take every buffered report in one atomic swap.
    pub fn drain_reports(&self) -> Vec<VerificationReport> {
        let mut inbox = self
            .inbox
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        std::mem::take(&mut *inbox)
    }

    /// Correlate one report into the live set, creating the aircraft on
    /// first sighting. Returns the updated state.
    pub fn apply_report(
        &self,
        report: &VerificationReport,
        policy: &VerificationPolicy,
        sector_id: Option<String>,
    ) -> AircraftState {
        let mut entry = self
            .aircraft
            .entry(report.aircraft_id.clone())
            .or_insert_with(|| AircraftState::from_report(report));
        verify::apply_report(&mut entry, report, policy);
        entry.sector_id = sector_id;
        entry.clone()
    }

    /// Consistent snapshot of the live set, ordered by aircraft id.
    pub fn snapshot(&self) -> Vec<AircraftState> {
        let mut states: Vec<AircraftState> =
            self.aircraft.iter().map(|r| r.value().clone()).collect();
        states.sort_by(|a, b| a.id.cmp(&b.id));
        states
    }

    pub fn get(&self, id: &str) -> Option<AircraftState> {
        self.aircraft.get(id).map(|r| r.value().clone())
    }

    /// Remove aircraft no source has reported within `window`. Returns the
    /// removed ids.
    pub fn remove_stale(&self, now: DateTime<Utc>, window: std::time::Duration) -> Vec<String> {
        let mut removed = Vec::new();
        self.aircraft.retain(|id, state| {
            let stale = now
                .signed_duration_since(state.last_seen)
                .to_std()
                .map(|age| age > window)
                .unwrap_or(false);
            if stale {
                removed.push(id.clone());
            }
            !stale
        });
        removed
    }

    /// Seed the live set from persisted state at startup.
    pub fn hydrate(&self, states: Vec<AircraftState>) {
        for state in states {
            self.aircraft.insert(state.id.clone(), state);
        }
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }
}
