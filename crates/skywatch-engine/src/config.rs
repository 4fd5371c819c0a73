//! Engine configuration from environment.

use std::env;
use std::time::Duration;

use skywatch_core::{SeparationRules, VerificationPolicy};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed interval between detection passes.
    pub tick_interval: Duration,
    /// An aircraft with no report from any source for this long is removed.
    pub stale_after: Duration,
    /// Consecutive clear ticks before a condition-driven notification
    /// auto-resolves.
    pub debounce_ticks: u32,
    /// Retries for a failed storage write before the transition is
    /// abandoned for this tick.
    pub storage_write_retries: u32,
    /// Per-observer event queue depth; a lagging observer beyond this gets
    /// a resync marker instead of the dropped events.
    pub event_capacity: usize,
    /// Sqlite database path; `None` selects the in-memory store.
    pub db_path: Option<String>,
    pub separation: SeparationRules,
    pub verification: VerificationPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
            stale_after: Duration::from_secs(30),
            debounce_ticks: 3,
            storage_write_retries: 2,
            event_capacity: 256,
            db_path: None,
            separation: SeparationRules::default(),
            verification: VerificationPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_interval: env::var("SKYWATCH_TICK_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.tick_interval),
            stale_after: env::var("SKYWATCH_STALE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.stale_after),
            debounce_ticks: env::var("SKYWATCH_DEBOUNCE_TICKS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.debounce_ticks),
            storage_write_retries: env::var("SKYWATCH_WRITE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.storage_write_retries),
            event_capacity: env::var("SKYWATCH_EVENT_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.event_capacity),
            db_path: env::var("SKYWATCH_DB").ok(),
            separation: defaults.separation,
            verification: defaults.verification,
        }
    }
}
