//! Core data models for the tracking and notification pipeline.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Data source contributing position reports for an aircraft.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    #[serde(rename = "adsb")]
    AdsB,
    Radar,
    Gps,
}

/// How well corroborated an aircraft's position is across sources.
///
/// Variants are ordered so that a higher value means better corroboration;
/// the correlator never moves a state to a lower variant.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    PartiallyVerified,
    Verified,
}

/// Current state of a tracked aircraft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftState {
    pub id: String,
    pub callsign: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: f64,
    pub heading_deg: f64,
    pub speed_kt: f64,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub verification: VerificationStatus,
    /// Distinct sources that have reported this aircraft.
    pub sources: BTreeSet<ReportSource>,
    #[serde(default)]
    pub needs_assistance: bool,
    pub sector_id: Option<String>,
    pub last_seen: DateTime<Utc>,
}

impl AircraftState {
    /// Create a fresh state for a first sighting. Kinematics and the
    /// contributing-source set are filled in by the correlator.
    pub fn from_report(report: &VerificationReport) -> Self {
        Self {
            id: report.aircraft_id.clone(),
            callsign: report
                .callsign
                .clone()
                .unwrap_or_else(|| report.aircraft_id.clone()),
            lat: report.lat,
            lon: report.lon,
            altitude_ft: report.altitude_ft,
            heading_deg: report.heading_deg,
            speed_kt: report.speed_kt,
            origin: report.origin.clone(),
            destination: report.destination.clone(),
            verification: VerificationStatus::Unverified,
            sources: BTreeSet::new(),
            needs_assistance: false,
            sector_id: None,
            last_seen: report.timestamp,
        }
    }
}

/// One position report from a single source. Ephemeral input; not stored
/// beyond correlation into [`AircraftState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub aircraft_id: String,
    #[serde(default)]
    pub callsign: Option<String>,
    pub source: ReportSource,
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: f64,
    #[serde(default)]
    pub heading_deg: f64,
    #[serde(default)]
    pub speed_kt: f64,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub needs_assistance: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

/// Severity of a detected proximity conflict.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

/// A pair of aircraft currently breaching separation thresholds.
///
/// Recomputed from scratch every tick; the id pair is stored sorted so the
/// candidate is order-independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCandidate {
    pub aircraft: [String; 2],
    pub distance_nm: f64,
    pub altitude_delta_ft: f64,
    pub time_to_conflict_s: f64,
    pub severity: ConflictSeverity,
}

/// Category of an operator notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Collision,
    Handoff,
    Airspace,
    Assistance,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    High,
    Normal,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Resolved,
}

/// Logical identity of an alert: the dedupe key for notification creation.
///
/// Two qualifying conditions with the same kind, aircraft set and sector
/// describe the same alert, regardless of aircraft ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertIdentity {
    pub kind: NotificationKind,
    pub aircraft: Vec<String>,
    pub sector: Option<String>,
}

impl AlertIdentity {
    pub fn new(
        kind: NotificationKind,
        mut aircraft: Vec<String>,
        sector: Option<String>,
    ) -> Self {
        aircraft.sort();
        aircraft.dedup();
        Self {
            kind,
            aircraft,
            sector,
        }
    }
}

/// An operator-facing notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub status: NotificationStatus,
    /// Sorted ids of the aircraft this notification concerns.
    pub aircraft: Vec<String>,
    pub sector_id: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn identity(&self) -> AlertIdentity {
        AlertIdentity::new(self.kind, self.aircraft.clone(), self.sector_id.clone())
    }
}
