//! Multi-source verification correlation.
//!
//! Merges per-aircraft reports from distinct sources into one verification
//! status. The contributing-source set only grows, so the derived status is
//! monotonically non-decreasing over the life of a track.

use std::collections::BTreeSet;

use crate::error::CoreError;
use crate::geo;
use crate::models::{AircraftState, ReportSource, VerificationReport, VerificationStatus};
use crate::rules::VerificationPolicy;

/// Derive a verification status from a set of distinct sources.
pub fn status_for_sources(
    sources: &BTreeSet<ReportSource>,
    policy: &VerificationPolicy,
) -> VerificationStatus {
    let count = sources.len();
    let authoritative_corroborated = sources.contains(&policy.authoritative) && count >= 2;

    if count >= policy.verified_source_count || authoritative_corroborated {
        VerificationStatus::Verified
    } else if count >= policy.partial_source_count {
        VerificationStatus::PartiallyVerified
    } else {
        VerificationStatus::Unverified
    }
}

/// Fold one report into an aircraft state.
///
/// The reporting source's latest kinematics overwrite the previous snapshot
/// even when they conflict with other sources; the status itself never
/// decreases.
pub fn apply_report(
    state: &mut AircraftState,
    report: &VerificationReport,
    policy: &VerificationPolicy,
) {
    state.lat = report.lat;
    state.lon = report.lon;
    state.altitude_ft = report.altitude_ft;
    state.heading_deg = report.heading_deg;
    state.speed_kt = report.speed_kt;
    state.last_seen = report.timestamp;

    if let Some(callsign) = &report.callsign {
        state.callsign = callsign.clone();
    }
    if report.origin.is_some() {
        state.origin = report.origin.clone();
    }
    if report.destination.is_some() {
        state.destination = report.destination.clone();
    }
    if let Some(flag) = report.needs_assistance {
        state.needs_assistance = flag;
    }

    state.sources.insert(report.source);
    state.verification = state
        .verification
        .max(status_for_sources(&state.sources, policy));
}

/// Reject a report with malformed coordinates or kinematics before it
/// reaches the tick snapshot.
pub fn validate_report(report: &VerificationReport) -> Result<(), CoreError> {
    if report.aircraft_id.trim().is_empty() {
        return Err(CoreError::MissingAircraftId);
    }
    geo::validate_coords(report.lat, report.lon)?;
    if !report.altitude_ft.is_finite() {
        return Err(CoreError::NonFiniteKinematics("altitude_ft"));
    }
    if !report.heading_deg.is_finite() {
        return Err(CoreError::NonFiniteKinematics("heading_deg"));
    }
    if !report.speed_kt.is_finite() {
        return Err(CoreError::NonFiniteKinematics("speed_kt"));
    }
    Ok(())
}
