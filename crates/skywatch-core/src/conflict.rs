//! Pairwise conflict scanning over a fleet snapshot.
//!
//! The scan is a full O(n²) pass over the live aircraft set. Fleet sizes
//! here are bounded in the tens to hundreds, so the quadratic pass is a
//! known scaling limit, accepted in preference to spatial approximations
//! that would change the output set.

use crate::geo;
use crate::models::{AircraftState, ConflictCandidate};
use crate::rules::SeparationRules;

/// Scan every unordered aircraft pair and return the candidates breaching
/// a severity band. Stateless: the returned set replaces, never merges
/// with, the previous tick's candidates. Each pair appears at most once,
/// with its ids sorted.
pub fn detect_conflicts(
    snapshot: &[AircraftState],
    rules: &SeparationRules,
) -> Vec<ConflictCandidate> {
    let mut candidates = Vec::new();
    for i in 0..snapshot.len() {
        for j in (i + 1)..snapshot.len() {
            if let Some(candidate) = evaluate_pair(&snapshot[i], &snapshot[j], rules) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

fn evaluate_pair(
    a: &AircraftState,
    b: &AircraftState,
    rules: &SeparationRules,
) -> Option<ConflictCandidate> {
    if a.id == b.id {
        return None;
    }

    let distance_nm = geo::distance_nm(a.lat, a.lon, b.lat, b.lon);
    let altitude_delta_ft = (a.altitude_ft - b.altitude_ft).abs();
    let severity = rules.classify(distance_nm, altitude_delta_ft)?;
    let time_to_conflict_s = time_to_conflict_s(a, b, distance_nm, rules);

    let (first, second) = if a.id <= b.id { (a, b) } else { (b, a) };
    Some(ConflictCandidate {
        aircraft: [first.id.clone(), second.id.clone()],
        distance_nm,
        altitude_delta_ft,
        time_to_conflict_s,
        severity,
    })
}

/// Closing rate of `a` toward `b` along the line between them, in knots.
/// Positive when the pair is converging.
fn closing_rate_kt(a: &AircraftState, b: &AircraftState) -> f64 {
    let bearing_ab = geo::bearing(a.lat, a.lon, b.lat, b.lon);
    let a_along = a.speed_kt * (a.heading_deg.to_radians() - bearing_ab).cos();
    let b_along = b.speed_kt * (b.heading_deg.to_radians() - bearing_ab).cos();
    a_along - b_along
}

/// Proportional time-to-conflict estimate in seconds.
///
/// `distance / max(closing_rate, floor)`: deterministic, and monotonic in
/// distance for a fixed closing rate. Co-located pairs are already in
/// conflict and report zero; the floor keeps the estimate finite for
/// diverging pairs.
fn time_to_conflict_s(
    a: &AircraftState,
    b: &AircraftState,
    distance_nm: f64,
    rules: &SeparationRules,
) -> f64 {
    if distance_nm <= f64::EPSILON {
        return 0.0;
    }
    let floor = rules.closing_rate_floor_kt.max(1.0);
    let closing = closing_rate_kt(a, b).max(floor);
    distance_nm / closing * 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictSeverity, ReportSource, VerificationReport};
    use chrono::Utc;

    fn aircraft(
        id: &str,
        lat: f64,
        lon: f64,
        altitude_ft: f64,
        heading_deg: f64,
        speed_kt: f64,
    ) -> AircraftState {
        let report = VerificationReport {
            aircraft_id: id.into(),
            callsign: None,
            source: ReportSource::AdsB,
            lat,
            lon,
            altitude_ft,
            heading_deg,
            speed_kt,
            origin: None,
            destination: None,
            needs_assistance: None,
            timestamp: Utc::now(),
        };
        let mut state = AircraftState::from_report(&report);
        state.heading_deg = heading_deg;
        state.speed_kt = speed_kt;
        state
    }

    #[test]
    fn close_pair_at_cruise_is_high_severity() {
        // Roughly one nautical mile apart, 50 ft of vertical separation.
        let a = aircraft("N100", 39.10, -94.60, 35_000.0, 90.0, 440.0);
        let b = aircraft("N200", 39.10, -94.62, 35_050.0, 270.0, 430.0);

        let candidates = detect_conflicts(&[a, b], &SeparationRules::default());
        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.severity, ConflictSeverity::High);
        assert_eq!(candidate.aircraft, ["N100".to_string(), "N200".to_string()]);
        assert!(candidate.distance_nm < 1.1, "got {}", candidate.distance_nm);
        assert!((candidate.altitude_delta_ft - 50.0).abs() < 1e-9);
    }

    #[test]
    fn detection_is_symmetric_in_pair_order() {
        let a = aircraft("N100", 39.10, -94.60, 35_000.0, 90.0, 440.0);
        let b = aircraft("N200", 39.10, -94.62, 35_050.0, 270.0, 430.0);
        let rules = SeparationRules::default();

        let forward = detect_conflicts(&[a.clone(), b.clone()], &rules);
        let backward = detect_conflicts(&[b, a], &rules);
        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
        assert_eq!(forward[0].aircraft, backward[0].aircraft);
        assert_eq!(forward[0].severity, backward[0].severity);
        assert!((forward[0].distance_nm - backward[0].distance_nm).abs() < 1e-9);
    }

    #[test]
    fn a_pair_yields_at_most_one_candidate_per_scan() {
        let a = aircraft("N100", 39.10, -94.60, 35_000.0, 90.0, 440.0);
        let b = aircraft("N200", 39.10, -94.62, 35_050.0, 270.0, 430.0);
        let c = aircraft("N300", 45.0, -100.0, 10_000.0, 0.0, 250.0);

        let candidates = detect_conflicts(&[a, b, c], &SeparationRules::default());
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn separated_fleet_produces_no_candidates() {
        let a = aircraft("N100", 39.0, -94.0, 35_000.0, 90.0, 440.0);
        let b = aircraft("N200", 41.0, -90.0, 20_000.0, 270.0, 430.0);
        assert!(detect_conflicts(&[a, b], &SeparationRules::default()).is_empty());
    }

    #[test]
    fn altitude_separation_alone_clears_a_pair() {
        let a = aircraft("N100", 39.10, -94.60, 35_000.0, 90.0, 440.0);
        let b = aircraft("N200", 39.10, -94.62, 39_500.0, 270.0, 430.0);
        assert!(detect_conflicts(&[a, b], &SeparationRules::default()).is_empty());
    }

    #[test]
    fn co_located_aircraft_do_not_produce_nan() {
        let a = aircraft("N100", 39.10, -94.60, 35_000.0, 0.0, 0.0);
        let b = aircraft("N200", 39.10, -94.60, 35_000.0, 0.0, 0.0);

        let candidates = detect_conflicts(&[a, b], &SeparationRules::default());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].severity, ConflictSeverity::High);
        assert!(candidates[0].time_to_conflict_s.is_finite());
        assert_eq!(candidates[0].time_to_conflict_s, 0.0);
    }

    #[test]
    fn time_to_conflict_shrinks_with_distance() {
        let rules = SeparationRules::default();
        // Same geometry, head-on, at two different ranges.
        let near_a = aircraft("N100", 39.10, -94.60, 35_000.0, 270.0, 400.0);
        let near_b = aircraft("N200", 39.10, -94.70, 35_000.0, 90.0, 400.0);
        let far_a = aircraft("N100", 39.10, -94.60, 35_000.0, 270.0, 400.0);
        let far_b = aircraft("N200", 39.10, -94.80, 35_000.0, 90.0, 400.0);

        let near = detect_conflicts(&[near_a, near_b], &rules);
        let far = detect_conflicts(&[far_a, far_b], &rules);
        assert_eq!(near.len(), 1);
        assert_eq!(far.len(), 1);
        assert!(near[0].time_to_conflict_s <= far[0].time_to_conflict_s);
    }

    #[test]
    fn diverging_pair_keeps_a_finite_estimate() {
        // Same track and speed: geometric closing rate is zero, the floor
        // keeps the estimate positive and finite.
        let a = aircraft("N100", 39.10, -94.60, 35_000.0, 270.0, 400.0);
        let b = aircraft("N200", 39.10, -94.70, 35_000.0, 270.0, 400.0);

        let candidates = detect_conflicts(&[a, b], &SeparationRules::default());
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].time_to_conflict_s.is_finite());
        assert!(candidates[0].time_to_conflict_s > 0.0);
    }
}
