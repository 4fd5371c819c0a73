//! Configurable thresholds for verification and separation.
//!
//! The default band distances and source counts are presentation values
//! carried over from the operator console, not derived from a published
//! separation standard. Deployments tune them here instead of editing the
//! detection code.

use serde::{Deserialize, Serialize};

use crate::models::{ConflictSeverity, ReportSource};

/// One severity band: a pair is inside the band when its horizontal
/// distance and altitude delta are both strictly below these bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityBand {
    pub max_distance_nm: f64,
    pub max_altitude_delta_ft: f64,
    pub severity: ConflictSeverity,
}

/// Separation thresholds for the conflict detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparationRules {
    /// Bands ordered tightest first; classification takes the first match.
    /// Bounds are strict (`<`), so a pair sitting exactly on a band edge
    /// falls through to the next looser band.
    pub bands: Vec<SeverityBand>,
    /// Floor applied to the closing rate when estimating time-to-conflict,
    /// in knots. Keeps the estimate finite for diverging or co-located
    /// pairs.
    pub closing_rate_floor_kt: f64,
}

impl Default for SeparationRules {
    fn default() -> Self {
        Self {
            bands: vec![
                SeverityBand {
                    max_distance_nm: 10.0,
                    max_altitude_delta_ft: 1000.0,
                    severity: ConflictSeverity::High,
                },
                SeverityBand {
                    max_distance_nm: 20.0,
                    max_altitude_delta_ft: 2000.0,
                    severity: ConflictSeverity::Medium,
                },
                SeverityBand {
                    max_distance_nm: 30.0,
                    max_altitude_delta_ft: 3000.0,
                    severity: ConflictSeverity::Low,
                },
            ],
            closing_rate_floor_kt: 30.0,
        }
    }
}

impl SeparationRules {
    /// Classify a pair by the first (tightest) band it falls inside.
    /// Returns `None` when the pair breaches no band.
    pub fn classify(
        &self,
        distance_nm: f64,
        altitude_delta_ft: f64,
    ) -> Option<ConflictSeverity> {
        self.bands
            .iter()
            .find(|band| {
                distance_nm < band.max_distance_nm
                    && altitude_delta_ft < band.max_altitude_delta_ft
            })
            .map(|band| band.severity)
    }
}

/// Source-count thresholds for the verification correlator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationPolicy {
    /// Distinct sources required for partial verification.
    pub partial_source_count: usize,
    /// Distinct sources required for full verification.
    pub verified_source_count: usize,
    /// A report from this source plus any one corroborating source also
    /// fully verifies the aircraft.
    pub authoritative: ReportSource,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            partial_source_count: 2,
            verified_source_count: 3,
            authoritative: ReportSource::AdsB,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_strictly_nested() {
        let rules = SeparationRules::default();
        // Anything classified High must also sit inside the Medium and Low bounds.
        for (distance, delta) in [(5.0, 500.0), (9.9, 999.0), (0.0, 0.0)] {
            assert_eq!(rules.classify(distance, delta), Some(ConflictSeverity::High));
            for band in &rules.bands {
                assert!(distance < band.max_distance_nm);
                assert!(delta < band.max_altitude_delta_ft);
            }
        }
    }

    #[test]
    fn band_edges_fall_to_the_looser_band() {
        let rules = SeparationRules::default();
        assert_eq!(rules.classify(10.0, 500.0), Some(ConflictSeverity::Medium));
        assert_eq!(rules.classify(5.0, 1000.0), Some(ConflictSeverity::Medium));
        assert_eq!(rules.classify(30.0, 500.0), None);
        assert_eq!(rules.classify(5.0, 3000.0), None);
    }

    #[test]
    fn wide_pairs_are_not_at_risk() {
        let rules = SeparationRules::default();
        assert_eq!(rules.classify(120.0, 200.0), None);
        assert_eq!(rules.classify(2.0, 9000.0), None);
    }
}
