//! Validation errors raised at the ingestion boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("coordinate is not a finite number")]
    NonFiniteCoordinate,
    #[error("kinematic field {0} is not a finite number")]
    NonFiniteKinematics(&'static str),
    #[error("report is missing an aircraft id")]
    MissingAircraftId,
}
