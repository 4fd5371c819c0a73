pub mod conflict;
pub mod error;
pub mod geo;
pub mod models;
pub mod rules;
pub mod verify;

pub use conflict::detect_conflicts;
pub use error::CoreError;
pub use models::{
    AircraftState, AlertIdentity, ConflictCandidate, ConflictSeverity, Notification,
    NotificationKind, NotificationPriority, NotificationStatus, ReportSource, VerificationReport,
    VerificationStatus,
};
pub use rules::{SeparationRules, SeverityBand, VerificationPolicy};
pub use verify::{apply_report, validate_report};
