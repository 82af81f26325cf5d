// Typed outcomes for store operations

use crate::record::VisitKind;
use std::path::PathBuf;
use thiserror::Error;

/// A draft violated one of the per-kind visit rules
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("patient name is required")]
    MissingPatientName,

    #[error("visit date is required")]
    MissingVisitDate,

    #[error("duration must be a positive number of minutes")]
    NonPositiveDuration,

    #[error("{kind} visits must last at least {minimum} minutes (got {actual})")]
    DurationBelowMinimum { kind: VisitKind, minimum: u32, actual: u32 },

    #[error("emergency visits require a doctor name")]
    MissingDoctorName,

    #[error("{field} must not contain line breaks")]
    LineBreak { field: &'static str },
}

/// Errors returned by [`crate::Store`] operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("visit {0} not found")]
    NotFound(u32),

    #[error("no visit ids left to assign")]
    IdsExhausted,

    /// The in-memory change stands; only writing it to disk failed.
    #[error("failed to persist visits to {path:?}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::DurationBelowMinimum {
            kind: VisitKind::FollowUp,
            minimum: 10,
            actual: 0,
        };
        assert_eq!(err.to_string(), "FollowUp visits must last at least 10 minutes (got 0)");
        assert_eq!(
            ValidationError::LineBreak { field: "description" }.to_string(),
            "description must not contain line breaks"
        );
    }

    #[test]
    fn test_store_error_from_validation() {
        let err: StoreError = ValidationError::MissingPatientName.into();
        assert!(matches!(err, StoreError::Validation(ValidationError::MissingPatientName)));
        assert!(!err.is_not_found());
        assert!(StoreError::NotFound(7).is_not_found());
        assert_eq!(StoreError::NotFound(7).to_string(), "visit 7 not found");
    }
}
