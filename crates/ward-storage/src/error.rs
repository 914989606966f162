//! Storage error types.

use std::fmt;

use ward_core::{EntityKind, WardError};

/// Uniqueness rules enforced by the store at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// A bed may hold at most one non-terminal admission.
    BedOccupied { bed_id: String },
    /// A patient may have at most one non-terminal admission.
    PatientAdmitted { patient_id: String },
    /// A bed's occupancy fields disagree with the admissions that reference it.
    OccupancyMismatch { bed_id: String },
    /// A handover record may be corrected only once.
    AlreadySuperseded { handover_id: String },
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BedOccupied { bed_id } => write!(f, "bed {bed_id} already has an active admission"),
            Self::PatientAdmitted { patient_id } => {
                write!(f, "patient {patient_id} already has an active admission")
            }
            Self::OccupancyMismatch { bed_id } => {
                write!(f, "bed {bed_id} occupancy does not match its admissions")
            }
            Self::AlreadySuperseded { handover_id } => {
                write!(f, "handover {handover_id} already has a correction")
            }
        }
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Record not found: {entity}/{id}")]
    NotFound { entity: EntityKind, id: String },

    #[error("Version conflict on {entity}/{id}: expected {expected}, found {actual}")]
    VersionConflict {
        entity: EntityKind,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Record already exists: {entity}/{id}")]
    AlreadyExists { entity: EntityKind, id: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(Constraint),

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StorageError {
    #[must_use]
    pub fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn version_conflict(
        entity: EntityKind,
        id: impl fmt::Display,
        expected: u64,
        actual: u64,
    ) -> Self {
        Self::VersionConflict {
            entity,
            id: id.to_string(),
            expected,
            actual,
        }
    }

    #[must_use]
    pub fn already_exists(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn constraint(constraint: Constraint) -> Self {
        Self::ConstraintViolation(constraint)
    }

    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::VersionConflict { .. } | Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::ConstraintViolation(_) => ErrorCategory::Constraint,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    Conflict,
    Constraint,
    Infrastructure,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Constraint => write!(f, "constraint"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl From<StorageError> for WardError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => WardError::not_found(entity, id),
            StorageError::VersionConflict { entity, id, .. }
            | StorageError::AlreadyExists { entity, id } => WardError::conflict(entity, id),
            StorageError::ConstraintViolation(Constraint::BedOccupied { bed_id }) => {
                WardError::bed_unavailable(bed_id, "occupied")
            }
            StorageError::ConstraintViolation(Constraint::PatientAdmitted { patient_id }) => {
                WardError::patient_already_admitted(patient_id)
            }
            StorageError::ConstraintViolation(Constraint::OccupancyMismatch { bed_id }) => {
                WardError::conflict(EntityKind::Bed, bed_id)
            }
            StorageError::ConstraintViolation(Constraint::AlreadySuperseded { handover_id }) => {
                WardError::invalid_transition(EntityKind::Handover, handover_id, "superseded", "corrected")
            }
            other @ (StorageError::ConnectionError { .. } | StorageError::Internal { .. }) => {
                WardError::collaborator(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found(EntityKind::Bed, "b1");
        assert_eq!(err.to_string(), "Record not found: bed/b1");

        let err = StorageError::version_conflict(EntityKind::Order, "o1", 3, 5);
        assert_eq!(
            err.to_string(),
            "Version conflict on order/o1: expected 3, found 5"
        );
        assert!(err.is_version_conflict());
    }

    #[test]
    fn test_into_ward_error() {
        let err: WardError = StorageError::version_conflict(EntityKind::Order, "o1", 3, 5).into();
        assert_eq!(err.kind(), "concurrency_conflict");

        let err: WardError = StorageError::constraint(Constraint::BedOccupied {
            bed_id: "b1".into(),
        })
        .into();
        assert_eq!(err.kind(), "bed_unavailable");
        assert_eq!(err.user_message(), "This bed is already occupied.");

        let err: WardError = StorageError::constraint(Constraint::PatientAdmitted {
            patient_id: "p1".into(),
        })
        .into();
        assert_eq!(err.kind(), "patient_already_admitted");

        let err: WardError = StorageError::connection_error("refused").into();
        assert_eq!(err.kind(), "collaborator_unavailable");
    }

    #[test]
    fn test_category() {
        assert_eq!(
            StorageError::not_found(EntityKind::Bed, "b").category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            StorageError::internal("x").category().to_string(),
            "internal"
        );
    }
}
