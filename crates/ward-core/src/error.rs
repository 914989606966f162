use std::fmt;

use thiserror::Error;
use time::OffsetDateTime;

use crate::model::EntityKind;

/// Error taxonomy for every ward operation.
///
/// All variants except [`WardError::CollaboratorUnavailable`] are expected,
/// recoverable conditions that are rendered back to the caller.
#[derive(Debug, Error)]
pub enum WardError {
    #[error("Invalid transition for {entity} {id}: {from} -> {to}")]
    InvalidTransition {
        entity: EntityKind,
        id: String,
        from: String,
        to: String,
    },

    #[error("Bed {bed_id} is unavailable (status: {status})")]
    BedUnavailable { bed_id: String, status: String },

    #[error("Bed {bed_id} has no active occupant")]
    NotOccupied { bed_id: String },

    #[error("Patient {patient_id} already has an active admission")]
    PatientAlreadyAdmitted { patient_id: String },

    #[error("Admission {admission_id} is closed (status: {status})")]
    AdmissionClosed { admission_id: String, status: String },

    #[error("{entity} {id} is already in terminal status {status}")]
    AlreadyTerminal {
        entity: EntityKind,
        id: String,
        status: String,
    },

    #[error("Medication administration {id} was already recorded as {status}")]
    AlreadyRecorded { id: String, status: String },

    #[error("Medication administration {id} is scheduled at {scheduled_at}; earliest allowed is {earliest}")]
    OutOfWindow {
        id: String,
        scheduled_at: OffsetDateTime,
        earliest: OffsetDateTime,
    },

    #[error("Transfer of admission {admission_id} failed: {reason}")]
    TransferFailed {
        admission_id: String,
        #[source]
        reason: Box<WardError>,
    },

    #[error("Access denied")]
    Forbidden,

    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    #[error("{entity} {id} was modified concurrently")]
    ConcurrencyConflict { entity: EntityKind, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),
}

impl WardError {
    pub fn invalid_transition(
        entity: EntityKind,
        id: impl fmt::Display,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn bed_unavailable(bed_id: impl fmt::Display, status: impl fmt::Display) -> Self {
        Self::BedUnavailable {
            bed_id: bed_id.to_string(),
            status: status.to_string(),
        }
    }

    pub fn not_occupied(bed_id: impl fmt::Display) -> Self {
        Self::NotOccupied {
            bed_id: bed_id.to_string(),
        }
    }

    pub fn patient_already_admitted(patient_id: impl fmt::Display) -> Self {
        Self::PatientAlreadyAdmitted {
            patient_id: patient_id.to_string(),
        }
    }

    pub fn admission_closed(admission_id: impl fmt::Display, status: impl fmt::Display) -> Self {
        Self::AdmissionClosed {
            admission_id: admission_id.to_string(),
            status: status.to_string(),
        }
    }

    pub fn already_terminal(
        entity: EntityKind,
        id: impl fmt::Display,
        status: impl fmt::Display,
    ) -> Self {
        Self::AlreadyTerminal {
            entity,
            id: id.to_string(),
            status: status.to_string(),
        }
    }

    pub fn already_recorded(id: impl fmt::Display, status: impl fmt::Display) -> Self {
        Self::AlreadyRecorded {
            id: id.to_string(),
            status: status.to_string(),
        }
    }

    pub fn out_of_window(
        id: impl fmt::Display,
        scheduled_at: OffsetDateTime,
        earliest: OffsetDateTime,
    ) -> Self {
        Self::OutOfWindow {
            id: id.to_string(),
            scheduled_at,
            earliest,
        }
    }

    pub fn transfer_failed(admission_id: impl fmt::Display, reason: WardError) -> Self {
        // Nested transfer failures collapse to the innermost cause.
        let reason = match reason {
            Self::TransferFailed { reason, .. } => reason,
            other => Box::new(other),
        };
        Self::TransferFailed {
            admission_id: admission_id.to_string(),
            reason,
        }
    }

    pub fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::ConcurrencyConflict {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable(message.into())
    }

    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::BedUnavailable { .. } => "bed_unavailable",
            Self::NotOccupied { .. } => "not_occupied",
            Self::PatientAlreadyAdmitted { .. } => "patient_already_admitted",
            Self::AdmissionClosed { .. } => "admission_closed",
            Self::AlreadyTerminal { .. } => "already_terminal",
            Self::AlreadyRecorded { .. } => "already_recorded",
            Self::OutOfWindow { .. } => "out_of_window",
            Self::TransferFailed { .. } => "transfer_failed",
            Self::Forbidden => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::ConcurrencyConflict { .. } => "concurrency_conflict",
            Self::Validation(_) => "validation",
            Self::CollaboratorUnavailable(_) => "collaborator_unavailable",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Forbidden => ErrorCategory::Access,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::ConcurrencyConflict { .. } => ErrorCategory::Conflict,
            Self::CollaboratorUnavailable(_) => ErrorCategory::Infrastructure,
            _ => ErrorCategory::Domain,
        }
    }

    /// Only optimistic-concurrency conflicts are worth retrying with fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden)
    }

    /// Message suitable for inline display to ward staff.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidTransition { entity, from, to, .. } => {
                format!("This {entity} cannot move from {from} to {to}.")
            }
            Self::BedUnavailable { status, .. } => match status.as_str() {
                "occupied" => "This bed is already occupied.".to_string(),
                "maintenance" => "This bed is under maintenance.".to_string(),
                "reserved" => "This bed is reserved.".to_string(),
                other => format!("This bed is not available ({other})."),
            },
            Self::NotOccupied { .. } => "This bed has no current patient.".to_string(),
            Self::PatientAlreadyAdmitted { .. } => {
                "This patient is already admitted to a bed.".to_string()
            }
            Self::AdmissionClosed { status, .. } => {
                format!("This admission is closed ({status}).")
            }
            Self::AlreadyTerminal { entity, status, .. } => {
                format!("This {entity} is already {status}.")
            }
            Self::AlreadyRecorded { status, .. } => {
                format!("This dose has already been recorded as {status}.")
            }
            Self::OutOfWindow { .. } => "This dose is not due yet.".to_string(),
            Self::TransferFailed { reason, .. } => {
                format!("The transfer could not be completed. {}", reason.user_message())
            }
            Self::Forbidden => "You do not have access to perform this action.".to_string(),
            Self::NotFound { entity, .. } => format!("The requested {entity} was not found."),
            Self::ConcurrencyConflict { .. } => {
                "Someone else updated this record. Please refresh and try again.".to_string()
            }
            Self::Validation(message) => message.clone(),
            Self::CollaboratorUnavailable(_) => {
                "The system is having trouble right now. Please retry.".to_string()
            }
        }
    }
}

/// Error categories for logging and transport mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The action was invalid for the current state.
    Domain,
    /// Access policy denial.
    Access,
    NotFound,
    /// Optimistic concurrency conflict.
    Conflict,
    /// A collaborator (storage, network) failed.
    Infrastructure,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain => write!(f, "domain"),
            Self::Access => write!(f, "access"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

/// Convenience result type for ward operations.
pub type Result<T> = std::result::Result<T, WardError>;
