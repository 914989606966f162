//! Ward domain model.
//!
//! Each submodule owns one entity and the pure state machine that governs it.
//! Methods here mutate an in-memory value and return a [`WardError`] when a
//! transition is not permitted; persistence, access control and event
//! emission are layered on top by the engine.
//!
//! [`WardError`]: crate::WardError

/// Implements `as_str`, `Display` and `FromStr` for a snake_case status enum.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::WardError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::WardError::validation(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

pub mod actor;
pub mod admission;
pub mod bed;
pub mod emergency;
pub mod handover;
pub mod medication;
pub mod order;
pub mod supply;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use actor::{Actor, Role};
pub use admission::{Admission, AdmissionStatus, AdmissionType, BedMovement};
pub use bed::{Bed, BedLocation, BedStatus};
pub use emergency::{EmergencyEvent, EmergencyStatus, Severity};
pub use handover::{HandoverContent, HandoverRecord, HandoverReview, HandoverSignoff, HandoverStatus};
pub use medication::{
    AdministrationDetails, AdministrationStatus, Frequency, MedicationAdministration,
    MedicationSchedule, Regimen, ScheduleStatus, SkipDisposition,
};
pub use order::{DoctorOrder, OrderPriority, OrderStatus, OrderType};
pub use supply::{SupplyRequest, SupplyStatus, SupplyUrgency};

/// Kind of entity, used by the access policy, errors and the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Bed,
    Admission,
    Order,
    MedicationSchedule,
    MedicationAdministration,
    Emergency,
    SupplyRequest,
    Handover,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bed => "bed",
            Self::Admission => "admission",
            Self::Order => "order",
            Self::MedicationSchedule => "medication schedule",
            Self::MedicationAdministration => "medication administration",
            Self::Emergency => "emergency",
            Self::SupplyRequest => "supply request",
            Self::Handover => "handover",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
