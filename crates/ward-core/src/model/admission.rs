use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Result, WardError};
use crate::id::{AdmissionId, BedId, PatientId, StaffId};
use crate::model::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionType {
    Emergency,
    Scheduled,
    Transfer,
}

string_enum!(AdmissionType {
    Emergency => "emergency",
    Scheduled => "scheduled",
    Transfer => "transfer",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    Active,
    Critical,
    Stable,
    InTreatment,
    ReadyForDischarge,
    Discharged,
    Transferred,
    Deceased,
}

string_enum!(AdmissionStatus {
    Active => "active",
    Critical => "critical",
    Stable => "stable",
    InTreatment => "in_treatment",
    ReadyForDischarge => "ready_for_discharge",
    Discharged => "discharged",
    Transferred => "transferred",
    Deceased => "deceased",
});

impl AdmissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Discharged | Self::Transferred | Self::Deceased)
    }

    /// Any non-terminal status counts as an active stay occupying a bed.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, target: AdmissionStatus) -> bool {
        self.is_active() && *self != target
    }
}

/// One stretch of time spent in a bed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedMovement {
    pub bed: BedId,
    #[serde(with = "time::serde::rfc3339")]
    pub from: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub until: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub id: AdmissionId,
    pub patient: PatientId,
    pub bed: BedId,
    pub attending: StaffId,
    pub admission_type: AdmissionType,
    pub status: AdmissionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub admitted_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub discharged_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub discharge_summary: Option<String>,
    #[serde(default)]
    pub bed_history: Vec<BedMovement>,
}

impl Admission {
    pub fn new(
        patient: PatientId,
        bed: BedId,
        attending: StaffId,
        admission_type: AdmissionType,
        admitted_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: AdmissionId::generate(),
            patient,
            bed: bed.clone(),
            attending,
            admission_type,
            status: AdmissionStatus::Active,
            admitted_at,
            discharged_at: None,
            discharge_summary: None,
            bed_history: vec![BedMovement {
                bed,
                from: admitted_at,
                until: None,
            }],
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Fails with `AdmissionClosed` for a terminal stay.
    pub fn ensure_open(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(WardError::admission_closed(&self.id, self.status));
        }
        Ok(())
    }

    /// Move along the admission state machine.
    ///
    /// Entering a terminal status stamps `discharged_at` and closes the
    /// current bed movement; releasing the bed itself is the caller's job.
    pub fn transition(&mut self, target: AdmissionStatus, at: OffsetDateTime) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(WardError::invalid_transition(
                EntityKind::Admission,
                &self.id,
                self.status,
                target,
            ));
        }
        self.status = target;
        if target.is_terminal() {
            self.discharged_at = Some(at);
            self.close_current_movement(at);
        }
        Ok(())
    }

    pub fn discharge(&mut self, summary: Option<String>, at: OffsetDateTime) -> Result<()> {
        if self.status.is_terminal() {
            return Err(WardError::already_terminal(
                EntityKind::Admission,
                &self.id,
                self.status,
            ));
        }
        self.transition(AdmissionStatus::Discharged, at)?;
        self.discharge_summary = summary;
        Ok(())
    }

    /// Re-point the admission at a new bed, keeping the movement history.
    pub fn move_to_bed(&mut self, bed: BedId, at: OffsetDateTime) -> Result<()> {
        self.ensure_open()?;
        if bed == self.bed {
            return Err(WardError::validation("admission already occupies this bed"));
        }
        self.close_current_movement(at);
        self.bed_history.push(BedMovement {
            bed: bed.clone(),
            from: at,
            until: None,
        });
        self.bed = bed;
        Ok(())
    }

    fn close_current_movement(&mut self, at: OffsetDateTime) {
        if let Some(current) = self.bed_history.last_mut()
            && current.until.is_none()
        {
            current.until = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn admission() -> Admission {
        Admission::new(
            PatientId::new("p-1"),
            BedId::new("bed-1"),
            StaffId::new("dr-1"),
            AdmissionType::Emergency,
            datetime!(2024-03-01 08:00:00 UTC),
        )
    }

    #[test]
    fn test_new_admission_is_active_with_history() {
        let adm = admission();
        assert_eq!(adm.status, AdmissionStatus::Active);
        assert_eq!(adm.bed_history.len(), 1);
        assert!(adm.bed_history[0].until.is_none());
    }

    #[test]
    fn test_non_terminal_states_are_mutually_reachable() {
        let mut adm = admission();
        let at = datetime!(2024-03-01 09:00:00 UTC);
        for status in [
            AdmissionStatus::Critical,
            AdmissionStatus::Stable,
            AdmissionStatus::InTreatment,
            AdmissionStatus::ReadyForDischarge,
            AdmissionStatus::Active,
            AdmissionStatus::Critical,
        ] {
            adm.transition(status, at).unwrap();
            assert_eq!(adm.status, status);
        }
    }

    #[test]
    fn test_terminal_is_final() {
        let mut adm = admission();
        let at = datetime!(2024-03-02 10:00:00 UTC);
        adm.transition(AdmissionStatus::Deceased, at).unwrap();
        assert_eq!(adm.discharged_at, Some(at));
        assert_eq!(adm.bed_history[0].until, Some(at));

        let err = adm.transition(AdmissionStatus::Active, at).unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
        assert_eq!(adm.ensure_open().unwrap_err().kind(), "admission_closed");
    }

    #[test]
    fn test_same_status_is_rejected() {
        let mut adm = admission();
        let err = adm
            .transition(AdmissionStatus::Active, datetime!(2024-03-01 09:00:00 UTC))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
    }

    #[test]
    fn test_discharge_twice_is_already_terminal() {
        let mut adm = admission();
        let at = datetime!(2024-03-03 12:00:00 UTC);
        adm.discharge(Some("home".into()), at).unwrap();
        assert_eq!(adm.discharge_summary.as_deref(), Some("home"));
        assert_eq!(adm.discharge(None, at).unwrap_err().kind(), "already_terminal");
    }

    #[test]
    fn test_move_to_bed_tracks_history() {
        let mut adm = admission();
        let at = datetime!(2024-03-01 12:00:00 UTC);
        adm.move_to_bed(BedId::new("bed-2"), at).unwrap();
        assert_eq!(adm.bed, BedId::new("bed-2"));
        assert_eq!(adm.bed_history.len(), 2);
        assert_eq!(adm.bed_history[0].until, Some(at));
        assert!(adm.move_to_bed(BedId::new("bed-2"), at).is_err());
    }
}
