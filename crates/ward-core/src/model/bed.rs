use serde::{Deserialize, Serialize};

use crate::error::{Result, WardError};
use crate::id::{AdmissionId, BedId, WardId};
use crate::model::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    Vacant,
    Occupied,
    Reserved,
    Maintenance,
}

string_enum!(BedStatus {
    Vacant => "vacant",
    Occupied => "occupied",
    Reserved => "reserved",
    Maintenance => "maintenance",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedLocation {
    pub ward: WardId,
    pub room: String,
    pub position: String,
}

impl BedLocation {
    pub fn new(ward: impl Into<WardId>, room: impl Into<String>, position: impl Into<String>) -> Self {
        Self {
            ward: ward.into(),
            room: room.into(),
            position: position.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ward.as_str().trim().is_empty()
            || self.room.trim().is_empty()
            || self.position.trim().is_empty()
        {
            return Err(WardError::validation(
                "bed location requires ward, room and position",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    pub id: BedId,
    pub location: BedLocation,
    pub status: BedStatus,
    /// Set exactly when `status` is `occupied`.
    pub current_admission: Option<AdmissionId>,
}

impl Bed {
    pub fn new(location: BedLocation) -> Self {
        Self {
            id: BedId::generate(),
            location,
            status: BedStatus::Vacant,
            current_admission: None,
        }
    }

    pub fn ward(&self) -> &WardId {
        &self.location.ward
    }

    pub fn is_occupied(&self) -> bool {
        self.status == BedStatus::Occupied
    }

    /// Bind an admission to this bed. Only a vacant bed accepts an occupant.
    pub fn occupy(&mut self, admission: &AdmissionId) -> Result<()> {
        if self.status != BedStatus::Vacant {
            return Err(WardError::bed_unavailable(&self.id, self.status));
        }
        self.status = BedStatus::Occupied;
        self.current_admission = Some(admission.clone());
        Ok(())
    }

    /// Free the bed, returning the admission that held it.
    pub fn release(&mut self) -> Result<AdmissionId> {
        match (self.status, self.current_admission.take()) {
            (BedStatus::Occupied, Some(admission)) => {
                self.status = BedStatus::Vacant;
                Ok(admission)
            }
            (_, previous) => {
                self.current_admission = previous;
                Err(WardError::not_occupied(&self.id))
            }
        }
    }

    /// Administrative status change (reserve, maintenance, back to vacant).
    ///
    /// Occupancy is never set here; it only follows from admissions.
    pub fn set_status(&mut self, target: BedStatus) -> Result<()> {
        if target == BedStatus::Occupied
            || self.status == BedStatus::Occupied
            || target == self.status
        {
            return Err(WardError::invalid_transition(
                EntityKind::Bed,
                &self.id,
                self.status,
                target,
            ));
        }
        self.status = target;
        Ok(())
    }

    /// Checks the local half of the occupancy invariant.
    pub fn is_consistent(&self) -> bool {
        self.is_occupied() == self.current_admission.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bed() -> Bed {
        Bed::new(BedLocation::new("ward-a", "101", "A"))
    }

    #[test]
    fn test_new_bed_is_vacant() {
        let bed = bed();
        assert_eq!(bed.status, BedStatus::Vacant);
        assert!(bed.current_admission.is_none());
        assert!(bed.is_consistent());
    }

    #[test]
    fn test_occupy_and_release() {
        let mut bed = bed();
        let admission = AdmissionId::new("adm-1");
        bed.occupy(&admission).unwrap();
        assert!(bed.is_occupied());
        assert_eq!(bed.current_admission.as_ref(), Some(&admission));

        let released = bed.release().unwrap();
        assert_eq!(released, admission);
        assert_eq!(bed.status, BedStatus::Vacant);
        assert!(bed.is_consistent());
    }

    #[test]
    fn test_occupy_requires_vacant() {
        let mut bed = bed();
        bed.occupy(&AdmissionId::new("adm-1")).unwrap();
        let err = bed.occupy(&AdmissionId::new("adm-2")).unwrap_err();
        assert_eq!(err.kind(), "bed_unavailable");
        assert_eq!(bed.current_admission, Some(AdmissionId::new("adm-1")));

        let mut maintenance = self::bed();
        maintenance.set_status(BedStatus::Maintenance).unwrap();
        assert_eq!(
            maintenance.occupy(&AdmissionId::new("adm-3")).unwrap_err().kind(),
            "bed_unavailable"
        );
    }

    #[test]
    fn test_release_vacant_bed_fails() {
        let mut bed = bed();
        assert_eq!(bed.release().unwrap_err().kind(), "not_occupied");
    }

    #[test]
    fn test_occupied_bed_cannot_go_to_maintenance() {
        let mut bed = bed();
        bed.occupy(&AdmissionId::new("adm-1")).unwrap();
        let err = bed.set_status(BedStatus::Maintenance).unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
        assert!(bed.is_occupied());
    }

    #[test]
    fn test_set_status_never_occupies() {
        let mut bed = bed();
        assert!(bed.set_status(BedStatus::Occupied).is_err());
        bed.set_status(BedStatus::Reserved).unwrap();
        bed.set_status(BedStatus::Vacant).unwrap();
        assert!(bed.set_status(BedStatus::Vacant).is_err());
    }

    #[test]
    fn test_location_validation() {
        assert!(BedLocation::new("ward-a", "", "A").validate().is_err());
        assert!(BedLocation::new("ward-a", "101", "A").validate().is_ok());
    }
}
