//! Versioned record types shared by every store.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use ward_core::model::{
    Admission, Bed, DoctorOrder, EmergencyEvent, HandoverRecord, MedicationAdministration,
    MedicationSchedule, SupplyRequest,
};
use ward_core::{
    AdministrationId, AdmissionId, BedId, EmergencyId, EntityKind, HandoverId, OrderId,
    ScheduleId, SupplyRequestId,
};

/// An entity that can be persisted.
pub trait Record: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static;
    const KIND: EntityKind;

    fn id(&self) -> &Self::Id;
}

macro_rules! impl_record {
    ($($ty:ty => $id:ty, $kind:expr;)+) => {
        $(
            impl Record for $ty {
                type Id = $id;
                const KIND: EntityKind = $kind;

                fn id(&self) -> &Self::Id {
                    &self.id
                }
            }
        )+
    };
}

impl_record! {
    Bed => BedId, EntityKind::Bed;
    Admission => AdmissionId, EntityKind::Admission;
    DoctorOrder => OrderId, EntityKind::Order;
    MedicationSchedule => ScheduleId, EntityKind::MedicationSchedule;
    MedicationAdministration => AdministrationId, EntityKind::MedicationAdministration;
    EmergencyEvent => EmergencyId, EntityKind::Emergency;
    SupplyRequest => SupplyRequestId, EntityKind::SupplyRequest;
    HandoverRecord => HandoverId, EntityKind::Handover;
}

/// A record as stored, with its version metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    #[serde(flatten)]
    pub record: T,
    /// Optimistic-concurrency token; also the change-feed position.
    pub version: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl<T: Record> Stored<T> {
    pub fn id(&self) -> &T::Id {
        self.record.id()
    }

    pub fn into_record(self) -> T {
        self.record
    }

    /// Successor of this entry holding `record` at `version`.
    #[must_use]
    pub fn next(&self, record: T, version: u64, at: OffsetDateTime) -> Self {
        Self {
            record,
            version,
            created_at: self.created_at,
            last_updated: at,
        }
    }
}

impl<T> std::ops::Deref for Stored<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

/// A single write inside an aggregate commit.
#[derive(Debug, Clone)]
pub enum Write<T> {
    /// Create a record whose id must not exist yet.
    Insert(T),
    /// Replace a record, provided it is still at `expected_version`.
    Update { record: T, expected_version: u64 },
}

impl<T: Record> Write<T> {
    pub fn update(stored: &Stored<T>, record: T) -> Self {
        Self::Update {
            record,
            expected_version: stored.version,
        }
    }

    pub fn record(&self) -> &T {
        match self {
            Self::Insert(record) | Self::Update { record, .. } => record,
        }
    }
}

/// All-or-nothing write to the bed/admission aggregate.
#[derive(Debug, Clone, Default)]
pub struct OccupancyCommit {
    pub beds: Vec<Write<Bed>>,
    pub admissions: Vec<Write<Admission>>,
}

impl OccupancyCommit {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bed(mut self, write: Write<Bed>) -> Self {
        self.beds.push(write);
        self
    }

    #[must_use]
    pub fn admission(mut self, write: Write<Admission>) -> Self {
        self.admissions.push(write);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.beds.is_empty() && self.admissions.is_empty()
    }
}

/// Records written by an [`OccupancyCommit`], in commit order.
#[derive(Debug, Clone, Default)]
pub struct OccupancyOutcome {
    pub beds: Vec<Stored<Bed>>,
    pub admissions: Vec<Stored<Admission>>,
}

/// One entry in the change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum Change {
    Bed(Stored<Bed>),
    Admission(Stored<Admission>),
    Order(Stored<DoctorOrder>),
    MedicationSchedule(Stored<MedicationSchedule>),
    MedicationAdministration(Stored<MedicationAdministration>),
    Emergency(Stored<EmergencyEvent>),
    SupplyRequest(Stored<SupplyRequest>),
    Handover(Stored<HandoverRecord>),
}

impl Change {
    pub fn version(&self) -> u64 {
        match self {
            Self::Bed(s) => s.version,
            Self::Admission(s) => s.version,
            Self::Order(s) => s.version,
            Self::MedicationSchedule(s) => s.version,
            Self::MedicationAdministration(s) => s.version,
            Self::Emergency(s) => s.version,
            Self::SupplyRequest(s) => s.version,
            Self::Handover(s) => s.version,
        }
    }

    pub fn entity(&self) -> EntityKind {
        match self {
            Self::Bed(_) => EntityKind::Bed,
            Self::Admission(_) => EntityKind::Admission,
            Self::Order(_) => EntityKind::Order,
            Self::MedicationSchedule(_) => EntityKind::MedicationSchedule,
            Self::MedicationAdministration(_) => EntityKind::MedicationAdministration,
            Self::Emergency(_) => EntityKind::Emergency,
            Self::SupplyRequest(_) => EntityKind::SupplyRequest,
            Self::Handover(_) => EntityKind::Handover,
        }
    }
}

/// Changes after a watermark, ordered by version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub changes: Vec<Change>,
    /// Pass this back as the next `since`.
    pub watermark: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use ward_core::model::BedLocation;

    fn stored_bed() -> Stored<Bed> {
        let at = datetime!(2024-03-01 08:00:00 UTC);
        Stored {
            record: Bed::new(BedLocation::new("ward-a", "101", "A")),
            version: 7,
            created_at: at,
            last_updated: at,
        }
    }

    #[test]
    fn test_stored_serializes_flat() {
        let json = serde_json::to_value(stored_bed()).unwrap();
        assert_eq!(json["status"], "vacant");
        assert_eq!(json["version"], 7);
        assert_eq!(json["location"]["room"], "101");
    }

    #[test]
    fn test_change_is_tagged_by_entity() {
        let change = Change::Bed(stored_bed());
        assert_eq!(change.version(), 7);
        assert_eq!(change.entity(), EntityKind::Bed);
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["entity"], "bed");
    }

    #[test]
    fn test_write_update_takes_stored_version() {
        let stored = stored_bed();
        match Write::update(&stored, stored.record.clone()) {
            Write::Update {
                expected_version, ..
            } => assert_eq!(expected_version, 7),
            Write::Insert(_) => panic!("expected update"),
        }
    }

    #[test]
    fn test_next_keeps_created_at() {
        let stored = stored_bed();
        let later = datetime!(2024-03-02 08:00:00 UTC);
        let next = stored.next(stored.record.clone(), 9, later);
        assert_eq!(next.created_at, stored.created_at);
        assert_eq!(next.last_updated, later);
        assert_eq!(next.version, 9);
    }
}
