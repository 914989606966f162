//! Repository traits, one per aggregate.
//!
//! Lookups return `Ok(None)` for a missing id; writes that name a missing id
//! fail with [`StorageError::NotFound`](crate::StorageError::NotFound).
//! Every `update_*` takes the version the caller read and fails with
//! `VersionConflict` when the record moved on in the meantime.

use async_trait::async_trait;
use ward_core::model::{
    Admission, Bed, DoctorOrder, EmergencyEvent, HandoverRecord, MedicationAdministration,
    MedicationSchedule, SupplyRequest,
};
use ward_core::{
    AdministrationId, AdmissionId, BedId, EmergencyId, HandoverId, OrderId, PatientId,
    ScheduleId, SupplyRequestId, WardId,
};

use crate::StorageResult;
use crate::types::{ChangeSet, OccupancyCommit, OccupancyOutcome, Stored};

/// Beds and admissions, written together.
#[async_trait]
pub trait BedAdmissionStore: Send + Sync {
    async fn get_bed(&self, id: &BedId) -> StorageResult<Option<Stored<Bed>>>;

    async fn list_beds(&self) -> StorageResult<Vec<Stored<Bed>>>;

    async fn get_admission(&self, id: &AdmissionId) -> StorageResult<Option<Stored<Admission>>>;

    async fn list_admissions(&self) -> StorageResult<Vec<Stored<Admission>>>;

    /// The patient's non-terminal admission, if any.
    async fn active_admission_for_patient(
        &self,
        patient: &PatientId,
    ) -> StorageResult<Option<Stored<Admission>>>;

    /// Apply every write in `commit` or none of them.
    ///
    /// Besides per-record version checks, the resulting state must satisfy
    /// the occupancy constraints: one active admission per bed, one per
    /// patient, and an occupied bed pointing at exactly its active admission.
    async fn commit_occupancy(&self, commit: OccupancyCommit) -> StorageResult<OccupancyOutcome>;
}

/// Doctor orders with their medication schedules and administrations.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: DoctorOrder) -> StorageResult<Stored<DoctorOrder>>;

    async fn get_order(&self, id: &OrderId) -> StorageResult<Option<Stored<DoctorOrder>>>;

    async fn update_order(
        &self,
        order: DoctorOrder,
        expected_version: u64,
    ) -> StorageResult<Stored<DoctorOrder>>;

    async fn orders_for_admission(
        &self,
        admission: &AdmissionId,
    ) -> StorageResult<Vec<Stored<DoctorOrder>>>;

    async fn insert_schedule(
        &self,
        schedule: MedicationSchedule,
    ) -> StorageResult<Stored<MedicationSchedule>>;

    async fn get_schedule(
        &self,
        id: &ScheduleId,
    ) -> StorageResult<Option<Stored<MedicationSchedule>>>;

    async fn update_schedule(
        &self,
        schedule: MedicationSchedule,
        expected_version: u64,
    ) -> StorageResult<Stored<MedicationSchedule>>;

    async fn schedules_for_order(
        &self,
        order: &OrderId,
    ) -> StorageResult<Vec<Stored<MedicationSchedule>>>;

    async fn active_schedules(&self) -> StorageResult<Vec<Stored<MedicationSchedule>>>;

    async fn insert_administrations(
        &self,
        administrations: Vec<MedicationAdministration>,
    ) -> StorageResult<Vec<Stored<MedicationAdministration>>>;

    async fn get_administration(
        &self,
        id: &AdministrationId,
    ) -> StorageResult<Option<Stored<MedicationAdministration>>>;

    async fn update_administration(
        &self,
        administration: MedicationAdministration,
        expected_version: u64,
    ) -> StorageResult<Stored<MedicationAdministration>>;

    async fn administrations_for_schedule(
        &self,
        schedule: &ScheduleId,
    ) -> StorageResult<Vec<Stored<MedicationAdministration>>>;

    async fn administrations_for_admission(
        &self,
        admission: &AdmissionId,
    ) -> StorageResult<Vec<Stored<MedicationAdministration>>>;
}

#[async_trait]
pub trait EmergencyStore: Send + Sync {
    async fn insert_emergency(
        &self,
        event: EmergencyEvent,
    ) -> StorageResult<Stored<EmergencyEvent>>;

    async fn get_emergency(&self, id: &EmergencyId)
    -> StorageResult<Option<Stored<EmergencyEvent>>>;

    async fn update_emergency(
        &self,
        event: EmergencyEvent,
        expected_version: u64,
    ) -> StorageResult<Stored<EmergencyEvent>>;

    /// Events that are not yet resolved.
    async fn open_emergencies(&self) -> StorageResult<Vec<Stored<EmergencyEvent>>>;

    async fn emergencies_for_ward(
        &self,
        ward: &WardId,
    ) -> StorageResult<Vec<Stored<EmergencyEvent>>>;
}

#[async_trait]
pub trait SupplyStore: Send + Sync {
    async fn insert_supply(&self, request: SupplyRequest) -> StorageResult<Stored<SupplyRequest>>;

    async fn get_supply(&self, id: &SupplyRequestId)
    -> StorageResult<Option<Stored<SupplyRequest>>>;

    async fn update_supply(
        &self,
        request: SupplyRequest,
        expected_version: u64,
    ) -> StorageResult<Stored<SupplyRequest>>;

    async fn supplies_for_ward(&self, ward: &WardId) -> StorageResult<Vec<Stored<SupplyRequest>>>;
}

/// Handover records are inserted once; only their sign-off state changes.
#[async_trait]
pub trait HandoverStore: Send + Sync {
    async fn insert_handover(
        &self,
        record: HandoverRecord,
    ) -> StorageResult<Stored<HandoverRecord>>;

    async fn get_handover(&self, id: &HandoverId) -> StorageResult<Option<Stored<HandoverRecord>>>;

    async fn update_handover(
        &self,
        record: HandoverRecord,
        expected_version: u64,
    ) -> StorageResult<Stored<HandoverRecord>>;

    async fn handovers_for_ward(&self, ward: &WardId)
    -> StorageResult<Vec<Stored<HandoverRecord>>>;
}

/// Polling support over the store-wide version sequence.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Highest version handed out so far.
    async fn watermark(&self) -> StorageResult<u64>;

    /// Current state of every record whose version is above `since`.
    async fn changes_since(&self, since: u64) -> StorageResult<ChangeSet>;
}

/// Everything the engine needs from persistence.
pub trait WardStore:
    BedAdmissionStore + OrderStore + EmergencyStore + SupplyStore + HandoverStore + ChangeFeed
{
}

impl<T> WardStore for T where
    T: BedAdmissionStore + OrderStore + EmergencyStore + SupplyStore + HandoverStore + ChangeFeed
{
}
