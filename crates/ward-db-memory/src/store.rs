use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use ward_core::model::{
    Admission, Bed, DoctorOrder, EmergencyEvent, HandoverRecord, MedicationAdministration,
    MedicationSchedule, SupplyRequest,
};
use ward_core::{
    AdministrationId, AdmissionId, BedId, EmergencyId, HandoverId, OrderId, PatientId,
    ScheduleId, SharedClock, SupplyRequestId, SystemClock, WardId,
};
use ward_storage::{
    BedAdmissionStore, Change, ChangeFeed, ChangeSet, Constraint, EmergencyStore, HandoverStore,
    OccupancyCommit, OccupancyOutcome, OrderStore, StorageError, StorageResult, Stored, SupplyStore,
};

use crate::occupancy::OccupancyTables;
use crate::table::VersionedTable;

/// In-memory implementation of every ward repository.
pub struct InMemoryStore {
    /// Last version handed out; versions start at 1.
    sequence: AtomicU64,
    /// Writers hold this shared; the change feed takes it exclusively so it
    /// never sees a version whose record is still being written.
    gate: RwLock<()>,
    clock: SharedClock,
    occupancy: RwLock<OccupancyTables>,
    orders: VersionedTable<DoctorOrder>,
    schedules: VersionedTable<MedicationSchedule>,
    administrations: VersionedTable<MedicationAdministration>,
    emergencies: VersionedTable<EmergencyEvent>,
    supplies: VersionedTable<SupplyRequest>,
    handovers: VersionedTable<HandoverRecord>,
    /// Serializes correction inserts so a record is superseded at most once.
    corrections: Mutex<()>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("watermark", &self.sequence.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(SystemClock::shared())
    }

    /// Store that stamps `created_at`/`last_updated` from `clock`.
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            sequence: AtomicU64::new(0),
            gate: RwLock::new(()),
            clock,
            occupancy: RwLock::new(OccupancyTables::default()),
            orders: VersionedTable::new(),
            schedules: VersionedTable::new(),
            administrations: VersionedTable::new(),
            emergencies: VersionedTable::new(),
            supplies: VersionedTable::new(),
            handovers: VersionedTable::new(),
            corrections: Mutex::new(()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn next_version(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    async fn insert_into<T: ward_storage::Record>(
        &self,
        table: &VersionedTable<T>,
        record: T,
    ) -> StorageResult<Stored<T>> {
        let _gate = self.gate.read().await;
        table.insert(record, self.next_version(), self.now())
    }

    async fn update_in<T: ward_storage::Record>(
        &self,
        table: &VersionedTable<T>,
        record: T,
        expected_version: u64,
    ) -> StorageResult<Stored<T>> {
        let _gate = self.gate.read().await;
        table.update(record, expected_version, || self.next_version(), self.now())
    }
}

#[async_trait]
impl BedAdmissionStore for InMemoryStore {
    async fn get_bed(&self, id: &BedId) -> StorageResult<Option<Stored<Bed>>> {
        Ok(self.occupancy.read().await.beds.get(id).cloned())
    }

    async fn list_beds(&self) -> StorageResult<Vec<Stored<Bed>>> {
        let tables = self.occupancy.read().await;
        let mut beds: Vec<_> = tables.beds.values().cloned().collect();
        beds.sort_by_key(|b| b.version);
        Ok(beds)
    }

    async fn get_admission(&self, id: &AdmissionId) -> StorageResult<Option<Stored<Admission>>> {
        Ok(self.occupancy.read().await.admissions.get(id).cloned())
    }

    async fn list_admissions(&self) -> StorageResult<Vec<Stored<Admission>>> {
        let tables = self.occupancy.read().await;
        let mut admissions: Vec<_> = tables.admissions.values().cloned().collect();
        admissions.sort_by_key(|a| a.version);
        Ok(admissions)
    }

    async fn active_admission_for_patient(
        &self,
        patient: &PatientId,
    ) -> StorageResult<Option<Stored<Admission>>> {
        let tables = self.occupancy.read().await;
        Ok(tables
            .admissions
            .values()
            .find(|a| &a.patient == patient && a.is_active())
            .cloned())
    }

    async fn commit_occupancy(&self, commit: OccupancyCommit) -> StorageResult<OccupancyOutcome> {
        let _gate = self.gate.read().await;
        let mut tables = self.occupancy.write().await;
        tables.apply(commit, || self.next_version(), self.now())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: DoctorOrder) -> StorageResult<Stored<DoctorOrder>> {
        self.insert_into(&self.orders, order).await
    }

    async fn get_order(&self, id: &OrderId) -> StorageResult<Option<Stored<DoctorOrder>>> {
        Ok(self.orders.get(id))
    }

    async fn update_order(
        &self,
        order: DoctorOrder,
        expected_version: u64,
    ) -> StorageResult<Stored<DoctorOrder>> {
        self.update_in(&self.orders, order, expected_version).await
    }

    async fn orders_for_admission(
        &self,
        admission: &AdmissionId,
    ) -> StorageResult<Vec<Stored<DoctorOrder>>> {
        Ok(self.orders.filter(|o| &o.admission == admission))
    }

    async fn insert_schedule(
        &self,
        schedule: MedicationSchedule,
    ) -> StorageResult<Stored<MedicationSchedule>> {
        self.insert_into(&self.schedules, schedule).await
    }

    async fn get_schedule(
        &self,
        id: &ScheduleId,
    ) -> StorageResult<Option<Stored<MedicationSchedule>>> {
        Ok(self.schedules.get(id))
    }

    async fn update_schedule(
        &self,
        schedule: MedicationSchedule,
        expected_version: u64,
    ) -> StorageResult<Stored<MedicationSchedule>> {
        self.update_in(&self.schedules, schedule, expected_version).await
    }

    async fn schedules_for_order(
        &self,
        order: &OrderId,
    ) -> StorageResult<Vec<Stored<MedicationSchedule>>> {
        Ok(self.schedules.filter(|s| &s.order == order))
    }

    async fn active_schedules(&self) -> StorageResult<Vec<Stored<MedicationSchedule>>> {
        Ok(self.schedules.filter(|s| s.is_active()))
    }

    async fn insert_administrations(
        &self,
        administrations: Vec<MedicationAdministration>,
    ) -> StorageResult<Vec<Stored<MedicationAdministration>>> {
        let _gate = self.gate.read().await;
        let at = self.now();
        administrations
            .into_iter()
            .map(|a| self.administrations.insert(a, self.next_version(), at))
            .collect()
    }

    async fn get_administration(
        &self,
        id: &AdministrationId,
    ) -> StorageResult<Option<Stored<MedicationAdministration>>> {
        Ok(self.administrations.get(id))
    }

    async fn update_administration(
        &self,
        administration: MedicationAdministration,
        expected_version: u64,
    ) -> StorageResult<Stored<MedicationAdministration>> {
        self.update_in(&self.administrations, administration, expected_version)
            .await
    }

    async fn administrations_for_schedule(
        &self,
        schedule: &ScheduleId,
    ) -> StorageResult<Vec<Stored<MedicationAdministration>>> {
        let mut rows = self.administrations.filter(|a| &a.schedule == schedule);
        rows.sort_by_key(|a| a.scheduled_at);
        Ok(rows)
    }

    async fn administrations_for_admission(
        &self,
        admission: &AdmissionId,
    ) -> StorageResult<Vec<Stored<MedicationAdministration>>> {
        let mut rows = self.administrations.filter(|a| &a.admission == admission);
        rows.sort_by_key(|a| a.scheduled_at);
        Ok(rows)
    }
}

#[async_trait]
impl EmergencyStore for InMemoryStore {
    async fn insert_emergency(
        &self,
        event: EmergencyEvent,
    ) -> StorageResult<Stored<EmergencyEvent>> {
        self.insert_into(&self.emergencies, event).await
    }

    async fn get_emergency(
        &self,
        id: &EmergencyId,
    ) -> StorageResult<Option<Stored<EmergencyEvent>>> {
        Ok(self.emergencies.get(id))
    }

    async fn update_emergency(
        &self,
        event: EmergencyEvent,
        expected_version: u64,
    ) -> StorageResult<Stored<EmergencyEvent>> {
        self.update_in(&self.emergencies, event, expected_version).await
    }

    async fn open_emergencies(&self) -> StorageResult<Vec<Stored<EmergencyEvent>>> {
        Ok(self.emergencies.filter(|e| !e.status.is_terminal()))
    }

    async fn emergencies_for_ward(
        &self,
        ward: &WardId,
    ) -> StorageResult<Vec<Stored<EmergencyEvent>>> {
        Ok(self.emergencies.filter(|e| &e.ward == ward))
    }
}

#[async_trait]
impl SupplyStore for InMemoryStore {
    async fn insert_supply(&self, request: SupplyRequest) -> StorageResult<Stored<SupplyRequest>> {
        self.insert_into(&self.supplies, request).await
    }

    async fn get_supply(
        &self,
        id: &SupplyRequestId,
    ) -> StorageResult<Option<Stored<SupplyRequest>>> {
        Ok(self.supplies.get(id))
    }

    async fn update_supply(
        &self,
        request: SupplyRequest,
        expected_version: u64,
    ) -> StorageResult<Stored<SupplyRequest>> {
        self.update_in(&self.supplies, request, expected_version).await
    }

    async fn supplies_for_ward(&self, ward: &WardId) -> StorageResult<Vec<Stored<SupplyRequest>>> {
        Ok(self.supplies.filter(|s| &s.ward == ward))
    }
}

#[async_trait]
impl HandoverStore for InMemoryStore {
    async fn insert_handover(
        &self,
        record: HandoverRecord,
    ) -> StorageResult<Stored<HandoverRecord>> {
        let Some(superseded) = record.supersedes.clone() else {
            return self.insert_into(&self.handovers, record).await;
        };
        let _chain = self.corrections.lock().await;
        let corrected = self
            .handovers
            .filter(|h| h.supersedes.as_ref() == Some(&superseded));
        if !corrected.is_empty() {
            return Err(StorageError::constraint(Constraint::AlreadySuperseded {
                handover_id: superseded.to_string(),
            }));
        }
        self.insert_into(&self.handovers, record).await
    }

    async fn get_handover(&self, id: &HandoverId) -> StorageResult<Option<Stored<HandoverRecord>>> {
        Ok(self.handovers.get(id))
    }

    async fn update_handover(
        &self,
        record: HandoverRecord,
        expected_version: u64,
    ) -> StorageResult<Stored<HandoverRecord>> {
        self.update_in(&self.handovers, record, expected_version).await
    }

    async fn handovers_for_ward(
        &self,
        ward: &WardId,
    ) -> StorageResult<Vec<Stored<HandoverRecord>>> {
        Ok(self.handovers.filter(|h| &h.ward == ward))
    }
}

#[async_trait]
impl ChangeFeed for InMemoryStore {
    async fn watermark(&self) -> StorageResult<u64> {
        Ok(self.sequence.load(Ordering::SeqCst))
    }

    async fn changes_since(&self, since: u64) -> StorageResult<ChangeSet> {
        let _gate = self.gate.write().await;
        let watermark = self.sequence.load(Ordering::SeqCst);
        if since >= watermark {
            return Ok(ChangeSet {
                changes: Vec::new(),
                watermark,
            });
        }

        let mut changes = Vec::new();
        {
            let tables = self.occupancy.read().await;
            changes.extend(
                tables
                    .beds
                    .values()
                    .filter(|b| b.version > since)
                    .cloned()
                    .map(Change::Bed),
            );
            changes.extend(
                tables
                    .admissions
                    .values()
                    .filter(|a| a.version > since)
                    .cloned()
                    .map(Change::Admission),
            );
        }
        let until = watermark;
        changes.extend(self.orders.changed_between(since, until).into_iter().map(Change::Order));
        changes.extend(
            self.schedules
                .changed_between(since, until)
                .into_iter()
                .map(Change::MedicationSchedule),
        );
        changes.extend(
            self.administrations
                .changed_between(since, until)
                .into_iter()
                .map(Change::MedicationAdministration),
        );
        changes.extend(
            self.emergencies
                .changed_between(since, until)
                .into_iter()
                .map(Change::Emergency),
        );
        changes.extend(
            self.supplies
                .changed_between(since, until)
                .into_iter()
                .map(Change::SupplyRequest),
        );
        changes.extend(
            self.handovers
                .changed_between(since, until)
                .into_iter()
                .map(Change::Handover),
        );
        changes.sort_by_key(Change::version);

        Ok(ChangeSet { changes, watermark })
    }
}
