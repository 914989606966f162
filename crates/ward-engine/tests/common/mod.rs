#![allow(dead_code)]

use std::sync::Arc;

use time::OffsetDateTime;
use time::macros::datetime;
use ward_core::model::{
    Admission, AdmissionType, Bed, BedLocation, DoctorOrder, Frequency, OrderPriority, OrderType,
    Regimen,
};
use ward_core::{Actor, AdmissionId, BedId, ManualClock, PatientId, Role, SharedClock, StaffId};
use ward_db_memory::InMemoryStore;
use ward_engine::{AdmitPatient, CreateOrder, EngineConfig, WardEngine};
use ward_storage::Stored;

pub const WARD: &str = "ward-a";

pub fn start() -> OffsetDateTime {
    datetime!(2024-03-01 08:00:00 UTC)
}

pub fn clerk() -> Actor {
    Actor::new("clerk-1", Role::WardClerk)
}

pub fn nurse() -> Actor {
    Actor::new("rn-1", Role::StaffNurse)
}

pub fn incoming_nurse() -> Actor {
    Actor::new("rn-2", Role::StaffNurse)
}

pub fn head_nurse() -> Actor {
    Actor::new("hn-1", Role::HeadNurse)
}

pub fn doctor() -> Actor {
    Actor::new("dr-1", Role::Doctor)
}

/// An engine over a fresh in-memory store with a hand-driven clock.
pub struct Ward {
    pub engine: WardEngine,
    pub clock: Arc<ManualClock>,
    pub store: Arc<InMemoryStore>,
}

impl Ward {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let clock = ManualClock::shared(start());
        let shared: SharedClock = clock.clone();
        let store = Arc::new(InMemoryStore::with_clock(shared.clone()));
        let engine = WardEngine::with_clock(store.clone(), shared, config);
        Self {
            engine,
            clock,
            store,
        }
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(time::Duration::minutes(minutes));
    }

    pub async fn bed(&self, room: &str) -> Stored<Bed> {
        self.engine
            .beds()
            .create(&clerk(), BedLocation::new(WARD, room, "A"))
            .await
            .unwrap()
    }

    pub async fn bed_status(&self, bed: &BedId) -> Stored<Bed> {
        self.engine.beds().get(bed).await.unwrap()
    }

    pub async fn admit(&self, patient: &str, bed: &BedId) -> Stored<Admission> {
        self.engine
            .admissions()
            .admit(&head_nurse(), admit_command(patient, bed))
            .await
            .unwrap()
    }

    /// A patient admitted to a fresh bed.
    pub async fn admitted(&self, patient: &str) -> Stored<Admission> {
        let bed = self.bed(&format!("room-{patient}")).await;
        self.admit(patient, &bed.id).await
    }

    pub async fn order(&self, admission: &AdmissionId, order_type: OrderType) -> Stored<DoctorOrder> {
        self.engine
            .orders()
            .create_order(
                &doctor(),
                CreateOrder {
                    admission: admission.clone(),
                    order_type,
                    priority: OrderPriority::Routine,
                    description: "paracetamol 1g".into(),
                },
            )
            .await
            .unwrap()
    }

    /// Asserts the occupancy invariant over the whole store.
    pub async fn assert_consistent(&self) {
        let violations = self.engine.beds().check_invariant().await.unwrap();
        assert!(violations.is_empty(), "occupancy violations: {violations:?}");
    }
}

pub fn admit_command(patient: &str, bed: &BedId) -> AdmitPatient {
    AdmitPatient {
        patient: PatientId::new(patient),
        bed: bed.clone(),
        attending: StaffId::new("dr-1"),
        admission_type: AdmissionType::Emergency,
    }
}

pub fn regimen(frequency: Frequency, start: OffsetDateTime, end: Option<OffsetDateTime>) -> Regimen {
    Regimen {
        medication: "paracetamol".into(),
        dosage: 1.0,
        unit: "g".into(),
        route: "oral".into(),
        frequency,
        start,
        end,
    }
}
