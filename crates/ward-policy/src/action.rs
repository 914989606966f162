use serde::{Deserialize, Serialize};
use ward_core::EntityKind;

/// A guarded operation. Each action applies to exactly one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateBed,
    SetBedStatus,

    Admit,
    Transfer,
    UpdateAdmissionStatus,
    Discharge,
    RecordDeath,

    CreateOrder,
    HoldOrder,
    ResumeOrder,
    CompleteOrder,
    CancelOrder,
    ScheduleMedication,
    CancelSchedule,
    Administer,
    Skip,

    RaiseEmergency,
    AcknowledgeEmergency,
    RespondEmergency,
    EscalateEmergency,
    ResolveEmergency,

    RequestSupply,
    FulfillSupply,
    CancelSupply,

    CreateHandover,
    CorrectHandover,
    AcknowledgeHandover,
    ReviewHandover,
}

impl Action {
    pub const ALL: [Action; 28] = [
        Action::CreateBed,
        Action::SetBedStatus,
        Action::Admit,
        Action::Transfer,
        Action::UpdateAdmissionStatus,
        Action::Discharge,
        Action::RecordDeath,
        Action::CreateOrder,
        Action::HoldOrder,
        Action::ResumeOrder,
        Action::CompleteOrder,
        Action::CancelOrder,
        Action::ScheduleMedication,
        Action::CancelSchedule,
        Action::Administer,
        Action::Skip,
        Action::RaiseEmergency,
        Action::AcknowledgeEmergency,
        Action::RespondEmergency,
        Action::EscalateEmergency,
        Action::ResolveEmergency,
        Action::RequestSupply,
        Action::FulfillSupply,
        Action::CancelSupply,
        Action::CreateHandover,
        Action::CorrectHandover,
        Action::AcknowledgeHandover,
        Action::ReviewHandover,
    ];

    pub fn entity(&self) -> EntityKind {
        use Action::*;
        match self {
            CreateBed | SetBedStatus => EntityKind::Bed,
            Admit | Transfer | UpdateAdmissionStatus | Discharge | RecordDeath => {
                EntityKind::Admission
            }
            CreateOrder | HoldOrder | ResumeOrder | CompleteOrder | CancelOrder => {
                EntityKind::Order
            }
            ScheduleMedication | CancelSchedule => EntityKind::MedicationSchedule,
            Administer | Skip => EntityKind::MedicationAdministration,
            RaiseEmergency | AcknowledgeEmergency | RespondEmergency | EscalateEmergency
            | ResolveEmergency => EntityKind::Emergency,
            RequestSupply | FulfillSupply | CancelSupply => EntityKind::SupplyRequest,
            CreateHandover | CorrectHandover | AcknowledgeHandover | ReviewHandover => {
                EntityKind::Handover
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        use Action::*;
        match self {
            CreateBed => "create_bed",
            SetBedStatus => "set_bed_status",
            Admit => "admit",
            Transfer => "transfer",
            UpdateAdmissionStatus => "update_admission_status",
            Discharge => "discharge",
            RecordDeath => "record_death",
            CreateOrder => "create_order",
            HoldOrder => "hold_order",
            ResumeOrder => "resume_order",
            CompleteOrder => "complete_order",
            CancelOrder => "cancel_order",
            ScheduleMedication => "schedule_medication",
            CancelSchedule => "cancel_schedule",
            Administer => "administer",
            Skip => "skip",
            RaiseEmergency => "raise_emergency",
            AcknowledgeEmergency => "acknowledge_emergency",
            RespondEmergency => "respond_emergency",
            EscalateEmergency => "escalate_emergency",
            ResolveEmergency => "resolve_emergency",
            RequestSupply => "request_supply",
            FulfillSupply => "fulfill_supply",
            CancelSupply => "cancel_supply",
            CreateHandover => "create_handover",
            CorrectHandover => "correct_handover",
            AcknowledgeHandover => "acknowledge_handover",
            ReviewHandover => "review_handover",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
