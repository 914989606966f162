use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::id::WardId;
use crate::model::{EmergencyEvent, HandoverRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WardEventType {
    EmergencyRaised,
    EmergencyEscalated,
    EmergencyResolved,
    HandoverCreated,
}

impl WardEventType {
    pub const ALL: [WardEventType; 4] = [
        Self::EmergencyRaised,
        Self::EmergencyEscalated,
        Self::EmergencyResolved,
        Self::HandoverCreated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmergencyRaised => "emergency_raised",
            Self::EmergencyEscalated => "emergency_escalated",
            Self::EmergencyResolved => "emergency_resolved",
            Self::HandoverCreated => "handover_created",
        }
    }
}

impl std::fmt::Display for WardEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event carrying a snapshot of the record as committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WardEvent {
    EmergencyRaised(EmergencyEvent),
    EmergencyEscalated(EmergencyEvent),
    EmergencyResolved(EmergencyEvent),
    HandoverCreated(HandoverRecord),
}

impl WardEvent {
    pub fn event_type(&self) -> WardEventType {
        match self {
            Self::EmergencyRaised(_) => WardEventType::EmergencyRaised,
            Self::EmergencyEscalated(_) => WardEventType::EmergencyEscalated,
            Self::EmergencyResolved(_) => WardEventType::EmergencyResolved,
            Self::HandoverCreated(_) => WardEventType::HandoverCreated,
        }
    }

    pub fn ward(&self) -> &WardId {
        match self {
            Self::EmergencyRaised(e) | Self::EmergencyEscalated(e) | Self::EmergencyResolved(e) => {
                &e.ward
            }
            Self::HandoverCreated(h) => &h.ward,
        }
    }

    /// Id of the record the event is about.
    pub fn subject_id(&self) -> &str {
        match self {
            Self::EmergencyRaised(e) | Self::EmergencyEscalated(e) | Self::EmergencyResolved(e) => {
                e.id.as_str()
            }
            Self::HandoverCreated(h) => h.id.as_str(),
        }
    }

    /// When the transition behind this event happened.
    pub fn occurred_at(&self) -> OffsetDateTime {
        match self {
            Self::EmergencyRaised(e) => e.reported_at,
            Self::EmergencyEscalated(e) => e.escalated_at.unwrap_or(e.reported_at),
            Self::EmergencyResolved(e) => e.resolved_at.unwrap_or(e.reported_at),
            Self::HandoverCreated(h) => h.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{AdmissionId, StaffId};
    use crate::model::Severity;
    use time::macros::datetime;

    fn emergency() -> EmergencyEvent {
        EmergencyEvent::raise(
            AdmissionId::new("adm-1"),
            WardId::new("ward-a"),
            StaffId::new("rn-1"),
            "fall",
            Severity::High,
            "",
            datetime!(2024-03-01 08:00:00 UTC),
        )
        .unwrap()
    }

    #[test]
    fn test_event_accessors() {
        let ev = emergency();
        let event = WardEvent::EmergencyRaised(ev.clone());
        assert_eq!(event.event_type(), WardEventType::EmergencyRaised);
        assert_eq!(event.ward().as_str(), "ward-a");
        assert_eq!(event.subject_id(), ev.id.as_str());
        assert_eq!(event.occurred_at(), datetime!(2024-03-01 08:00:00 UTC));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(WardEvent::EmergencyRaised(emergency())).unwrap();
        assert_eq!(json["event"], "emergency_raised");
        assert_eq!(json["data"]["severity"], "high");
    }

    #[test]
    fn test_event_type_names() {
        let names: Vec<_> = WardEventType::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "emergency_raised",
                "emergency_escalated",
                "emergency_resolved",
                "handover_created"
            ]
        );
    }
}
