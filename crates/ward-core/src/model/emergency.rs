use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{Result, WardError};
use crate::id::{AdmissionId, EmergencyId, StaffId, WardId};
use crate::model::{EntityKind, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

string_enum!(Severity {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyStatus {
    Reported,
    Acknowledged,
    InProgress,
    Escalated,
    Resolved,
}

string_enum!(EmergencyStatus {
    Reported => "reported",
    Acknowledged => "acknowledged",
    InProgress => "in_progress",
    Escalated => "escalated",
    Resolved => "resolved",
});

impl EmergencyStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }

    pub fn can_transition_to(&self, target: EmergencyStatus) -> bool {
        use EmergencyStatus::*;
        match (self, target) {
            (Resolved, _) => false,
            (_, Resolved) => true,
            (Reported, Acknowledged | Escalated) => true,
            (Acknowledged, InProgress | Escalated) => true,
            (Escalated, InProgress) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyEvent {
    pub id: EmergencyId,
    pub admission: AdmissionId,
    pub ward: WardId,
    pub reporter: StaffId,
    #[serde(rename = "type")]
    pub event_type: String,
    pub severity: Severity,
    pub status: EmergencyStatus,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub reported_at: OffsetDateTime,

    #[serde(default)]
    pub acknowledged_by: Option<StaffId>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub acknowledged_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub acknowledgement_notes: Option<String>,

    #[serde(default)]
    pub escalated_by: Option<StaffId>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub escalated_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub escalation_target: Option<Role>,
    #[serde(default)]
    pub escalation_reason: Option<String>,
    #[serde(default)]
    pub escalation_count: u32,

    #[serde(default)]
    pub responder: Option<StaffId>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub response_started_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub response_notes: Option<String>,

    #[serde(default)]
    pub resolved_by: Option<StaffId>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub outcome: Option<String>,
}

impl EmergencyEvent {
    pub fn raise(
        admission: AdmissionId,
        ward: WardId,
        reporter: StaffId,
        event_type: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
        at: OffsetDateTime,
    ) -> Result<Self> {
        let event_type = event_type.into();
        if event_type.trim().is_empty() {
            return Err(WardError::validation("emergency type must not be empty"));
        }
        Ok(Self {
            id: EmergencyId::generate(),
            admission,
            ward,
            reporter,
            event_type,
            severity,
            status: EmergencyStatus::Reported,
            description: description.into(),
            reported_at: at,
            acknowledged_by: None,
            acknowledged_at: None,
            acknowledgement_notes: None,
            escalated_by: None,
            escalated_at: None,
            escalation_target: None,
            escalation_reason: None,
            escalation_count: 0,
            responder: None,
            response_started_at: None,
            response_notes: None,
            resolved_by: None,
            resolved_at: None,
            outcome: None,
        })
    }

    fn check(&self, target: EmergencyStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(WardError::already_terminal(
                EntityKind::Emergency,
                &self.id,
                self.status,
            ));
        }
        if !self.status.can_transition_to(target) {
            return Err(WardError::invalid_transition(
                EntityKind::Emergency,
                &self.id,
                self.status,
                target,
            ));
        }
        Ok(())
    }

    pub fn acknowledge(&mut self, by: &StaffId, notes: Option<String>, at: OffsetDateTime) -> Result<()> {
        self.check(EmergencyStatus::Acknowledged)?;
        self.status = EmergencyStatus::Acknowledged;
        self.acknowledged_by = Some(by.clone());
        self.acknowledged_at = Some(at);
        self.acknowledgement_notes = notes;
        Ok(())
    }

    pub fn escalate(
        &mut self,
        by: &StaffId,
        reason: impl Into<String>,
        target: Role,
        at: OffsetDateTime,
    ) -> Result<()> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(WardError::validation("escalation reason must not be empty"));
        }
        self.check(EmergencyStatus::Escalated)?;
        self.status = EmergencyStatus::Escalated;
        self.escalated_by = Some(by.clone());
        self.escalated_at = Some(at);
        self.escalation_target = Some(target);
        self.escalation_reason = Some(reason);
        self.escalation_count += 1;
        Ok(())
    }

    /// Start hands-on response. Authority over an escalated event is checked
    /// by the caller against [`EmergencyEvent::escalation_target`].
    pub fn respond(&mut self, by: &StaffId, notes: Option<String>, at: OffsetDateTime) -> Result<()> {
        self.check(EmergencyStatus::InProgress)?;
        self.status = EmergencyStatus::InProgress;
        self.responder = Some(by.clone());
        self.response_started_at = Some(at);
        self.response_notes = notes;
        Ok(())
    }

    pub fn resolve(&mut self, by: &StaffId, outcome: impl Into<String>, at: OffsetDateTime) -> Result<()> {
        let outcome = outcome.into();
        if outcome.trim().is_empty() {
            return Err(WardError::validation("resolution outcome must not be empty"));
        }
        self.check(EmergencyStatus::Resolved)?;
        self.status = EmergencyStatus::Resolved;
        self.resolved_by = Some(by.clone());
        self.resolved_at = Some(at);
        self.outcome = Some(outcome);
        Ok(())
    }

    /// Instant the response budget counts from.
    pub fn budget_started_at(&self) -> OffsetDateTime {
        self.acknowledged_at.unwrap_or(self.reported_at)
    }

    /// True when the sweep should escalate this event.
    pub fn is_escalation_due(&self, now: OffsetDateTime, budget: Duration) -> bool {
        matches!(
            self.status,
            EmergencyStatus::Reported | EmergencyStatus::Acknowledged
        ) && now - self.budget_started_at() > budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn event(severity: Severity) -> EmergencyEvent {
        EmergencyEvent::raise(
            AdmissionId::new("adm-1"),
            WardId::new("ward-a"),
            StaffId::new("rn-1"),
            "cardiac arrest",
            severity,
            "unresponsive",
            datetime!(2024-03-01 08:00:00 UTC),
        )
        .unwrap()
    }

    #[test]
    fn test_full_lifecycle() {
        let mut ev = event(Severity::High);
        let hn = StaffId::new("hn-1");
        ev.acknowledge(&hn, None, datetime!(2024-03-01 08:01:00 UTC)).unwrap();
        ev.escalate(&StaffId::new("system"), "budget elapsed", Role::Doctor, datetime!(2024-03-01 08:20:00 UTC))
            .unwrap();
        assert_eq!(ev.escalation_count, 1);
        assert_eq!(ev.escalation_target, Some(Role::Doctor));
        ev.respond(&StaffId::new("dr-1"), None, datetime!(2024-03-01 08:22:00 UTC)).unwrap();
        ev.resolve(&StaffId::new("dr-1"), "stabilized", datetime!(2024-03-01 08:40:00 UTC))
            .unwrap();
        assert_eq!(ev.status, EmergencyStatus::Resolved);

        let err = ev
            .acknowledge(&hn, None, datetime!(2024-03-01 09:00:00 UTC))
            .unwrap_err();
        assert_eq!(err.kind(), "already_terminal");
    }

    #[test]
    fn test_acknowledge_only_from_reported() {
        let mut ev = event(Severity::Low);
        let at = datetime!(2024-03-01 08:05:00 UTC);
        ev.acknowledge(&StaffId::new("rn-2"), None, at).unwrap();
        assert_eq!(
            ev.acknowledge(&StaffId::new("rn-2"), None, at).unwrap_err().kind(),
            "invalid_transition"
        );
    }

    #[test]
    fn test_escalated_cannot_escalate_again() {
        let mut ev = event(Severity::Critical);
        let at = datetime!(2024-03-01 08:10:00 UTC);
        ev.escalate(&StaffId::new("system"), "late", Role::HeadNurse, at).unwrap();
        assert_eq!(
            ev.escalate(&StaffId::new("system"), "late", Role::HeadNurse, at)
                .unwrap_err()
                .kind(),
            "invalid_transition"
        );
    }

    #[test]
    fn test_reported_cannot_jump_to_in_progress() {
        let mut ev = event(Severity::Medium);
        assert!(ev
            .respond(&StaffId::new("rn-1"), None, datetime!(2024-03-01 08:01:00 UTC))
            .is_err());
    }

    #[test]
    fn test_resolve_requires_outcome() {
        let mut ev = event(Severity::Medium);
        assert_eq!(
            ev.resolve(&StaffId::new("dr-1"), "", datetime!(2024-03-01 08:01:00 UTC))
                .unwrap_err()
                .kind(),
            "validation"
        );
    }

    #[test]
    fn test_escalation_due() {
        let mut ev = event(Severity::Critical);
        let budget = Duration::minutes(5);
        assert!(!ev.is_escalation_due(datetime!(2024-03-01 08:05:00 UTC), budget));
        assert!(ev.is_escalation_due(datetime!(2024-03-01 08:05:01 UTC), budget));

        ev.escalate(&StaffId::new("system"), "late", Role::HeadNurse, datetime!(2024-03-01 08:06:00 UTC))
            .unwrap();
        assert!(!ev.is_escalation_due(datetime!(2024-03-01 09:00:00 UTC), budget));
    }

    #[test]
    fn test_type_field_name() {
        let json = serde_json::to_value(event(Severity::Low)).unwrap();
        assert_eq!(json["type"], "cardiac arrest");
        assert_eq!(json["status"], "reported");
    }
}
