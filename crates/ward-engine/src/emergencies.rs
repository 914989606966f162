//! Emergency events and their escalation.

use serde::Deserialize;
use time::OffsetDateTime;
use ward_core::model::{EmergencyEvent, EmergencyStatus, Severity};
use ward_core::{Actor, AdmissionId, EmergencyId, EntityKind, Result, Role, WardEvent, WardId};
use ward_policy::Action;
use ward_storage::Stored;

use crate::context::{EngineContext, rejected, required};

#[derive(Debug, Clone, Deserialize)]
pub struct RaiseEmergency {
    pub admission: AdmissionId,
    #[serde(rename = "type")]
    pub event_type: String,
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct EmergencyEngine {
    ctx: EngineContext,
}

impl EmergencyEngine {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub async fn raise(&self, actor: &Actor, command: RaiseEmergency) -> Result<Stored<EmergencyEvent>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Emergency, Action::RaiseEmergency)?;
        let admission = self.ctx.open_admission(&command.admission).await?;
        let ward = self.ctx.ward_of(&admission).await?;

        let event = EmergencyEvent::raise(
            admission.id.clone(),
            ward,
            actor.id.clone(),
            command.event_type,
            command.severity,
            command.description,
            self.ctx.now(),
        )
        .inspect_err(rejected("raise_emergency"))?;
        let event = self.ctx.store.insert_emergency(event).await?;

        tracing::info!(
            emergency_id = %event.id,
            admission_id = %event.admission,
            ward = %event.ward,
            severity = %event.severity,
            event_type = %event.event_type,
            actor = %actor.id,
            "emergency raised"
        );
        self.ctx.events.send(WardEvent::EmergencyRaised(event.record.clone()));
        Ok(event)
    }

    pub async fn acknowledge(
        &self,
        actor: &Actor,
        event_id: &EmergencyId,
        notes: Option<String>,
    ) -> Result<Stored<EmergencyEvent>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Emergency, Action::AcknowledgeEmergency)?;
        let stored = self.get(event_id).await?;

        let mut event = stored.record.clone();
        event
            .acknowledge(&actor.id, notes, self.ctx.now())
            .inspect_err(rejected("acknowledge_emergency"))?;
        let event = self.ctx.store.update_emergency(event, stored.version).await?;

        tracing::info!(emergency_id = %event.id, actor = %actor.id, "emergency acknowledged");
        Ok(event)
    }

    /// Escalate to `target`, or to the configured default for the severity.
    pub async fn escalate(
        &self,
        actor: &Actor,
        event_id: &EmergencyId,
        reason: &str,
        target: Option<Role>,
    ) -> Result<Stored<EmergencyEvent>> {
        self.escalate_at(actor, event_id, reason, target, self.ctx.now())
            .await
    }

    pub(crate) async fn escalate_at(
        &self,
        actor: &Actor,
        event_id: &EmergencyId,
        reason: &str,
        target: Option<Role>,
        at: OffsetDateTime,
    ) -> Result<Stored<EmergencyEvent>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Emergency, Action::EscalateEmergency)?;
        let stored = self.get(event_id).await?;
        let target = target.unwrap_or_else(|| self.ctx.config.escalation.target(stored.severity));

        let mut event = stored.record.clone();
        event
            .escalate(&actor.id, reason, target, at)
            .inspect_err(rejected("escalate_emergency"))?;
        let event = self.ctx.store.update_emergency(event, stored.version).await?;

        tracing::info!(
            emergency_id = %event.id,
            from = %stored.status,
            target = %target,
            severity = %event.severity,
            actor = %actor.id,
            "emergency escalated"
        );
        self.ctx
            .events
            .send(WardEvent::EmergencyEscalated(event.record.clone()));
        Ok(event)
    }

    /// Start hands-on response. An escalated event can only be taken over by
    /// a role at or above the escalation target.
    pub async fn respond(
        &self,
        actor: &Actor,
        event_id: &EmergencyId,
        notes: Option<String>,
    ) -> Result<Stored<EmergencyEvent>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Emergency, Action::RespondEmergency)?;
        let stored = self.get(event_id).await?;
        if stored.status == EmergencyStatus::Escalated
            && let Some(target) = stored.escalation_target
        {
            self.ctx.policy.require_authority(actor, target)?;
        }

        let mut event = stored.record.clone();
        event
            .respond(&actor.id, notes, self.ctx.now())
            .inspect_err(rejected("respond_emergency"))?;
        let event = self.ctx.store.update_emergency(event, stored.version).await?;

        tracing::info!(
            emergency_id = %event.id,
            from = %stored.status,
            actor = %actor.id,
            "emergency response started"
        );
        Ok(event)
    }

    pub async fn resolve(
        &self,
        actor: &Actor,
        event_id: &EmergencyId,
        outcome: &str,
    ) -> Result<Stored<EmergencyEvent>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Emergency, Action::ResolveEmergency)?;
        let stored = self.get(event_id).await?;

        let mut event = stored.record.clone();
        event
            .resolve(&actor.id, outcome, self.ctx.now())
            .inspect_err(rejected("resolve_emergency"))?;
        let event = self.ctx.store.update_emergency(event, stored.version).await?;

        tracing::info!(
            emergency_id = %event.id,
            from = %stored.status,
            actor = %actor.id,
            "emergency resolved"
        );
        self.ctx
            .events
            .send(WardEvent::EmergencyResolved(event.record.clone()));
        Ok(event)
    }

    pub async fn get(&self, event_id: &EmergencyId) -> Result<Stored<EmergencyEvent>> {
        required(self.ctx.store.get_emergency(event_id).await?, event_id)
    }

    pub async fn for_ward(&self, ward: &WardId) -> Result<Vec<Stored<EmergencyEvent>>> {
        Ok(self.ctx.store.emergencies_for_ward(ward).await?)
    }

    pub async fn open(&self) -> Result<Vec<Stored<EmergencyEvent>>> {
        Ok(self.ctx.store.open_emergencies().await?)
    }

    /// Open events whose response budget has run out at `now`.
    pub async fn overdue(&self, now: OffsetDateTime) -> Result<Vec<Stored<EmergencyEvent>>> {
        let escalation = &self.ctx.config.escalation;
        Ok(self
            .open()
            .await?
            .into_iter()
            .filter(|event| event.is_escalation_due(now, escalation.budget(event.severity)))
            .collect())
    }
}
