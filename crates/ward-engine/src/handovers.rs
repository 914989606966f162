//! Shift handover ledger. Records are append-only; a correction is a new
//! record naming the one it supersedes.

use std::cmp::Reverse;
use std::collections::HashSet;

use serde::Deserialize;
use ward_core::model::{HandoverContent, HandoverRecord};
use ward_core::{
    Actor, AdmissionId, EntityKind, HandoverId, Result, WardError, WardEvent, WardId,
};
use ward_policy::Action;
use ward_storage::Stored;

use crate::context::{EngineContext, rejected, required};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateHandover {
    pub ward: WardId,
    #[serde(default)]
    pub admission: Option<AdmissionId>,
    pub content: HandoverContent,
}

#[derive(Debug, Clone)]
pub struct HandoverLedger {
    ctx: EngineContext,
}

impl HandoverLedger {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, actor: &Actor, command: CreateHandover) -> Result<Stored<HandoverRecord>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Handover, Action::CreateHandover)?;
        if let Some(admission) = &command.admission {
            self.ctx.open_admission(admission).await?;
        }

        let record = HandoverRecord::new(
            command.ward,
            command.admission,
            actor.id.clone(),
            command.content,
            self.ctx.now(),
        )
        .inspect_err(rejected("create_handover"))?;
        self.publish(actor, record).await
    }

    /// Issue a corrected copy of `superseded`. The original stays untouched.
    /// Only the newest record of a correction chain can be corrected.
    pub async fn correct(
        &self,
        actor: &Actor,
        superseded: &HandoverId,
        content: HandoverContent,
    ) -> Result<Stored<HandoverRecord>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Handover, Action::CorrectHandover)?;
        let original = self.get(superseded).await?;
        if let Some(newer) = self.correction_of(&original).await? {
            let err = WardError::invalid_transition(
                EntityKind::Handover,
                &original.id,
                format!("superseded by {}", newer.id),
                "corrected",
            );
            rejected("correct_handover")(&err);
            return Err(err);
        }
        if let Some(admission) = &original.admission {
            self.ctx.open_admission(admission).await?;
        }

        let record = original
            .correction(actor.id.clone(), content, self.ctx.now())
            .inspect_err(rejected("correct_handover"))?;
        self.publish(actor, record).await
    }

    async fn publish(&self, actor: &Actor, record: HandoverRecord) -> Result<Stored<HandoverRecord>> {
        let record = self.ctx.store.insert_handover(record).await?;
        tracing::info!(
            handover_id = %record.id,
            ward = %record.ward,
            supersedes = ?record.supersedes.as_ref().map(|id| id.as_str()),
            actor = %actor.id,
            "handover recorded"
        );
        self.ctx
            .events
            .send(WardEvent::HandoverCreated(record.record.clone()));
        Ok(record)
    }

    pub async fn acknowledge(&self, actor: &Actor, record_id: &HandoverId) -> Result<Stored<HandoverRecord>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Handover, Action::AcknowledgeHandover)?;
        let stored = self.get(record_id).await?;

        let mut record = stored.record.clone();
        record
            .acknowledge(&actor.id, self.ctx.now())
            .inspect_err(rejected("acknowledge_handover"))?;
        let record = self.ctx.store.update_handover(record, stored.version).await?;

        tracing::info!(handover_id = %record.id, actor = %actor.id, "handover acknowledged");
        Ok(record)
    }

    pub async fn review(
        &self,
        actor: &Actor,
        record_id: &HandoverId,
        notes: Option<String>,
    ) -> Result<Stored<HandoverRecord>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Handover, Action::ReviewHandover)?;
        let stored = self.get(record_id).await?;

        let mut record = stored.record.clone();
        record
            .review(&actor.id, notes, self.ctx.now())
            .inspect_err(rejected("review_handover"))?;
        let record = self.ctx.store.update_handover(record, stored.version).await?;

        tracing::info!(handover_id = %record.id, actor = %actor.id, "handover reviewed");
        Ok(record)
    }

    async fn correction_of(
        &self,
        record: &HandoverRecord,
    ) -> Result<Option<Stored<HandoverRecord>>> {
        Ok(self
            .ctx
            .store
            .handovers_for_ward(&record.ward)
            .await?
            .into_iter()
            .find(|h| h.supersedes.as_ref() == Some(&record.id)))
    }

    pub async fn get(&self, record_id: &HandoverId) -> Result<Stored<HandoverRecord>> {
        required(self.ctx.store.get_handover(record_id).await?, record_id)
    }

    /// Every record for the ward, newest first.
    pub async fn for_ward(&self, ward: &WardId) -> Result<Vec<Stored<HandoverRecord>>> {
        let mut records = self.ctx.store.handovers_for_ward(ward).await?;
        records.reverse();
        records.sort_by_key(|record| Reverse(record.created_at));
        Ok(records)
    }

    /// Newest-first records that no correction has replaced.
    pub async fn current_for_ward(&self, ward: &WardId) -> Result<Vec<Stored<HandoverRecord>>> {
        let records = self.for_ward(ward).await?;
        let superseded: HashSet<HandoverId> = records
            .iter()
            .filter_map(|record| record.supersedes.clone())
            .collect();
        Ok(records
            .into_iter()
            .filter(|record| !superseded.contains(&record.id))
            .collect())
    }
}
