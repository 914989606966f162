use std::cmp::Reverse;

use serde::Deserialize;
use ward_core::model::{SupplyRequest, SupplyStatus, SupplyUrgency};
use ward_core::{Actor, AdmissionId, EntityKind, Result, SupplyRequestId, WardId};
use ward_policy::Action;
use ward_storage::Stored;

use crate::context::{EngineContext, rejected, required};

#[derive(Debug, Clone, Deserialize)]
pub struct RequestSupply {
    pub ward: WardId,
    #[serde(default)]
    pub admission: Option<AdmissionId>,
    pub item: String,
    pub quantity: u32,
    pub urgency: SupplyUrgency,
}

#[derive(Debug, Clone)]
pub struct SupplyWorkflow {
    ctx: EngineContext,
}

impl SupplyWorkflow {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub async fn request(&self, actor: &Actor, command: RequestSupply) -> Result<Stored<SupplyRequest>> {
        self.ctx
            .policy
            .require(actor, EntityKind::SupplyRequest, Action::RequestSupply)?;
        if let Some(admission) = &command.admission {
            self.ctx.open_admission(admission).await?;
        }

        let request = SupplyRequest::new(
            command.ward,
            command.admission,
            actor.id.clone(),
            command.item,
            command.quantity,
            command.urgency,
            self.ctx.now(),
        )
        .inspect_err(rejected("request_supply"))?;
        let request = self.ctx.store.insert_supply(request).await?;

        tracing::info!(
            request_id = %request.id,
            ward = %request.ward,
            item = %request.item,
            quantity = request.quantity,
            urgency = %request.urgency,
            actor = %actor.id,
            "supply requested"
        );
        Ok(request)
    }

    pub async fn fulfill(&self, actor: &Actor, request_id: &SupplyRequestId) -> Result<Stored<SupplyRequest>> {
        self.ctx
            .policy
            .require(actor, EntityKind::SupplyRequest, Action::FulfillSupply)?;
        let stored = self.get(request_id).await?;

        let mut request = stored.record.clone();
        request
            .fulfill(&actor.id, self.ctx.now())
            .inspect_err(rejected("fulfill_supply"))?;
        let request = self.ctx.store.update_supply(request, stored.version).await?;

        tracing::info!(request_id = %request.id, actor = %actor.id, "supply request fulfilled");
        Ok(request)
    }

    pub async fn cancel(
        &self,
        actor: &Actor,
        request_id: &SupplyRequestId,
        reason: Option<String>,
    ) -> Result<Stored<SupplyRequest>> {
        self.ctx
            .policy
            .require(actor, EntityKind::SupplyRequest, Action::CancelSupply)?;
        let stored = self.get(request_id).await?;

        let mut request = stored.record.clone();
        request
            .cancel(&actor.id, reason, self.ctx.now())
            .inspect_err(rejected("cancel_supply"))?;
        let request = self.ctx.store.update_supply(request, stored.version).await?;

        tracing::info!(request_id = %request.id, actor = %actor.id, "supply request cancelled");
        Ok(request)
    }

    pub async fn get(&self, request_id: &SupplyRequestId) -> Result<Stored<SupplyRequest>> {
        required(self.ctx.store.get_supply(request_id).await?, request_id)
    }

    pub async fn for_ward(&self, ward: &WardId) -> Result<Vec<Stored<SupplyRequest>>> {
        Ok(self.ctx.store.supplies_for_ward(ward).await?)
    }

    /// Open requests for the ward, most urgent first, then oldest first.
    pub async fn pending_for_ward(&self, ward: &WardId) -> Result<Vec<Stored<SupplyRequest>>> {
        let mut pending: Vec<_> = self
            .for_ward(ward)
            .await?
            .into_iter()
            .filter(|request| request.status == SupplyStatus::Pending)
            .collect();
        pending.sort_by_key(|request| (Reverse(request.urgency), request.requested_at, request.version));
        Ok(pending)
    }
}
