use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::broadcast;
use ward_core::{EventBroadcaster, Result, SharedClock, SystemClock, WardEvent};
use ward_policy::AccessPolicy;
use ward_storage::{ChangeSet, DynWardStore};

use crate::admissions::AdmissionLifecycle;
use crate::beds::BedRegistry;
use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::emergencies::EmergencyEngine;
use crate::handovers::HandoverLedger;
use crate::orders::OrderPipeline;
use crate::supplies::SupplyWorkflow;
use crate::sweep::{Sweep, SweepReport};

/// Entry point bundling every workflow over one store.
#[derive(Debug, Clone)]
pub struct WardEngine {
    ctx: EngineContext,
    beds: BedRegistry,
    admissions: AdmissionLifecycle,
    orders: OrderPipeline,
    emergencies: EmergencyEngine,
    supplies: SupplyWorkflow,
    handovers: HandoverLedger,
    sweep: Sweep,
}

pub type SharedWardEngine = Arc<WardEngine>;

impl WardEngine {
    pub fn new(store: DynWardStore, config: EngineConfig) -> Self {
        Self::with_clock(store, SystemClock::shared(), config)
    }

    pub fn with_clock(store: DynWardStore, clock: SharedClock, config: EngineConfig) -> Self {
        Self::from_context(EngineContext::new(store, clock, config))
    }

    pub fn from_context(ctx: EngineContext) -> Self {
        let orders = OrderPipeline::new(ctx.clone());
        let emergencies = EmergencyEngine::new(ctx.clone());
        Self {
            beds: BedRegistry::new(ctx.clone()),
            admissions: AdmissionLifecycle::new(ctx.clone()),
            supplies: SupplyWorkflow::new(ctx.clone()),
            handovers: HandoverLedger::new(ctx.clone()),
            sweep: Sweep::new(emergencies.clone(), orders.clone()),
            orders,
            emergencies,
            ctx,
        }
    }

    #[must_use]
    pub fn with_policy(self, policy: AccessPolicy) -> Self {
        Self::from_context(self.ctx.with_policy(policy))
    }

    pub fn beds(&self) -> &BedRegistry {
        &self.beds
    }

    pub fn admissions(&self) -> &AdmissionLifecycle {
        &self.admissions
    }

    pub fn orders(&self) -> &OrderPipeline {
        &self.orders
    }

    pub fn emergencies(&self) -> &EmergencyEngine {
        &self.emergencies
    }

    pub fn supplies(&self) -> &SupplyWorkflow {
        &self.supplies
    }

    pub fn handovers(&self) -> &HandoverLedger {
        &self.handovers
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    pub fn clock(&self) -> &SharedClock {
        &self.ctx.clock
    }

    pub fn now(&self) -> OffsetDateTime {
        self.ctx.now()
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.ctx.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WardEvent> {
        self.ctx.events.subscribe()
    }

    /// Highest version written so far.
    pub async fn watermark(&self) -> Result<u64> {
        Ok(self.ctx.store.watermark().await?)
    }

    /// Every record written after `since`, with the watermark to poll from next.
    pub async fn changes_since(&self, since: u64) -> Result<ChangeSet> {
        let changes = self.ctx.store.changes_since(since).await?;
        tracing::trace!(since, watermark = changes.watermark, count = changes.changes.len(), "changes read");
        Ok(changes)
    }

    pub async fn sweep_once(&self, now: OffsetDateTime) -> Result<SweepReport> {
        self.sweep.run_once(now).await
    }
}
