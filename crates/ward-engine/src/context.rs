use std::fmt;
use std::sync::Arc;

use time::OffsetDateTime;
use ward_core::model::Admission;
use ward_core::{AdmissionId, EventBroadcaster, Result, SharedClock, WardError, WardId};
use ward_policy::AccessPolicy;
use ward_storage::{DynWardStore, Record, Stored};

use crate::config::EngineConfig;

/// Collaborators shared by every workflow service.
#[derive(Clone)]
pub struct EngineContext {
    pub store: DynWardStore,
    pub policy: AccessPolicy,
    pub clock: SharedClock,
    pub events: EventBroadcaster,
    pub config: Arc<EngineConfig>,
}

impl EngineContext {
    pub fn new(store: DynWardStore, clock: SharedClock, config: EngineConfig) -> Self {
        Self {
            store,
            policy: AccessPolicy::default(),
            clock,
            events: EventBroadcaster::new(),
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventBroadcaster) -> Self {
        self.events = events;
        self
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    pub(crate) async fn admission(&self, id: &AdmissionId) -> Result<Stored<Admission>> {
        required(self.store.get_admission(id).await?, id)
    }

    /// Loads an admission that other workflows may still attach work to.
    pub(crate) async fn open_admission(&self, id: &AdmissionId) -> Result<Stored<Admission>> {
        let admission = self.admission(id).await?;
        admission
            .ensure_open()
            .inspect_err(rejected("require_open_admission"))?;
        Ok(admission)
    }

    /// Ward of the bed the admission currently occupies.
    pub(crate) async fn ward_of(&self, admission: &Admission) -> Result<WardId> {
        let bed = required(self.store.get_bed(&admission.bed).await?, &admission.bed)?;
        Ok(bed.ward().clone())
    }
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("policy", &self.policy)
            .field("clock", &self.clock)
            .field("events", &self.events)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

pub(crate) fn required<T: Record>(found: Option<Stored<T>>, id: &T::Id) -> Result<Stored<T>> {
    found.ok_or_else(|| WardError::not_found(T::KIND, id))
}

/// Logs a domain rejection. Denials are already logged by the policy.
pub(crate) fn rejected(operation: &'static str) -> impl Fn(&WardError) {
    move |err| {
        if !err.is_forbidden() {
            tracing::debug!(operation, kind = err.kind(), error = %err, "operation rejected");
        }
    }
}
