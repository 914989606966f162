//! Doctor orders, medication schedules and the administration record.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use ward_core::model::{
    AdministrationDetails, DoctorOrder, MedicationAdministration, MedicationSchedule,
    OrderPriority, OrderStatus, OrderType, Regimen, SkipDisposition,
};
use ward_core::{
    Actor, AdministrationId, AdmissionId, EntityKind, OrderId, Result, ScheduleId, StaffId,
    WardError,
};
use ward_policy::Action;
use ward_storage::Stored;

use crate::context::{EngineContext, rejected, required};

/// Attempts at re-reading a record that moved while a cascade was cancelling it.
const CASCADE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrder {
    pub admission: AdmissionId,
    pub order_type: OrderType,
    pub priority: OrderPriority,
    pub description: String,
}

/// A new schedule with the administrations generated for it.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledMedication {
    pub schedule: Stored<MedicationSchedule>,
    pub administrations: Vec<Stored<MedicationAdministration>>,
}

/// A pending dose on the due list. `overdue` is advisory only.
#[derive(Debug, Clone, Serialize)]
pub struct DueDose {
    pub administration: Stored<MedicationAdministration>,
    pub overdue: bool,
}

#[derive(Debug, Clone)]
pub struct OrderPipeline {
    ctx: EngineContext,
}

impl OrderPipeline {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub async fn create_order(
        &self,
        actor: &Actor,
        command: CreateOrder,
    ) -> Result<Stored<DoctorOrder>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Order, Action::CreateOrder)?;
        self.ctx.open_admission(&command.admission).await?;

        let order = DoctorOrder::new(
            command.admission,
            actor.id.clone(),
            command.order_type,
            command.priority,
            command.description,
            self.ctx.now(),
        )
        .inspect_err(rejected("create_order"))?;
        let order = self.ctx.store.insert_order(order).await?;

        tracing::info!(
            order_id = %order.id,
            admission_id = %order.admission,
            order_type = %order.order_type,
            priority = %order.priority,
            actor = %actor.id,
            "order created"
        );
        Ok(order)
    }

    pub async fn hold_order(&self, actor: &Actor, order_id: &OrderId) -> Result<Stored<DoctorOrder>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Order, Action::HoldOrder)?;
        self.transition_order(actor, order_id, OrderStatus::OnHold).await
    }

    pub async fn resume_order(
        &self,
        actor: &Actor,
        order_id: &OrderId,
    ) -> Result<Stored<DoctorOrder>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Order, Action::ResumeOrder)?;
        self.transition_order(actor, order_id, OrderStatus::Active).await
    }

    /// Completes the order; doses not yet given are cancelled.
    pub async fn complete_order(
        &self,
        actor: &Actor,
        order_id: &OrderId,
    ) -> Result<Stored<DoctorOrder>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Order, Action::CompleteOrder)?;
        let order = self
            .transition_order(actor, order_id, OrderStatus::Completed)
            .await?;
        self.cascade(&actor.id, &order.id, "order completed").await?;
        Ok(order)
    }

    /// Cancels the order, its schedules and every still-pending dose.
    /// Recorded administrations stay as they are.
    pub async fn cancel_order(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        reason: &str,
    ) -> Result<Stored<DoctorOrder>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Order, Action::CancelOrder)?;
        let stored = self.get_order(order_id).await?;

        let mut order = stored.record.clone();
        order
            .cancel(reason, self.ctx.now())
            .inspect_err(rejected("cancel_order"))?;
        let order = self.ctx.store.update_order(order, stored.version).await?;
        tracing::info!(
            order_id = %order.id,
            from = %stored.status,
            actor = %actor.id,
            reason,
            "order cancelled"
        );

        self.cascade(&actor.id, &order.id, reason).await?;
        Ok(order)
    }

    async fn transition_order(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        target: OrderStatus,
    ) -> Result<Stored<DoctorOrder>> {
        let stored = self.get_order(order_id).await?;
        let mut order = stored.record.clone();
        order
            .transition(target, self.ctx.now())
            .inspect_err(rejected("transition_order"))?;
        let order = self.ctx.store.update_order(order, stored.version).await?;

        tracing::info!(
            order_id = %order.id,
            from = %stored.status,
            to = %order.status,
            actor = %actor.id,
            "order status changed"
        );
        Ok(order)
    }

    pub async fn schedule_medication(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        regimen: Regimen,
    ) -> Result<ScheduledMedication> {
        self.ctx
            .policy
            .require(actor, EntityKind::MedicationSchedule, Action::ScheduleMedication)?;
        let order = self.get_order(order_id).await?;
        if !order.is_medication() {
            return Err(WardError::validation(format!(
                "order {} is a {} order; only medication orders can be scheduled",
                order.id, order.order_type
            )));
        }
        order.ensure_active().inspect_err(rejected("schedule_medication"))?;
        self.ctx.open_admission(&order.admission).await?;

        let now = self.ctx.now();
        let mut schedule = MedicationSchedule::new(
            order.id.clone(),
            order.admission.clone(),
            regimen,
            actor.id.clone(),
            now,
        )
        .inspect_err(rejected("schedule_medication"))?;

        let until = self.materialize_until(&schedule.regimen, now);
        let doses = schedule.materialize(until, self.ctx.config.max_administrations_per_schedule);
        let pending: Vec<_> = doses
            .into_iter()
            .map(|at| MedicationAdministration::pending(&schedule, at))
            .collect();

        let schedule = self.ctx.store.insert_schedule(schedule).await?;
        let administrations = self.ctx.store.insert_administrations(pending).await?;

        tracing::info!(
            schedule_id = %schedule.id,
            order_id = %schedule.order,
            medication = %schedule.regimen.medication,
            doses = administrations.len(),
            open_ended = schedule.regimen.is_open_ended(),
            actor = %actor.id,
            "medication scheduled"
        );
        Ok(ScheduledMedication {
            schedule,
            administrations,
        })
    }

    /// Cancels one schedule and its pending doses.
    pub async fn cancel_schedule(
        &self,
        actor: &Actor,
        schedule_id: &ScheduleId,
        reason: &str,
    ) -> Result<Stored<MedicationSchedule>> {
        self.ctx
            .policy
            .require(actor, EntityKind::MedicationSchedule, Action::CancelSchedule)?;
        if reason.trim().is_empty() {
            return Err(WardError::validation("cancellation reason must not be empty"));
        }
        let stored = self.get_schedule(schedule_id).await?;

        let mut schedule = stored.record.clone();
        schedule
            .cancel(reason)
            .inspect_err(rejected("cancel_schedule"))?;
        let schedule = self
            .ctx
            .store
            .update_schedule(schedule, stored.version)
            .await?;
        self.cancel_pending(&actor.id, &schedule.id, reason).await?;

        tracing::info!(schedule_id = %schedule.id, actor = %actor.id, reason, "schedule cancelled");
        Ok(schedule)
    }

    /// Records a dose as given.
    pub async fn administer(
        &self,
        actor: &Actor,
        administration_id: &AdministrationId,
        details: AdministrationDetails,
    ) -> Result<Stored<MedicationAdministration>> {
        self.ctx.policy.require(
            actor,
            EntityKind::MedicationAdministration,
            Action::Administer,
        )?;
        let stored = self.get_administration(administration_id).await?;
        self.ctx.open_admission(&stored.admission).await?;

        let mut administration = stored.record.clone();
        administration
            .administer(
                &actor.id,
                details,
                self.ctx.now(),
                self.ctx.config.grace_window(),
            )
            .inspect_err(rejected("administer"))?;
        let order = self.get_order(&administration.order).await?;
        order.ensure_active().inspect_err(rejected("administer"))?;

        let administration = self
            .ctx
            .store
            .update_administration(administration, stored.version)
            .await?;
        tracing::info!(
            administration_id = %administration.id,
            schedule_id = %administration.schedule,
            scheduled_at = %administration.scheduled_at,
            actor = %actor.id,
            "medication administered"
        );
        Ok(administration)
    }

    pub async fn skip(
        &self,
        actor: &Actor,
        administration_id: &AdministrationId,
        reason: &str,
        disposition: SkipDisposition,
    ) -> Result<Stored<MedicationAdministration>> {
        self.ctx
            .policy
            .require(actor, EntityKind::MedicationAdministration, Action::Skip)?;
        let stored = self.get_administration(administration_id).await?;
        self.ctx.open_admission(&stored.admission).await?;

        let mut administration = stored.record.clone();
        administration
            .skip(&actor.id, reason, disposition, self.ctx.now())
            .inspect_err(rejected("skip_dose"))?;
        let administration = self
            .ctx
            .store
            .update_administration(administration, stored.version)
            .await?;

        tracing::info!(
            administration_id = %administration.id,
            disposition = %disposition,
            actor = %actor.id,
            "dose skipped"
        );
        Ok(administration)
    }

    pub async fn get_order(&self, order_id: &OrderId) -> Result<Stored<DoctorOrder>> {
        required(self.ctx.store.get_order(order_id).await?, order_id)
    }

    pub async fn orders_for_admission(
        &self,
        admission_id: &AdmissionId,
    ) -> Result<Vec<Stored<DoctorOrder>>> {
        Ok(self.ctx.store.orders_for_admission(admission_id).await?)
    }

    pub async fn get_schedule(&self, schedule_id: &ScheduleId) -> Result<Stored<MedicationSchedule>> {
        required(self.ctx.store.get_schedule(schedule_id).await?, schedule_id)
    }

    pub async fn schedules_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<Stored<MedicationSchedule>>> {
        Ok(self.ctx.store.schedules_for_order(order_id).await?)
    }

    pub async fn get_administration(
        &self,
        administration_id: &AdministrationId,
    ) -> Result<Stored<MedicationAdministration>> {
        required(
            self.ctx.store.get_administration(administration_id).await?,
            administration_id,
        )
    }

    /// Administrations of one schedule, earliest first.
    pub async fn administrations_for_schedule(
        &self,
        schedule_id: &ScheduleId,
    ) -> Result<Vec<Stored<MedicationAdministration>>> {
        Ok(self
            .ctx
            .store
            .administrations_for_schedule(schedule_id)
            .await?)
    }

    /// Pending doses for the admission scheduled before `now + lookahead`.
    pub async fn due_list(
        &self,
        admission_id: &AdmissionId,
        now: OffsetDateTime,
        lookahead: Duration,
    ) -> Result<Vec<DueDose>> {
        let grace = self.ctx.config.grace_window();
        let until = now + lookahead;
        let administrations = self
            .ctx
            .store
            .administrations_for_admission(admission_id)
            .await?;

        Ok(administrations
            .into_iter()
            .filter(|a| a.status.is_pending() && a.scheduled_at <= until)
            .map(|administration| DueDose {
                overdue: administration.is_overdue(now, grace),
                administration,
            })
            .collect())
    }

    /// Generates pending doses for active schedules up to the horizon.
    ///
    /// Returns the number of administrations created. Schedules that moved
    /// concurrently or whose order is no longer active are left for the
    /// next pass. Schedules of a closed admission are cancelled together
    /// with their pending doses.
    pub async fn extend_open_schedules(&self, now: OffsetDateTime) -> Result<usize> {
        let horizon = now + self.ctx.config.materialization_horizon();
        let cap = self.ctx.config.max_administrations_per_schedule;
        let mut created = 0;

        for stored in self.ctx.store.active_schedules().await? {
            if self.retire_if_closed(&stored).await? {
                continue;
            }
            match stored.next_unmaterialized() {
                Some(next) if next <= horizon => {}
                _ => continue,
            }
            let Some(order) = self.ctx.store.get_order(&stored.order).await? else {
                continue;
            };
            if order.status != OrderStatus::Active {
                tracing::debug!(schedule_id = %stored.id, order_status = %order.status, "schedule extension skipped");
                continue;
            }

            let mut schedule = stored.record.clone();
            let doses = schedule.materialize(horizon, cap);
            if doses.is_empty() {
                continue;
            }
            let pending: Vec<_> = doses
                .into_iter()
                .map(|at| MedicationAdministration::pending(&schedule, at))
                .collect();

            match self.ctx.store.update_schedule(schedule, stored.version).await {
                Ok(_) => {}
                Err(err) if err.is_version_conflict() => {
                    tracing::debug!(schedule_id = %stored.id, "schedule changed during extension");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
            let inserted = self.ctx.store.insert_administrations(pending).await?;
            created += inserted.len();
            tracing::info!(schedule_id = %stored.id, doses = inserted.len(), "schedule extended");
        }
        Ok(created)
    }

    /// Cancels a schedule whose admission has ended. Returns whether it did.
    async fn retire_if_closed(&self, stored: &Stored<MedicationSchedule>) -> Result<bool> {
        let admission = self.ctx.admission(&stored.admission).await?;
        if admission.is_active() {
            return Ok(false);
        }
        let reason = format!("admission {}", admission.status);
        let by = StaffId::new(Actor::SYSTEM_ID);
        self.cancel_schedule_record(stored.clone(), &reason).await?;
        let cancelled = self.cancel_pending(&by, &stored.id, &reason).await?;
        tracing::info!(
            schedule_id = %stored.id,
            admission_id = %admission.id,
            cancelled,
            "schedule retired with its admission"
        );
        Ok(true)
    }

    fn materialize_until(&self, regimen: &Regimen, now: OffsetDateTime) -> OffsetDateTime {
        match regimen.end {
            Some(end) => end,
            None if regimen.is_open_ended() => now + self.ctx.config.materialization_horizon(),
            None => regimen.start,
        }
    }

    /// Cancels every active schedule of the order and their pending doses.
    async fn cascade(&self, by: &StaffId, order_id: &OrderId, reason: &str) -> Result<()> {
        let schedules = self.ctx.store.schedules_for_order(order_id).await?;
        let mut cancelled = 0;
        for schedule in schedules {
            self.cancel_schedule_record(schedule.clone(), reason).await?;
            cancelled += self.cancel_pending(by, &schedule.id, reason).await?;
        }
        tracing::debug!(order_id = %order_id, cancelled, "pending doses cancelled");
        Ok(())
    }

    async fn cancel_schedule_record(
        &self,
        mut current: Stored<MedicationSchedule>,
        reason: &str,
    ) -> Result<()> {
        for _ in 0..CASCADE_ATTEMPTS {
            if !current.is_active() {
                return Ok(());
            }
            let mut schedule = current.record.clone();
            schedule.cancel(reason)?;
            match self.ctx.store.update_schedule(schedule, current.version).await {
                Ok(_) => return Ok(()),
                Err(err) if err.is_version_conflict() => {
                    current = self.get_schedule(&current.id).await?;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(WardError::conflict(EntityKind::MedicationSchedule, &current.id))
    }

    /// Cancels the still-pending doses of a schedule, returning how many.
    async fn cancel_pending(&self, by: &StaffId, schedule_id: &ScheduleId, reason: &str) -> Result<usize> {
        let administrations = self
            .ctx
            .store
            .administrations_for_schedule(schedule_id)
            .await?;
        let mut cancelled = 0;
        for administration in administrations.into_iter().filter(|a| a.status.is_pending()) {
            if self.cancel_administration(by, administration, reason).await? {
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    async fn cancel_administration(
        &self,
        by: &StaffId,
        mut current: Stored<MedicationAdministration>,
        reason: &str,
    ) -> Result<bool> {
        for _ in 0..CASCADE_ATTEMPTS {
            if !current.status.is_pending() {
                return Ok(false);
            }
            let mut administration = current.record.clone();
            administration.cancel(by, reason, self.ctx.now())?;
            match self
                .ctx
                .store
                .update_administration(administration, current.version)
                .await
            {
                Ok(_) => return Ok(true),
                Err(err) if err.is_version_conflict() => {
                    current = self.get_administration(&current.id).await?;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(WardError::conflict(
            EntityKind::MedicationAdministration,
            &current.id,
        ))
    }
}
