//! Admission lifecycle. Every change that touches a bed commits the bed and
//! the admission together.

use std::collections::HashMap;

use serde::Deserialize;
use ward_core::model::{Admission, AdmissionStatus, AdmissionType, Bed};
use ward_core::{
    Actor, AdmissionId, BedId, EntityKind, PatientId, Result, StaffId, WardError, WardId,
};
use ward_policy::Action;
use ward_storage::{OccupancyCommit, OccupancyOutcome, Stored, Write};

use crate::context::{EngineContext, rejected, required};

#[derive(Debug, Clone, Deserialize)]
pub struct AdmitPatient {
    pub patient: PatientId,
    pub bed: BedId,
    pub attending: StaffId,
    pub admission_type: AdmissionType,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdmissionFilter {
    #[serde(default)]
    pub ward: Option<WardId>,
    #[serde(default)]
    pub status: Option<AdmissionStatus>,
}

#[derive(Debug, Clone)]
pub struct AdmissionLifecycle {
    ctx: EngineContext,
}

impl AdmissionLifecycle {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Occupy a vacant bed and open an `active` admission in one commit.
    pub async fn admit(&self, actor: &Actor, command: AdmitPatient) -> Result<Stored<Admission>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Admission, Action::Admit)?;

        if let Some(existing) = self
            .ctx
            .store
            .active_admission_for_patient(&command.patient)
            .await?
        {
            tracing::debug!(
                patient = %command.patient,
                admission_id = %existing.id,
                "patient already admitted"
            );
            return Err(WardError::patient_already_admitted(&command.patient));
        }

        let bed = self.bed(&command.bed).await?;
        let admission = Admission::new(
            command.patient,
            command.bed,
            command.attending,
            command.admission_type,
            self.ctx.now(),
        );
        let mut occupied = bed.record.clone();
        occupied
            .occupy(&admission.id)
            .inspect_err(rejected("admit"))?;

        let commit = OccupancyCommit::new()
            .bed(Write::update(&bed, occupied))
            .admission(Write::Insert(admission));
        let admission = committed_admission(self.ctx.store.commit_occupancy(commit).await?)?;

        tracing::info!(
            admission_id = %admission.id,
            patient = %admission.patient,
            bed_id = %admission.bed,
            admission_type = %admission.admission_type,
            actor = %actor.id,
            "patient admitted"
        );
        Ok(admission)
    }

    /// Move along the admission state machine. A terminal target frees the
    /// bed in the same commit.
    pub async fn update_status(
        &self,
        actor: &Actor,
        admission_id: &AdmissionId,
        status: AdmissionStatus,
    ) -> Result<Stored<Admission>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Admission, Action::UpdateAdmissionStatus)?;
        let stored = self.get(admission_id).await?;

        let mut admission = stored.record.clone();
        admission
            .transition(status, self.ctx.now())
            .inspect_err(rejected("update_admission_status"))?;

        let updated = self.commit(&stored, admission).await?;
        tracing::info!(
            admission_id = %updated.id,
            from = %stored.status,
            to = %updated.status,
            actor = %actor.id,
            "admission status changed"
        );
        Ok(updated)
    }

    /// Move the patient to `new_bed`. Nothing changes unless the whole move
    /// commits; any failure other than a denial or an outage is reported as
    /// `TransferFailed`.
    pub async fn transfer(
        &self,
        actor: &Actor,
        admission_id: &AdmissionId,
        new_bed: &BedId,
    ) -> Result<Stored<Admission>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Admission, Action::Transfer)?;

        match self.try_transfer(admission_id, new_bed).await {
            Ok(admission) => {
                tracing::info!(
                    admission_id = %admission.id,
                    bed_id = %admission.bed,
                    actor = %actor.id,
                    "patient transferred"
                );
                Ok(admission)
            }
            Err(err @ (WardError::Forbidden | WardError::CollaboratorUnavailable(_))) => Err(err),
            Err(err) => {
                tracing::debug!(admission_id = %admission_id, error = %err, "transfer rejected");
                Err(WardError::transfer_failed(admission_id, err))
            }
        }
    }

    async fn try_transfer(
        &self,
        admission_id: &AdmissionId,
        new_bed: &BedId,
    ) -> Result<Stored<Admission>> {
        let stored = self.get(admission_id).await?;
        let old_bed = self.bed(&stored.bed).await?;
        let target_bed = self.bed(new_bed).await?;

        let mut admission = stored.record.clone();
        admission.move_to_bed(new_bed.clone(), self.ctx.now())?;

        let mut released = old_bed.record.clone();
        release_for(&mut released, &admission.id)?;
        let mut occupied = target_bed.record.clone();
        occupied.occupy(&admission.id)?;

        let commit = OccupancyCommit::new()
            .bed(Write::update(&old_bed, released))
            .bed(Write::update(&target_bed, occupied))
            .admission(Write::update(&stored, admission));
        committed_admission(self.ctx.store.commit_occupancy(commit).await?)
    }

    pub async fn discharge(
        &self,
        actor: &Actor,
        admission_id: &AdmissionId,
        summary: Option<String>,
    ) -> Result<Stored<Admission>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Admission, Action::Discharge)?;
        let stored = self.get(admission_id).await?;

        let mut admission = stored.record.clone();
        admission
            .discharge(summary, self.ctx.now())
            .inspect_err(rejected("discharge"))?;

        let discharged = self.commit(&stored, admission).await?;
        tracing::info!(
            admission_id = %discharged.id,
            bed_id = %discharged.bed,
            actor = %actor.id,
            "patient discharged"
        );
        Ok(discharged)
    }

    pub async fn record_death(
        &self,
        actor: &Actor,
        admission_id: &AdmissionId,
        notes: Option<String>,
    ) -> Result<Stored<Admission>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Admission, Action::RecordDeath)?;
        let stored = self.get(admission_id).await?;
        if stored.status.is_terminal() {
            return Err(WardError::already_terminal(
                EntityKind::Admission,
                &stored.id,
                stored.status,
            ));
        }

        let mut admission = stored.record.clone();
        admission.transition(AdmissionStatus::Deceased, self.ctx.now())?;
        admission.discharge_summary = notes;

        let closed = self.commit(&stored, admission).await?;
        tracing::info!(admission_id = %closed.id, actor = %actor.id, "death recorded");
        Ok(closed)
    }

    pub async fn get(&self, admission_id: &AdmissionId) -> Result<Stored<Admission>> {
        self.ctx.admission(admission_id).await
    }

    pub async fn list(&self, filter: &AdmissionFilter) -> Result<Vec<Stored<Admission>>> {
        let admissions = self.ctx.store.list_admissions().await?;
        let wards: HashMap<BedId, WardId> = match &filter.ward {
            Some(_) => self
                .ctx
                .store
                .list_beds()
                .await?
                .into_iter()
                .map(|bed| (bed.id.clone(), bed.ward().clone()))
                .collect(),
            None => HashMap::new(),
        };

        Ok(admissions
            .into_iter()
            .filter(|a| filter.status.is_none_or(|status| a.status == status))
            .filter(|a| {
                filter
                    .ward
                    .as_ref()
                    .is_none_or(|ward| wards.get(&a.bed) == Some(ward))
            })
            .collect())
    }

    pub async fn active_for_patient(&self, patient: &PatientId) -> Result<Option<Stored<Admission>>> {
        Ok(self.ctx.store.active_admission_for_patient(patient).await?)
    }

    /// Fails with `AdmissionClosed` once the stay has ended.
    pub async fn require_open(&self, admission_id: &AdmissionId) -> Result<Stored<Admission>> {
        self.ctx.open_admission(admission_id).await
    }

    /// Commits an admission update, releasing its bed when the stay closed.
    async fn commit(
        &self,
        stored: &Stored<Admission>,
        admission: Admission,
    ) -> Result<Stored<Admission>> {
        let mut commit = OccupancyCommit::new();
        if admission.status.is_terminal() {
            let bed = self.bed(&admission.bed).await?;
            let mut released = bed.record.clone();
            release_for(&mut released, &admission.id)?;
            commit = commit.bed(Write::update(&bed, released));
        }
        let commit = commit.admission(Write::update(stored, admission));
        committed_admission(self.ctx.store.commit_occupancy(commit).await?)
    }

    async fn bed(&self, bed_id: &BedId) -> Result<Stored<Bed>> {
        required(self.ctx.store.get_bed(bed_id).await?, bed_id)
    }
}

/// Releases `bed` only if `admission` is the one holding it.
fn release_for(bed: &mut Bed, admission: &AdmissionId) -> Result<()> {
    if bed.current_admission.as_ref() != Some(admission) {
        return Err(WardError::not_occupied(&bed.id));
    }
    bed.release().map(|_| ())
}

fn committed_admission(outcome: OccupancyOutcome) -> Result<Stored<Admission>> {
    outcome
        .admissions
        .into_iter()
        .next()
        .ok_or_else(|| WardError::collaborator("admission commit returned no record"))
}
