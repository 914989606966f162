//! Bed registry: creation, administrative status and occupancy queries.
//!
//! Occupancy itself is never set here. It follows from admissions, which
//! commit the bed and the admission together.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ward_core::model::{Admission, Bed, BedLocation, BedStatus};
use ward_core::{Actor, AdmissionId, BedId, EntityKind, Result, WardError, WardId};
use ward_policy::Action;
use ward_storage::{OccupancyCommit, Stored, Write};

use crate::context::{EngineContext, rejected, required};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BedFilter {
    #[serde(default)]
    pub ward: Option<WardId>,
    #[serde(default)]
    pub status: Option<BedStatus>,
}

impl BedFilter {
    pub fn ward(ward: impl Into<WardId>) -> Self {
        Self {
            ward: Some(ward.into()),
            status: None,
        }
    }

    fn matches(&self, bed: &Bed) -> bool {
        self.ward.as_ref().is_none_or(|ward| bed.ward() == ward)
            && self.status.is_none_or(|status| bed.status == status)
    }
}

/// Bed counts per status for one ward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupancySummary {
    pub ward: WardId,
    pub total: usize,
    pub vacant: usize,
    pub occupied: usize,
    pub reserved: usize,
    pub maintenance: usize,
}

impl OccupancySummary {
    fn empty(ward: WardId) -> Self {
        Self {
            ward,
            total: 0,
            vacant: 0,
            occupied: 0,
            reserved: 0,
            maintenance: 0,
        }
    }
}

/// A bed whose status disagrees with the active admissions pointing at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupancyViolation {
    pub bed: BedId,
    pub status: Option<BedStatus>,
    pub current_admission: Option<AdmissionId>,
    pub active_admissions: Vec<AdmissionId>,
}

#[derive(Debug, Clone)]
pub struct BedRegistry {
    ctx: EngineContext,
}

impl BedRegistry {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, actor: &Actor, location: BedLocation) -> Result<Stored<Bed>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Bed, Action::CreateBed)?;
        location.validate().inspect_err(rejected("create_bed"))?;

        let commit = OccupancyCommit::new().bed(Write::Insert(Bed::new(location)));
        let outcome = self.ctx.store.commit_occupancy(commit).await?;
        let bed = outcome
            .beds
            .into_iter()
            .next()
            .ok_or_else(|| WardError::collaborator("bed commit returned no record"))?;

        tracing::info!(
            bed_id = %bed.id,
            ward = %bed.ward(),
            room = %bed.location.room,
            actor = %actor.id,
            "bed created"
        );
        Ok(bed)
    }

    pub async fn set_status(
        &self,
        actor: &Actor,
        bed_id: &BedId,
        status: BedStatus,
    ) -> Result<Stored<Bed>> {
        self.ctx
            .policy
            .require(actor, EntityKind::Bed, Action::SetBedStatus)?;
        let stored = self.get(bed_id).await?;

        let mut bed = stored.record.clone();
        bed.set_status(status).inspect_err(rejected("set_bed_status"))?;

        let commit = OccupancyCommit::new().bed(Write::update(&stored, bed));
        let outcome = self.ctx.store.commit_occupancy(commit).await?;
        let bed = outcome
            .beds
            .into_iter()
            .next()
            .ok_or_else(|| WardError::collaborator("bed commit returned no record"))?;

        tracing::info!(
            bed_id = %bed.id,
            from = %stored.status,
            to = %bed.status,
            actor = %actor.id,
            "bed status changed"
        );
        Ok(bed)
    }

    pub async fn get(&self, bed_id: &BedId) -> Result<Stored<Bed>> {
        required(self.ctx.store.get_bed(bed_id).await?, bed_id)
    }

    pub async fn list(&self, filter: &BedFilter) -> Result<Vec<Stored<Bed>>> {
        let beds = self.ctx.store.list_beds().await?;
        Ok(beds.into_iter().filter(|bed| filter.matches(bed)).collect())
    }

    pub async fn occupancy_summary(&self, ward: &WardId) -> Result<OccupancySummary> {
        let beds = self.list(&BedFilter::ward(ward.clone())).await?;
        let mut summary = OccupancySummary::empty(ward.clone());
        for bed in &beds {
            summary.total += 1;
            match bed.status {
                BedStatus::Vacant => summary.vacant += 1,
                BedStatus::Occupied => summary.occupied += 1,
                BedStatus::Reserved => summary.reserved += 1,
                BedStatus::Maintenance => summary.maintenance += 1,
            }
        }
        Ok(summary)
    }

    /// Every bed where `occupied` does not coincide with exactly one active
    /// admission. Empty when the registry is healthy.
    pub async fn check_invariant(&self) -> Result<Vec<OccupancyViolation>> {
        let beds = self.ctx.store.list_beds().await?;
        let admissions = self.ctx.store.list_admissions().await?;

        let mut active: HashMap<&BedId, Vec<&Admission>> = HashMap::new();
        for admission in admissions.iter().filter(|a| a.is_active()) {
            active.entry(&admission.bed).or_default().push(&admission.record);
        }

        let mut violations = Vec::new();
        for bed in &beds {
            let occupants = active.remove(&bed.id).unwrap_or_default();
            let consistent = match (bed.status, occupants.as_slice()) {
                (BedStatus::Occupied, [only]) => bed.current_admission.as_ref() == Some(&only.id),
                (_, []) => !bed.is_occupied() && bed.current_admission.is_none(),
                _ => false,
            };
            if !consistent {
                violations.push(OccupancyViolation {
                    bed: bed.id.clone(),
                    status: Some(bed.status),
                    current_admission: bed.current_admission.clone(),
                    active_admissions: occupants.iter().map(|a| a.id.clone()).collect(),
                });
            }
        }

        // Active admissions pointing at a bed that does not exist.
        for (bed_id, occupants) in active {
            violations.push(OccupancyViolation {
                bed: bed_id.clone(),
                status: None,
                current_admission: None,
                active_admissions: occupants.iter().map(|a| a.id.clone()).collect(),
            });
        }

        if !violations.is_empty() {
            tracing::warn!(count = violations.len(), "bed occupancy invariant violated");
        }
        Ok(violations)
    }
}
