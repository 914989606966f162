//! Bed/admission aggregate tables and the occupancy commit.

use std::collections::HashMap;

use time::OffsetDateTime;
use ward_core::model::{Admission, Bed};
use ward_core::{AdmissionId, BedId, EntityKind};
use ward_storage::{
    Constraint, OccupancyCommit, OccupancyOutcome, StorageError, StorageResult, Stored, Write,
};

#[derive(Default)]
pub(crate) struct OccupancyTables {
    pub beds: HashMap<BedId, Stored<Bed>>,
    pub admissions: HashMap<AdmissionId, Stored<Admission>>,
}

/// Writes that passed their existence and version checks.
struct Staged {
    beds: Vec<(Bed, Option<u64>)>,
    admissions: Vec<(Admission, Option<u64>)>,
}

impl OccupancyTables {
    /// Check and apply `commit`. Nothing is written unless every check passes.
    pub fn apply(
        &mut self,
        commit: OccupancyCommit,
        mut next_version: impl FnMut() -> u64,
        at: OffsetDateTime,
    ) -> StorageResult<OccupancyOutcome> {
        let staged = self.stage(commit)?;
        self.check_constraints(&staged)?;

        let mut outcome = OccupancyOutcome::default();
        for (bed, previous) in staged.beds {
            let stored = write_row(&mut self.beds, bed.id.clone(), bed, previous, next_version(), at);
            outcome.beds.push(stored);
        }
        for (admission, previous) in staged.admissions {
            let stored = write_row(
                &mut self.admissions,
                admission.id.clone(),
                admission,
                previous,
                next_version(),
                at,
            );
            outcome.admissions.push(stored);
        }
        Ok(outcome)
    }

    fn stage(&self, commit: OccupancyCommit) -> StorageResult<Staged> {
        let mut beds: Vec<(Bed, Option<u64>)> = Vec::with_capacity(commit.beds.len());
        for write in commit.beds {
            let (bed, expected) = check_write(&self.beds, write, EntityKind::Bed, |b| &b.id)?;
            if beds.iter().any(|(b, _)| b.id == bed.id) {
                return Err(StorageError::already_exists(EntityKind::Bed, &bed.id));
            }
            beds.push((bed, expected));
        }
        let mut admissions: Vec<(Admission, Option<u64>)> =
            Vec::with_capacity(commit.admissions.len());
        for write in commit.admissions {
            let (admission, expected) =
                check_write(&self.admissions, write, EntityKind::Admission, |a| &a.id)?;
            if admissions.iter().any(|(a, _)| a.id == admission.id) {
                return Err(StorageError::already_exists(
                    EntityKind::Admission,
                    &admission.id,
                ));
            }
            admissions.push((admission, expected));
        }
        Ok(Staged { beds, admissions })
    }

    fn check_constraints(&self, staged: &Staged) -> StorageResult<()> {
        let view = View {
            tables: self,
            staged,
        };

        for (admission, _) in &staged.admissions {
            if !admission.is_active() {
                continue;
            }
            let others = view.active_admissions().filter(|a| a.id != admission.id);
            for other in others {
                if other.bed == admission.bed {
                    return Err(StorageError::constraint(Constraint::BedOccupied {
                        bed_id: admission.bed.to_string(),
                    }));
                }
                if other.patient == admission.patient {
                    return Err(StorageError::constraint(Constraint::PatientAdmitted {
                        patient_id: admission.patient.to_string(),
                    }));
                }
            }
        }

        // Every bed touched by this commit, directly or through an admission,
        // must agree with the admissions that point at it.
        let mut touched: Vec<&BedId> = staged.beds.iter().map(|(b, _)| &b.id).collect();
        for (admission, previous) in &staged.admissions {
            touched.push(&admission.bed);
            if previous.is_some()
                && let Some(old) = self.admissions.get(&admission.id)
            {
                touched.push(&old.record.bed);
            }
        }
        touched.sort();
        touched.dedup();

        for bed_id in touched {
            let Some(bed) = view.bed(bed_id) else {
                return Err(StorageError::not_found(EntityKind::Bed, bed_id));
            };
            let occupant = view.active_admissions().find(|a| &a.bed == bed_id);
            let consistent = match (&bed.current_admission, occupant) {
                (Some(current), Some(admission)) => bed.is_occupied() && *current == admission.id,
                (None, None) => !bed.is_occupied(),
                _ => false,
            };
            if !consistent {
                return Err(StorageError::constraint(Constraint::OccupancyMismatch {
                    bed_id: bed_id.to_string(),
                }));
            }
        }
        Ok(())
    }
}

/// The aggregate as it would look after the staged writes.
struct View<'a> {
    tables: &'a OccupancyTables,
    staged: &'a Staged,
}

impl<'a> View<'a> {
    fn bed(&self, id: &BedId) -> Option<&'a Bed> {
        let (tables, staged) = (self.tables, self.staged);
        staged
            .beds
            .iter()
            .map(|(b, _)| b)
            .find(|b| &b.id == id)
            .or_else(|| tables.beds.get(id).map(|s| &s.record))
    }

    fn active_admissions(&self) -> impl Iterator<Item = &'a Admission> + 'a {
        let (tables, staged) = (self.tables, self.staged);
        let existing = tables
            .admissions
            .values()
            .map(|s| &s.record)
            .filter(move |a| !staged.admissions.iter().any(|(s, _)| s.id == a.id));
        staged
            .admissions
            .iter()
            .map(|(a, _)| a)
            .chain(existing)
            .filter(|a| a.is_active())
    }
}

fn check_write<T, K>(
    table: &HashMap<K, Stored<T>>,
    write: Write<T>,
    entity: EntityKind,
    key: impl Fn(&T) -> &K,
) -> StorageResult<(T, Option<u64>)>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
{
    match write {
        Write::Insert(record) => {
            if table.contains_key(key(&record)) {
                return Err(StorageError::already_exists(entity, key(&record)));
            }
            Ok((record, None))
        }
        Write::Update {
            record,
            expected_version,
        } => {
            let current = table
                .get(key(&record))
                .ok_or_else(|| StorageError::not_found(entity, key(&record)))?;
            if current.version != expected_version {
                return Err(StorageError::version_conflict(
                    entity,
                    key(&record),
                    expected_version,
                    current.version,
                ));
            }
            Ok((record, Some(expected_version)))
        }
    }
}

fn write_row<K, T>(
    table: &mut HashMap<K, Stored<T>>,
    key: K,
    record: T,
    previous: Option<u64>,
    version: u64,
    at: OffsetDateTime,
) -> Stored<T>
where
    K: std::hash::Hash + Eq,
    T: Clone,
{
    let created_at = match (previous, table.get(&key)) {
        (Some(_), Some(existing)) => existing.created_at,
        _ => at,
    };
    let stored = Stored {
        record,
        version,
        created_at,
        last_updated: at,
    };
    table.insert(key, stored.clone());
    stored
}
