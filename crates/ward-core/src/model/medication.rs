use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{Result, WardError};
use crate::id::{AdministrationId, AdmissionId, OrderId, ScheduleId, StaffId};
use crate::model::EntityKind;

/// How often a regimen repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Frequency {
    Once,
    EveryHours(u32),
    TimesPerDay(u32),
}

impl Frequency {
    /// Gap between two doses, `None` for a single dose.
    pub fn interval(&self) -> Option<Duration> {
        match *self {
            Self::Once => None,
            Self::EveryHours(hours) => Some(Duration::hours(i64::from(hours))),
            Self::TimesPerDay(times) => Some(Duration::minutes(24 * 60 / i64::from(times.max(1)))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Once => Ok(()),
            Self::EveryHours(0) => Err(WardError::validation("dosing interval must be at least one hour")),
            Self::EveryHours(_) => Ok(()),
            Self::TimesPerDay(times) if times == 0 || times > 24 => Err(WardError::validation(
                "times per day must be between 1 and 24",
            )),
            Self::TimesPerDay(_) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regimen {
    pub medication: String,
    pub dosage: f64,
    pub unit: String,
    pub route: String,
    pub frequency: Frequency,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
}

impl Regimen {
    pub fn validate(&self) -> Result<()> {
        if self.medication.trim().is_empty() {
            return Err(WardError::validation("medication name must not be empty"));
        }
        if !self.dosage.is_finite() || self.dosage <= 0.0 {
            return Err(WardError::validation("dosage must be greater than zero"));
        }
        if self.unit.trim().is_empty() || self.route.trim().is_empty() {
            return Err(WardError::validation("dosage unit and route are required"));
        }
        if let Some(end) = self.end
            && end <= self.start
        {
            return Err(WardError::validation("regimen end must be after its start"));
        }
        self.frequency.validate()
    }

    /// A repeating regimen without an end date.
    pub fn is_open_ended(&self) -> bool {
        self.end.is_none() && self.frequency != Frequency::Once
    }

    /// First dose strictly after `after`, or the first dose at all.
    pub fn next_after(&self, after: Option<OffsetDateTime>) -> Option<OffsetDateTime> {
        let candidate = match (after, self.frequency.interval()) {
            (None, _) => self.start,
            (Some(_), None) => return None,
            (Some(after), Some(_)) if after < self.start => self.start,
            (Some(after), Some(interval)) => {
                let elapsed = (after - self.start).whole_seconds();
                let step = interval.whole_seconds();
                self.start + interval * (elapsed / step + 1) as i32
            }
        };
        match self.end {
            Some(end) if candidate > end => None,
            _ => Some(candidate),
        }
    }

    /// Dose times after `after` and no later than `until`, at most `cap` of them.
    pub fn doses_between(
        &self,
        after: Option<OffsetDateTime>,
        until: OffsetDateTime,
        cap: usize,
    ) -> Vec<OffsetDateTime> {
        let mut doses = Vec::new();
        let mut cursor = after;
        while doses.len() < cap {
            match self.next_after(cursor) {
                Some(next) if next <= until => {
                    doses.push(next);
                    cursor = Some(next);
                }
                _ => break,
            }
        }
        doses
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Active,
    Cancelled,
}

string_enum!(ScheduleStatus {
    Active => "active",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationSchedule {
    pub id: ScheduleId,
    pub order: OrderId,
    pub admission: AdmissionId,
    pub regimen: Regimen,
    pub status: ScheduleStatus,
    pub created_by: StaffId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Latest dose time that has a generated administration.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub materialized_until: Option<OffsetDateTime>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

impl MedicationSchedule {
    pub fn new(
        order: OrderId,
        admission: AdmissionId,
        regimen: Regimen,
        created_by: StaffId,
        at: OffsetDateTime,
    ) -> Result<Self> {
        regimen.validate()?;
        Ok(Self {
            id: ScheduleId::generate(),
            order,
            admission,
            regimen,
            status: ScheduleStatus::Active,
            created_by,
            created_at: at,
            materialized_until: None,
            cancellation_reason: None,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == ScheduleStatus::Active
    }

    /// Next dose that has not been generated yet.
    pub fn next_unmaterialized(&self) -> Option<OffsetDateTime> {
        self.regimen.next_after(self.materialized_until)
    }

    /// Advance the materialization cursor, returning the new dose times.
    pub fn materialize(&mut self, until: OffsetDateTime, cap: usize) -> Vec<OffsetDateTime> {
        if !self.is_active() {
            return Vec::new();
        }
        let doses = self.regimen.doses_between(self.materialized_until, until, cap);
        if let Some(last) = doses.last() {
            self.materialized_until = Some(*last);
        }
        doses
    }

    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<()> {
        if !self.is_active() {
            return Err(WardError::already_terminal(
                EntityKind::MedicationSchedule,
                &self.id,
                self.status,
            ));
        }
        self.status = ScheduleStatus::Cancelled;
        self.cancellation_reason = Some(reason.into());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdministrationStatus {
    Pending,
    Administered,
    Delayed,
    Withheld,
    Refused,
    Cancelled,
}

string_enum!(AdministrationStatus {
    Pending => "pending",
    Administered => "administered",
    Delayed => "delayed",
    Withheld => "withheld",
    Refused => "refused",
    Cancelled => "cancelled",
});

impl AdministrationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Why a dose was not given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipDisposition {
    Delayed,
    Withheld,
    Refused,
}

string_enum!(SkipDisposition {
    Delayed => "delayed",
    Withheld => "withheld",
    Refused => "refused",
});

impl From<SkipDisposition> for AdministrationStatus {
    fn from(value: SkipDisposition) -> Self {
        match value {
            SkipDisposition::Delayed => Self::Delayed,
            SkipDisposition::Withheld => Self::Withheld,
            SkipDisposition::Refused => Self::Refused,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdministrationDetails {
    pub actual_dosage: Option<f64>,
    pub route: Option<String>,
    pub site: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationAdministration {
    pub id: AdministrationId,
    pub schedule: ScheduleId,
    pub order: OrderId,
    pub admission: AdmissionId,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    pub status: AdministrationStatus,
    #[serde(default)]
    pub recorded_by: Option<StaffId>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub recorded_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub actual_dosage: Option<f64>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub skip_reason: Option<String>,
}

impl MedicationAdministration {
    pub fn pending(schedule: &MedicationSchedule, scheduled_at: OffsetDateTime) -> Self {
        Self {
            id: AdministrationId::generate(),
            schedule: schedule.id.clone(),
            order: schedule.order.clone(),
            admission: schedule.admission.clone(),
            scheduled_at,
            status: AdministrationStatus::Pending,
            recorded_by: None,
            recorded_at: None,
            actual_dosage: None,
            route: None,
            site: None,
            notes: None,
            skip_reason: None,
        }
    }

    fn ensure_pending(&self) -> Result<()> {
        if !self.status.is_pending() {
            return Err(WardError::already_recorded(&self.id, self.status));
        }
        Ok(())
    }

    /// Record the dose as given.
    ///
    /// Early administration is refused outside the grace window; late doses
    /// are accepted and keep their original `scheduled_at`.
    pub fn administer(
        &mut self,
        by: &StaffId,
        details: AdministrationDetails,
        now: OffsetDateTime,
        grace: Duration,
    ) -> Result<()> {
        self.ensure_pending()?;
        let earliest = self.scheduled_at - grace;
        if now < earliest {
            return Err(WardError::out_of_window(&self.id, self.scheduled_at, earliest));
        }
        if let Some(dosage) = details.actual_dosage
            && (!dosage.is_finite() || dosage <= 0.0)
        {
            return Err(WardError::validation("actual dosage must be greater than zero"));
        }
        self.status = AdministrationStatus::Administered;
        self.recorded_by = Some(by.clone());
        self.recorded_at = Some(now);
        self.actual_dosage = details.actual_dosage;
        self.route = details.route;
        self.site = details.site;
        self.notes = details.notes;
        Ok(())
    }

    pub fn skip(
        &mut self,
        by: &StaffId,
        reason: impl Into<String>,
        disposition: SkipDisposition,
        now: OffsetDateTime,
    ) -> Result<()> {
        self.ensure_pending()?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(WardError::validation("a reason is required to skip a dose"));
        }
        self.status = disposition.into();
        self.recorded_by = Some(by.clone());
        self.recorded_at = Some(now);
        self.skip_reason = Some(reason);
        Ok(())
    }

    /// Withdraw a pending dose when its order or schedule goes away.
    pub fn cancel(&mut self, by: &StaffId, reason: &str, now: OffsetDateTime) -> Result<()> {
        self.ensure_pending()?;
        self.status = AdministrationStatus::Cancelled;
        self.recorded_by = Some(by.clone());
        self.recorded_at = Some(now);
        self.skip_reason = Some(reason.to_string());
        Ok(())
    }

    /// Advisory only; nothing transitions on overdue.
    pub fn is_overdue(&self, now: OffsetDateTime, grace: Duration) -> bool {
        self.status.is_pending() && now > self.scheduled_at + grace
    }
}
