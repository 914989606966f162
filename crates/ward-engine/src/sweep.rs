//! One pass of the periodic sweep: escalate emergencies past their response
//! budget and keep open-ended medication schedules materialized.

use serde::Serialize;
use time::OffsetDateTime;
use ward_core::{Actor, Result, WardError};

use crate::emergencies::EmergencyEngine;
use crate::orders::OrderPipeline;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub escalated: usize,
    /// Events another writer moved on before the sweep got to them.
    pub skipped: usize,
    pub failed: usize,
    pub administrations_created: usize,
}

#[derive(Debug, Clone)]
pub struct Sweep {
    emergencies: EmergencyEngine,
    orders: OrderPipeline,
}

impl Sweep {
    pub fn new(emergencies: EmergencyEngine, orders: OrderPipeline) -> Self {
        Self {
            emergencies,
            orders,
        }
    }

    /// Safe to repeat: escalated and resolved events are never picked up
    /// again, and races with staff actions count as skipped.
    pub async fn run_once(&self, now: OffsetDateTime) -> Result<SweepReport> {
        let system = Actor::system();
        let mut report = SweepReport::default();

        for event in self.emergencies.overdue(now).await? {
            let reason = format!(
                "{} {} emergency not handled within its response budget",
                event.severity, event.event_type
            );
            match self
                .emergencies
                .escalate_at(&system, &event.id, &reason, None, now)
                .await
            {
                Ok(_) => report.escalated += 1,
                Err(
                    WardError::ConcurrencyConflict { .. }
                    | WardError::InvalidTransition { .. }
                    | WardError::AlreadyTerminal { .. },
                ) => {
                    tracing::debug!(emergency_id = %event.id, "emergency changed before sweep escalation");
                    report.skipped += 1;
                }
                Err(err) => {
                    tracing::warn!(emergency_id = %event.id, error = %err, "sweep escalation failed");
                    report.failed += 1;
                }
            }
        }

        report.administrations_created = match self.orders.extend_open_schedules(now).await {
            Ok(created) => created,
            Err(err) => {
                tracing::warn!(error = %err, "schedule extension failed");
                report.failed += 1;
                0
            }
        };

        if report.escalated > 0 || report.failed > 0 || report.administrations_created > 0 {
            tracing::info!(
                escalated = report.escalated,
                skipped = report.skipped,
                failed = report.failed,
                administrations_created = report.administrations_created,
                "sweep completed"
            );
        }
        Ok(report)
    }
}
