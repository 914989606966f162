use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Result, WardError};
use crate::id::{AdmissionId, OrderId, StaffId};
use crate::model::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Medication,
    Procedure,
    Investigation,
    Diet,
    Activity,
    Observation,
}

string_enum!(OrderType {
    Medication => "medication",
    Procedure => "procedure",
    Investigation => "investigation",
    Diet => "diet",
    Activity => "activity",
    Observation => "observation",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPriority {
    Routine,
    Urgent,
    Stat,
}

string_enum!(OrderPriority {
    Routine => "routine",
    Urgent => "urgent",
    Stat => "stat",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Active,
    Completed,
    Cancelled,
    OnHold,
}

string_enum!(OrderStatus {
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
    OnHold => "on_hold",
});

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Active, OnHold) | (OnHold, Active) | (Active, Completed) | (Active | OnHold, Cancelled)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorOrder {
    pub id: OrderId,
    pub admission: AdmissionId,
    pub author: StaffId,
    pub order_type: OrderType,
    pub priority: OrderPriority,
    pub status: OrderStatus,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

impl DoctorOrder {
    pub fn new(
        admission: AdmissionId,
        author: StaffId,
        order_type: OrderType,
        priority: OrderPriority,
        description: impl Into<String>,
        at: OffsetDateTime,
    ) -> Result<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(WardError::validation("order description must not be empty"));
        }
        Ok(Self {
            id: OrderId::generate(),
            admission,
            author,
            order_type,
            priority,
            status: OrderStatus::Active,
            description,
            created_at: at,
            updated_at: at,
            cancellation_reason: None,
        })
    }

    pub fn is_medication(&self) -> bool {
        self.order_type == OrderType::Medication
    }

    pub fn transition(&mut self, target: OrderStatus, at: OffsetDateTime) -> Result<()> {
        if self.status.is_terminal() {
            return Err(WardError::already_terminal(
                EntityKind::Order,
                &self.id,
                self.status,
            ));
        }
        if !self.status.can_transition_to(target) {
            return Err(WardError::invalid_transition(
                EntityKind::Order,
                &self.id,
                self.status,
                target,
            ));
        }
        self.status = target;
        self.updated_at = at;
        Ok(())
    }

    pub fn cancel(&mut self, reason: impl Into<String>, at: OffsetDateTime) -> Result<()> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(WardError::validation("cancellation reason must not be empty"));
        }
        self.transition(OrderStatus::Cancelled, at)?;
        self.cancellation_reason = Some(reason);
        Ok(())
    }

    /// Medication may only be scheduled or given while the order is active.
    pub fn ensure_active(&self) -> Result<()> {
        if self.status != OrderStatus::Active {
            return Err(WardError::invalid_transition(
                EntityKind::Order,
                &self.id,
                self.status,
                "in use",
            ));
        }
        Ok(())
    }
}
