use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Result, WardError};
use crate::id::{AdmissionId, StaffId, SupplyRequestId, WardId};
use crate::model::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyUrgency {
    Scheduled,
    Routine,
    Urgent,
    Stat,
}

string_enum!(SupplyUrgency {
    Scheduled => "scheduled",
    Routine => "routine",
    Urgent => "urgent",
    Stat => "stat",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyStatus {
    Pending,
    Fulfilled,
    Cancelled,
}

string_enum!(SupplyStatus {
    Pending => "pending",
    Fulfilled => "fulfilled",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRequest {
    pub id: SupplyRequestId,
    pub ward: WardId,
    #[serde(default)]
    pub admission: Option<AdmissionId>,
    pub requester: StaffId,
    pub item: String,
    pub quantity: u32,
    pub urgency: SupplyUrgency,
    pub status: SupplyStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub requested_at: OffsetDateTime,
    #[serde(default)]
    pub closed_by: Option<StaffId>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub closed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

impl SupplyRequest {
    pub fn new(
        ward: WardId,
        admission: Option<AdmissionId>,
        requester: StaffId,
        item: impl Into<String>,
        quantity: u32,
        urgency: SupplyUrgency,
        at: OffsetDateTime,
    ) -> Result<Self> {
        let item = item.into();
        if item.trim().is_empty() {
            return Err(WardError::validation("supply item must not be empty"));
        }
        if quantity == 0 {
            return Err(WardError::validation("quantity must be greater than zero"));
        }
        Ok(Self {
            id: SupplyRequestId::generate(),
            ward,
            admission,
            requester,
            item,
            quantity,
            urgency,
            status: SupplyStatus::Pending,
            requested_at: at,
            closed_by: None,
            closed_at: None,
            cancellation_reason: None,
        })
    }

    fn close(&mut self, target: SupplyStatus, by: &StaffId, at: OffsetDateTime) -> Result<()> {
        if self.status != SupplyStatus::Pending {
            return Err(WardError::already_terminal(
                EntityKind::SupplyRequest,
                &self.id,
                self.status,
            ));
        }
        self.status = target;
        self.closed_by = Some(by.clone());
        self.closed_at = Some(at);
        Ok(())
    }

    pub fn fulfill(&mut self, by: &StaffId, at: OffsetDateTime) -> Result<()> {
        self.close(SupplyStatus::Fulfilled, by, at)
    }

    pub fn cancel(&mut self, by: &StaffId, reason: Option<String>, at: OffsetDateTime) -> Result<()> {
        self.close(SupplyStatus::Cancelled, by, at)?;
        self.cancellation_reason = reason;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn request() -> SupplyRequest {
        SupplyRequest::new(
            WardId::new("ward-a"),
            None,
            StaffId::new("rn-1"),
            "saline 500ml",
            4,
            SupplyUrgency::Urgent,
            datetime!(2024-03-01 08:00:00 UTC),
        )
        .unwrap()
    }

    #[test]
    fn test_quantity_and_item_validated() {
        let zero = SupplyRequest::new(
            WardId::new("ward-a"),
            None,
            StaffId::new("rn-1"),
            "gauze",
            0,
            SupplyUrgency::Routine,
            datetime!(2024-03-01 08:00:00 UTC),
        );
        assert_eq!(zero.unwrap_err().kind(), "validation");
    }

    #[test]
    fn test_fulfill_then_cancel_is_terminal() {
        let mut req = request();
        let clerk = StaffId::new("clerk-1");
        req.fulfill(&clerk, datetime!(2024-03-01 09:00:00 UTC)).unwrap();
        assert_eq!(req.status, SupplyStatus::Fulfilled);
        assert_eq!(req.closed_by.as_ref(), Some(&clerk));

        let err = req
            .cancel(&clerk, None, datetime!(2024-03-01 09:10:00 UTC))
            .unwrap_err();
        assert_eq!(err.kind(), "already_terminal");
        assert_eq!(req.status, SupplyStatus::Fulfilled);
    }

    #[test]
    fn test_cancel_keeps_reason() {
        let mut req = request();
        req.cancel(&StaffId::new("rn-1"), Some("found in stock".into()), datetime!(2024-03-01 08:30:00 UTC))
            .unwrap();
        assert_eq!(req.cancellation_reason.as_deref(), Some("found in stock"));
    }

    #[test]
    fn test_urgency_ordering() {
        assert!(SupplyUrgency::Stat > SupplyUrgency::Urgent);
        assert!(SupplyUrgency::Routine > SupplyUrgency::Scheduled);
    }
}
