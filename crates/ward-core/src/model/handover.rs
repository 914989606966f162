use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Result, WardError};
use crate::id::{AdmissionId, HandoverId, StaffId, WardId};
use crate::model::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandoverContent {
    pub key_points: String,
    #[serde(default)]
    pub clinical_update: String,
    #[serde(default)]
    pub pending_tasks: Vec<String>,
    #[serde(default)]
    pub risk_alerts: Vec<String>,
}

impl HandoverContent {
    pub fn validate(&self) -> Result<()> {
        if self.key_points.trim().is_empty() {
            return Err(WardError::validation("handover key points must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoverStatus {
    Pending,
    Acknowledged,
    Reviewed,
}

string_enum!(HandoverStatus {
    Pending => "pending",
    Acknowledged => "acknowledged",
    Reviewed => "reviewed",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverSignoff {
    pub by: StaffId,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverReview {
    pub by: StaffId,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Shift handover note. `content` is written once; fixes go into a new
/// record that names this one in `supersedes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverRecord {
    pub id: HandoverId,
    pub ward: WardId,
    #[serde(default)]
    pub admission: Option<AdmissionId>,
    pub author: StaffId,
    pub content: HandoverContent,
    pub status: HandoverStatus,
    #[serde(default)]
    pub supersedes: Option<HandoverId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub acknowledgement: Option<HandoverSignoff>,
    #[serde(default)]
    pub review: Option<HandoverReview>,
}

impl HandoverRecord {
    pub fn new(
        ward: WardId,
        admission: Option<AdmissionId>,
        author: StaffId,
        content: HandoverContent,
        at: OffsetDateTime,
    ) -> Result<Self> {
        content.validate()?;
        Ok(Self {
            id: HandoverId::generate(),
            ward,
            admission,
            author,
            content,
            status: HandoverStatus::Pending,
            supersedes: None,
            created_at: at,
            acknowledgement: None,
            review: None,
        })
    }

    /// New record replacing this one for the same ward and patient.
    pub fn correction(
        &self,
        author: StaffId,
        content: HandoverContent,
        at: OffsetDateTime,
    ) -> Result<Self> {
        let mut record = Self::new(self.ward.clone(), self.admission.clone(), author, content, at)?;
        record.supersedes = Some(self.id.clone());
        Ok(record)
    }

    pub fn acknowledge(&mut self, by: &StaffId, at: OffsetDateTime) -> Result<()> {
        if self.status != HandoverStatus::Pending {
            return Err(WardError::already_terminal(
                EntityKind::Handover,
                &self.id,
                self.status,
            ));
        }
        if *by == self.author {
            return Err(WardError::validation(
                "a handover must be acknowledged by the incoming nurse, not its author",
            ));
        }
        self.status = HandoverStatus::Acknowledged;
        self.acknowledgement = Some(HandoverSignoff { by: by.clone(), at });
        Ok(())
    }

    pub fn review(&mut self, by: &StaffId, notes: Option<String>, at: OffsetDateTime) -> Result<()> {
        match self.status {
            HandoverStatus::Acknowledged => {
                self.status = HandoverStatus::Reviewed;
                self.review = Some(HandoverReview {
                    by: by.clone(),
                    at,
                    notes,
                });
                Ok(())
            }
            HandoverStatus::Reviewed => Err(WardError::already_terminal(
                EntityKind::Handover,
                &self.id,
                self.status,
            )),
            HandoverStatus::Pending => Err(WardError::invalid_transition(
                EntityKind::Handover,
                &self.id,
                self.status,
                HandoverStatus::Reviewed,
            )),
        }
    }
}
