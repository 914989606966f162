use serde::{Deserialize, Serialize};

use crate::id::StaffId;

/// Ward roles as supplied by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    StaffNurse,
    HeadNurse,
    Doctor,
    WardClerk,
    /// Automated actor used by the periodic sweep.
    System,
}

string_enum!(Role {
    StaffNurse => "staff_nurse",
    HeadNurse => "head_nurse",
    Doctor => "doctor",
    WardClerk => "ward_clerk",
    System => "system",
});

impl Role {
    pub const ALL: [Role; 5] = [
        Role::StaffNurse,
        Role::HeadNurse,
        Role::Doctor,
        Role::WardClerk,
        Role::System,
    ];

    /// Clinical authority, used to decide who may take over an escalated event.
    pub fn authority(&self) -> u8 {
        match self {
            Role::WardClerk => 0,
            Role::StaffNurse => 1,
            Role::HeadNurse => 2,
            Role::Doctor => 3,
            Role::System => 0,
        }
    }
}

/// The `(actorId, role)` pair attached to every mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: StaffId,
    pub role: Role,
}

impl Actor {
    pub const SYSTEM_ID: &'static str = "system";

    pub fn new(id: impl Into<StaffId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn system() -> Self {
        Self::new(Self::SYSTEM_ID, Role::System)
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_accepts_upper_case() {
        assert_eq!("STAFF_NURSE".parse::<Role>().unwrap(), Role::StaffNurse);
        assert_eq!("head_nurse".parse::<Role>().unwrap(), Role::HeadNurse);
        assert!("surgeon".parse::<Role>().is_err());
    }

    #[test]
    fn test_authority_ordering() {
        assert!(Role::Doctor.authority() > Role::HeadNurse.authority());
        assert!(Role::HeadNurse.authority() > Role::StaffNurse.authority());
    }

    #[test]
    fn test_system_actor() {
        let actor = Actor::system();
        assert!(actor.is_system());
        assert_eq!(actor.id.as_str(), "system");
    }
}
