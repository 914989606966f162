//! Policy evaluation.
//!
//! ```
//! use ward_core::{Actor, EntityKind, Role};
//! use ward_policy::{AccessPolicy, Action};
//!
//! let policy = AccessPolicy::default();
//! let nurse = Actor::new("rn-1", Role::StaffNurse);
//! assert!(policy.require(&nurse, EntityKind::Emergency, Action::RaiseEmergency).is_ok());
//! assert!(policy.require(&nurse, EntityKind::Emergency, Action::ResolveEmergency).is_err());
//! ```

use serde::Serialize;
use ward_core::{Actor, EntityKind, Result, Role, WardError};

use crate::action::Action;

/// Rows of `(action, roles allowed to perform it)`.
pub type PolicyTable = &'static [(Action, &'static [Role])];

const WARD_ADMIN: &[Role] = &[Role::HeadNurse, Role::WardClerk];
const BED_MANAGERS: &[Role] = &[Role::HeadNurse, Role::Doctor];
const DOCTOR: &[Role] = &[Role::Doctor];
const NURSES: &[Role] = &[Role::StaffNurse, Role::HeadNurse];
const WARD_STAFF: &[Role] = &[Role::StaffNurse, Role::HeadNurse, Role::Doctor];

pub static DEFAULT_POLICY: PolicyTable = &[
    (Action::CreateBed, WARD_ADMIN),
    (Action::SetBedStatus, WARD_ADMIN),
    (Action::Admit, BED_MANAGERS),
    (Action::Transfer, BED_MANAGERS),
    (Action::UpdateAdmissionStatus, BED_MANAGERS),
    (Action::Discharge, DOCTOR),
    (Action::RecordDeath, DOCTOR),
    (Action::CreateOrder, DOCTOR),
    (Action::HoldOrder, DOCTOR),
    (Action::ResumeOrder, DOCTOR),
    (Action::CompleteOrder, DOCTOR),
    (Action::CancelOrder, DOCTOR),
    (Action::ScheduleMedication, DOCTOR),
    (Action::CancelSchedule, DOCTOR),
    (Action::Administer, NURSES),
    (Action::Skip, NURSES),
    (Action::RaiseEmergency, &[Role::StaffNurse]),
    (Action::AcknowledgeEmergency, WARD_STAFF),
    (Action::RespondEmergency, WARD_STAFF),
    (
        Action::EscalateEmergency,
        &[Role::StaffNurse, Role::HeadNurse, Role::Doctor, Role::System],
    ),
    (Action::ResolveEmergency, DOCTOR),
    (Action::RequestSupply, NURSES),
    (Action::FulfillSupply, WARD_ADMIN),
    (Action::CancelSupply, NURSES),
    (Action::CreateHandover, NURSES),
    (Action::CorrectHandover, NURSES),
    (Action::AcknowledgeHandover, NURSES),
    (Action::ReviewHandover, &[Role::HeadNurse]),
];

/// Result of policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }

    #[must_use]
    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            Self::Deny(reason) => Some(reason),
            Self::Allow => None,
        }
    }
}

/// Why access was refused. Kept for logs; never shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenyReason {
    pub code: &'static str,
    pub message: String,
}

impl DenyReason {
    #[must_use]
    pub fn role_not_permitted(role: Role, action: Action) -> Self {
        Self {
            code: "role-not-permitted",
            message: format!("role {role} may not {action}"),
        }
    }

    #[must_use]
    pub fn entity_mismatch(action: Action, entity: EntityKind) -> Self {
        Self {
            code: "entity-mismatch",
            message: format!("action {action} does not apply to {entity}"),
        }
    }

    #[must_use]
    pub fn no_rule(action: Action) -> Self {
        Self {
            code: "no-rule",
            message: format!("no rule grants {action}"),
        }
    }
}

/// Table-driven role check.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    table: PolicyTable,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLICY)
    }
}

impl AccessPolicy {
    pub const fn new(table: PolicyTable) -> Self {
        Self { table }
    }

    /// Roles granted `action`, empty when the table has no row for it.
    pub fn allowed_roles(&self, action: Action) -> &'static [Role] {
        self.table
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, roles)| *roles)
            .unwrap_or(&[])
    }

    pub fn authorize(&self, role: Role, entity: EntityKind, action: Action) -> AccessDecision {
        if action.entity() != entity {
            return AccessDecision::Deny(DenyReason::entity_mismatch(action, entity));
        }
        let roles = self.allowed_roles(action);
        if roles.is_empty() {
            return AccessDecision::Deny(DenyReason::no_rule(action));
        }
        if roles.contains(&role) {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny(DenyReason::role_not_permitted(role, action))
        }
    }

    /// Like [`authorize`](Self::authorize), mapping a denial to
    /// [`WardError::Forbidden`].
    pub fn require(&self, actor: &Actor, entity: EntityKind, action: Action) -> Result<()> {
        match self.authorize(actor.role, entity, action) {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(reason) => {
                tracing::warn!(
                    actor = %actor.id,
                    role = %actor.role,
                    action = %action,
                    entity = %entity,
                    code = reason.code,
                    "access denied: {}",
                    reason.message
                );
                Err(WardError::Forbidden)
            }
        }
    }

    /// Taking over an escalated emergency requires at least the authority of
    /// the role it was escalated to.
    pub fn require_authority(&self, actor: &Actor, target: Role) -> Result<()> {
        if actor.role.authority() >= target.authority() {
            return Ok(());
        }
        tracing::warn!(
            actor = %actor.id,
            role = %actor.role,
            required = %target,
            "access denied: insufficient authority"
        );
        Err(WardError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(role: Role, action: Action) -> bool {
        AccessPolicy::default()
            .authorize(role, action.entity(), action)
            .is_allowed()
    }

    #[test]
    fn test_every_action_has_a_rule() {
        let policy = AccessPolicy::default();
        for action in Action::ALL {
            assert!(
                !policy.allowed_roles(action).is_empty(),
                "no rule for {action}"
            );
        }
    }

    #[test]
    fn test_only_staff_nurse_raises() {
        for role in Role::ALL {
            assert_eq!(
                allowed(role, Action::RaiseEmergency),
                role == Role::StaffNurse,
                "{role}"
            );
        }
    }

    #[test]
    fn test_resolution_requires_doctor() {
        assert!(allowed(Role::Doctor, Action::ResolveEmergency));
        assert!(!allowed(Role::HeadNurse, Action::ResolveEmergency));
        assert!(!allowed(Role::System, Action::ResolveEmergency));
    }

    #[test]
    fn test_system_may_only_escalate() {
        for action in Action::ALL {
            assert_eq!(
                allowed(Role::System, action),
                action == Action::EscalateEmergency,
                "{action}"
            );
        }
    }

    #[test]
    fn test_clinical_actions() {
        assert!(allowed(Role::StaffNurse, Action::Administer));
        assert!(!allowed(Role::Doctor, Action::Administer));
        assert!(!allowed(Role::WardClerk, Action::Skip));
        assert!(allowed(Role::Doctor, Action::CreateOrder));
        assert!(!allowed(Role::HeadNurse, Action::CancelOrder));
        assert!(allowed(Role::HeadNurse, Action::ReviewHandover));
        assert!(!allowed(Role::StaffNurse, Action::ReviewHandover));
        assert!(allowed(Role::WardClerk, Action::FulfillSupply));
    }

    #[test]
    fn test_entity_mismatch_is_denied() {
        let decision =
            AccessPolicy::default().authorize(Role::Doctor, EntityKind::Bed, Action::CreateOrder);
        assert_eq!(decision.deny_reason().map(|r| r.code), Some("entity-mismatch"));
    }

    #[test]
    fn test_require_hides_allowed_roles() {
        let clerk = Actor::new("clerk-1", Role::WardClerk);
        let err = AccessPolicy::default()
            .require(&clerk, EntityKind::Admission, Action::Discharge)
            .unwrap_err();
        assert!(err.is_forbidden());
        assert!(!err.to_string().contains("doctor"));
        assert!(!err.user_message().contains("doctor"));
    }

    #[test]
    fn test_custom_table() {
        static ONLY_ADMIT: PolicyTable = &[(Action::Admit, &[Role::WardClerk])];
        let policy = AccessPolicy::new(ONLY_ADMIT);
        assert!(policy.authorize(Role::WardClerk, EntityKind::Admission, Action::Admit).is_allowed());
        assert_eq!(
            policy
                .authorize(Role::Doctor, EntityKind::Admission, Action::Discharge)
                .deny_reason()
                .map(|r| r.code),
            Some("no-rule")
        );
    }

    #[test]
    fn test_require_authority() {
        let policy = AccessPolicy::default();
        let nurse = Actor::new("rn-1", Role::StaffNurse);
        let doctor = Actor::new("dr-1", Role::Doctor);
        assert!(policy.require_authority(&nurse, Role::HeadNurse).is_err());
        assert!(policy.require_authority(&doctor, Role::HeadNurse).is_ok());
        assert!(policy.require_authority(&nurse, Role::StaffNurse).is_ok());
    }
}
