// Identifier handling for ward entities.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_ID_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("ID must not be empty")]
    Empty,
    #[error("ID exceeds 64 characters")]
    TooLong,
    #[error("ID contains invalid character '{0}'")]
    InvalidCharacter(char),
}

pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Accepts `[A-Za-z0-9\-._]{1,64}`.
pub fn validate_id(id: &str) -> Result<(), IdError> {
    if id.is_empty() {
        return Err(IdError::Empty);
    }
    if id.len() > MAX_ID_LEN {
        return Err(IdError::TooLong);
    }
    match id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_')))
    {
        Some(c) => Err(IdError::InvalidCharacter(c)),
        None => Ok(()),
    }
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier without validation.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(generate_id())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                validate_id(s)?;
                Ok(Self(s.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Physical bed identifier.
    BedId
);
define_id!(
    /// A single inpatient stay.
    AdmissionId
);
define_id!(PatientId);
define_id!(
    /// Any member of staff, including the system actor.
    StaffId
);
define_id!(WardId);
define_id!(OrderId);
define_id!(ScheduleId);
define_id!(AdministrationId);
define_id!(EmergencyId);
define_id!(SupplyRequestId);
define_id!(HandoverId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_valid_and_unique() {
        let a = BedId::generate();
        let b = BedId::generate();
        assert_ne!(a, b);
        assert!(validate_id(a.as_str()).is_ok());
    }

    #[test]
    fn test_validate_id_rejects_bad_input() {
        assert_eq!(validate_id(""), Err(IdError::Empty));
        assert_eq!(validate_id(&"x".repeat(65)), Err(IdError::TooLong));
        assert_eq!(validate_id("bed 1"), Err(IdError::InvalidCharacter(' ')));
        assert!(validate_id("ward-3.bed_12").is_ok());
    }

    #[test]
    fn test_id_parse_and_display() {
        let id: AdmissionId = "adm-42".parse().unwrap();
        assert_eq!(id.to_string(), "adm-42");
        assert!("adm/42".parse::<AdmissionId>().is_err());
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = PatientId::new("p-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"p-1\"");
        let back: PatientId = serde_json::from_str("\"p-1\"").unwrap();
        assert_eq!(back, id);
    }
}
