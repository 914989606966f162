//! # ward-storage
//!
//! Persistence contract for Ward Station.
//!
//! There is one repository trait per aggregate. Beds and admissions share
//! [`BedAdmissionStore`] because they must change together: every write to
//! either goes through [`BedAdmissionStore::commit_occupancy`], which applies
//! all version checks and the occupancy constraints as a single unit. The
//! other aggregates are versioned per record.
//!
//! Every stored record carries a `version` drawn from one store-wide
//! sequence, so the highest version a client has seen doubles as a
//! change-feed watermark (see [`ChangeFeed`]).
//!
//! This crate has no implementations; see `ward-db-memory`.

mod error;
mod traits;
mod types;

pub use error::{Constraint, ErrorCategory, StorageError};
pub use traits::{
    BedAdmissionStore, ChangeFeed, EmergencyStore, HandoverStore, OrderStore, SupplyStore,
    WardStore,
};
pub use types::{Change, ChangeSet, OccupancyCommit, OccupancyOutcome, Record, Stored, Write};

pub type StorageResult<T> = Result<T, StorageError>;

pub type DynWardStore = std::sync::Arc<dyn WardStore>;
