//! Ward operations engine.
//!
//! Each workflow service checks the access policy, loads the current
//! versioned record, applies the pure state machine from `ward_core::model`
//! and writes back with an optimistic version check. Domain events go out on
//! the [`EventBroadcaster`](ward_core::EventBroadcaster) only after the write
//! has committed.
//!
//! ```no_run
//! use ward_core::{Actor, Role};
//! use ward_core::model::BedLocation;
//! use ward_engine::{EngineConfig, WardEngine};
//!
//! # async fn demo() -> ward_core::Result<()> {
//! let engine = WardEngine::new(ward_db_memory::create_store(), EngineConfig::default());
//! let clerk = Actor::new("clerk-1", Role::WardClerk);
//! let bed = engine.beds().create(&clerk, BedLocation::new("ward-a", "101", "A")).await?;
//! assert!(!bed.is_occupied());
//! # Ok(())
//! # }
//! ```

pub mod admissions;
pub mod beds;
pub mod config;
pub mod context;
pub mod emergencies;
pub mod engine;
pub mod handovers;
pub mod orders;
pub mod supplies;
pub mod sweep;

pub use admissions::{AdmissionFilter, AdmissionLifecycle, AdmitPatient};
pub use beds::{BedFilter, BedRegistry, OccupancySummary, OccupancyViolation};
pub use config::{EngineConfig, EscalationConfig};
pub use context::EngineContext;
pub use emergencies::{EmergencyEngine, RaiseEmergency};
pub use engine::{SharedWardEngine, WardEngine};
pub use handovers::{CreateHandover, HandoverLedger};
pub use orders::{CreateOrder, DueDose, OrderPipeline, ScheduledMedication};
pub use supplies::{RequestSupply, SupplyWorkflow};
pub use sweep::{Sweep, SweepReport};
