pub mod clock;
pub mod error;
pub mod events;
pub mod id;
pub mod model;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock, now_utc};
pub use error::{ErrorCategory, Result, WardError};
pub use id::{
    AdministrationId, AdmissionId, BedId, EmergencyId, HandoverId, IdError, OrderId, PatientId,
    ScheduleId, StaffId, SupplyRequestId, WardId, generate_id, validate_id,
};
pub use model::{Actor, EntityKind, Role};
pub use events::{EventBroadcaster, WardEvent, WardEventType};
