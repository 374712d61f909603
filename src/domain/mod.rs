//! Domain models - signals and delegate events
//!
//! - `types` - raw platform inputs (fixes, activities, address candidates)
//! - `events` - enriched events handed to the delegate

pub mod events;
pub mod types;

// Re-export commonly used types at module level
pub use events::{ActivityEvent, ErrorKind, FailureEvent, LocationEvent};
pub use types::{ActivityType, AddressRecord, DetectedActivity, Location, PermissionDenial, ProviderId};
