//! Services - the provider pipeline
//!
//! - `provider` - Provider core and the strategy contract
//! - `lifecycle` - Create/destroy state machine and scoped resources
//! - `dispatcher` - Signal normalization and delegate hand-off
//! - `address` - Best-effort reverse geocoding
//! - `tone_feedback` - Debug audio cues
//! - `mock_detector` - Mock-location setting check
//! - `security` - Permission failure forwarding
//! - `delegate` - Delegate contract and slot
//! - `replay` - Strategy that replays recorded signals

pub mod address;
pub mod delegate;
pub mod dispatcher;
pub mod lifecycle;
pub mod mock_detector;
pub mod provider;
pub mod replay;
pub mod security;
pub mod tone_feedback;

// Re-export commonly used types
pub use delegate::ProviderDelegate;
pub use dispatcher::Delivery;
pub use lifecycle::LifecycleState;
pub use provider::{LocationProvider, Platform, ProviderCore};
pub use replay::{RawSignal, RecordedActivity, ReplayProvider};
