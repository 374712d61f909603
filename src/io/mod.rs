//! IO modules - platform capabilities
//!
//! Traits the core consumes from the host platform, plus in-process
//! implementations:
//! - `geocoder` - Reverse geocoding
//! - `tone` - Audio cue generator
//! - `settings` - Secure settings reader
//! - `receiver` - Broadcast receiver registration
//! - `notice` - On-screen debug notices
//! - `event_channel` - Delegate that forwards events onto a tokio channel
//! - `loopback` - In-process capabilities for replay and tests

pub mod event_channel;
pub mod geocoder;
pub mod loopback;
pub mod notice;
pub mod receiver;
pub mod settings;
pub mod tone;

// Re-export commonly used types
pub use event_channel::{create_event_channel, EventSender, ProviderEvent};
pub use geocoder::{GeocodeError, Geocoder};
pub use notice::{DebugNotifier, NoticeDuration};
pub use receiver::{BroadcastReceiver, Intent, IntentFilter, ReceiverRegistrar};
pub use settings::SettingsReader;
pub use tone::{AudioStream, CueKind, ToneGenerator};
