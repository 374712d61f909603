//! Delegate contract and the single-listener slot

use crate::domain::events::{ActivityEvent, FailureEvent, LocationEvent};
use parking_lot::RwLock;
use std::sync::Arc;

/// Listener receiving normalized provider events.
///
/// Callbacks run synchronously on the strategy thread that produced the
/// signal, so implementations should hand work off rather than block.
pub trait ProviderDelegate: Send + Sync {
    fn on_location(&self, event: LocationEvent);

    fn on_stationary(&self, event: LocationEvent);

    fn on_activity(&self, event: ActivityEvent);

    fn on_error(&self, error: FailureEvent);
}

/// Holds at most one delegate. Setting a new one replaces the old.
#[derive(Default)]
pub struct DelegateSlot {
    current: RwLock<Option<Arc<dyn ProviderDelegate>>>,
}

impl DelegateSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a delegate, returning the one it replaced
    pub fn set(&self, delegate: Arc<dyn ProviderDelegate>) -> Option<Arc<dyn ProviderDelegate>> {
        self.current.write().replace(delegate)
    }

    pub fn clear(&self) -> Option<Arc<dyn ProviderDelegate>> {
        self.current.write().take()
    }

    /// Snapshot of the current delegate. Callers invoke it after the lock is
    /// released so a slow delegate never blocks `set`.
    pub fn get(&self) -> Option<Arc<dyn ProviderDelegate>> {
        self.current.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.current.read().is_some()
    }
}
