//! Broadcast receiver registration capability

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Broadcast message delivered to receivers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Intent {
    pub action: String,
    pub extras: HashMap<String, String>,
}

impl Intent {
    pub fn new(action: &str) -> Self {
        Self { action: action.to_string(), extras: HashMap::new() }
    }

    pub fn with_extra(mut self, key: &str, value: &str) -> Self {
        self.extras.insert(key.to_string(), value.to_string());
        self
    }
}

/// Set of actions a receiver subscribes to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentFilter {
    pub actions: Vec<String>,
}

impl IntentFilter {
    pub fn new(action: &str) -> Self {
        Self { actions: vec![action.to_string()] }
    }

    pub fn with_action(mut self, action: &str) -> Self {
        self.actions.push(action.to_string());
        self
    }

    pub fn matches(&self, intent: &Intent) -> bool {
        self.actions.iter().any(|a| a == &intent.action)
    }
}

/// Strategy-side callback for broadcasts
pub trait BroadcastReceiver: Send + Sync {
    fn on_receive(&self, intent: &Intent);
}

#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("receiver registration rejected: {0}")]
    Rejected(String),

    #[error("receiver was not registered with the platform")]
    NotRegistered,
}

/// Platform receiver registry.
///
/// `register` may return the last sticky broadcast matching the filter.
pub trait ReceiverRegistrar: Send + Sync {
    fn register(
        &self,
        receiver: Arc<dyn BroadcastReceiver>,
        filter: &IntentFilter,
    ) -> Result<Option<Intent>, RegistrarError>;

    fn unregister(&self, receiver: &Arc<dyn BroadcastReceiver>) -> Result<(), RegistrarError>;
}
