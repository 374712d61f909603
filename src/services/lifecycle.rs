//! Provider lifecycle and scoped platform resources
//!
//! State machine: Constructed -> Created -> Destroyed. `create` acquires the
//! tone resource; `destroy` releases it and unregisters every receiver still
//! held. Dropping an active lifecycle runs the same teardown, so resources
//! are released on error paths too.

use crate::infra::config::Config;
use crate::infra::error::{ProviderError, ProviderResult};
use crate::infra::metrics::Metrics;
use crate::io::receiver::{BroadcastReceiver, Intent, IntentFilter, ReceiverRegistrar};
use crate::services::tone_feedback::ToneFeedback;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    Created,
    Destroyed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Constructed => "constructed",
            LifecycleState::Created => "created",
            LifecycleState::Destroyed => "destroyed",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Newtype wrapper for receiver registration ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ReceiverId(pub u64);

impl std::fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub struct ReceiverRegistration {
    pub id: ReceiverId,
    /// Last sticky broadcast matching the filter, if the platform had one
    pub sticky: Option<Intent>,
}

pub struct ProviderLifecycle {
    state: Mutex<LifecycleState>,
    receivers: Mutex<BTreeMap<ReceiverId, Arc<dyn BroadcastReceiver>>>,
    next_receiver_id: AtomicU64,
    registrar: Arc<dyn ReceiverRegistrar>,
    tone: Arc<ToneFeedback>,
    metrics: Arc<Metrics>,
}

impl ProviderLifecycle {
    pub fn new(
        registrar: Arc<dyn ReceiverRegistrar>,
        tone: Arc<ToneFeedback>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            state: Mutex::new(LifecycleState::Constructed),
            receivers: Mutex::new(BTreeMap::new()),
            next_receiver_id: AtomicU64::new(1),
            registrar,
            tone,
            metrics,
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Created
    }

    /// Acquire the tone resource. If acquisition fails the lifecycle stays
    /// in `Constructed` and `create` may be retried.
    pub fn create(&self, config: &Config) -> ProviderResult<()> {
        let mut state = self.state.lock();
        if *state != LifecycleState::Constructed {
            return Err(ProviderError::misuse("create", *state));
        }

        self.tone.acquire(config.tone_stream(), config.tone_volume_percent())?;
        *state = LifecycleState::Created;
        info!("provider_lifecycle_created");
        Ok(())
    }

    /// Release every held resource. Valid from `Constructed` or `Created`.
    pub fn destroy(&self) -> ProviderResult<()> {
        let mut state = self.state.lock();
        if *state == LifecycleState::Destroyed {
            return Err(ProviderError::misuse("destroy", *state));
        }

        let previous = std::mem::replace(&mut *state, LifecycleState::Destroyed);
        self.teardown();
        info!(previous = %previous, "provider_lifecycle_destroyed");
        Ok(())
    }

    /// Register a broadcast receiver for the rest of the active lifetime
    pub fn register_receiver(
        &self,
        receiver: Arc<dyn BroadcastReceiver>,
        filter: &IntentFilter,
    ) -> ProviderResult<ReceiverRegistration> {
        // Held for the whole call so destroy cannot slip in between the
        // platform registration and the table insert
        let state = self.state.lock();
        if *state != LifecycleState::Created {
            return Err(ProviderError::misuse("register_receiver", *state));
        }

        let sticky = self.registrar.register(Arc::clone(&receiver), filter)?;
        let id = ReceiverId(self.next_receiver_id.fetch_add(1, Ordering::Relaxed));
        self.receivers.lock().insert(id, receiver);
        self.metrics.record_receiver_registered();

        debug!(receiver_id = %id, actions = ?filter.actions, sticky = %sticky.is_some(), "receiver_registered");
        Ok(ReceiverRegistration { id, sticky })
    }

    /// Unregister one receiver. The receiver is forgotten even if the
    /// platform reports an error.
    pub fn unregister_receiver(&self, id: ReceiverId) -> ProviderResult<()> {
        let receiver = self.receivers.lock().remove(&id).ok_or(ProviderError::UnknownReceiver(id))?;
        self.metrics.record_receiver_unregistered(false);
        self.registrar.unregister(&receiver)?;
        debug!(receiver_id = %id, "receiver_unregistered");
        Ok(())
    }

    pub fn registered_receivers(&self) -> usize {
        self.receivers.lock().len()
    }

    fn teardown(&self) {
        let leftover = std::mem::take(&mut *self.receivers.lock());
        if !leftover.is_empty() {
            warn!(count = %leftover.len(), "receivers_released_on_destroy");
        }
        for (id, receiver) in leftover {
            self.metrics.record_receiver_unregistered(true);
            if let Err(e) = self.registrar.unregister(&receiver) {
                warn!(receiver_id = %id, error = %e, "receiver_unregister_failed");
            }
        }

        self.tone.release();
    }
}

impl Drop for ProviderLifecycle {
    fn drop(&mut self) {
        let state = *self.state.get_mut();
        if state != LifecycleState::Destroyed {
            warn!(state = %state, "provider_dropped_without_destroy");
            *self.state.get_mut() = LifecycleState::Destroyed;
            self.teardown();
        }
    }
}
