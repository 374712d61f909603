//! Permission failures surfaced to the delegate

use crate::domain::events::FailureEvent;
use crate::domain::types::{PermissionDenial, ProviderId};
use crate::infra::metrics::Metrics;
use crate::services::delegate::DelegateSlot;
use crate::services::dispatcher::Delivery;
use std::sync::Arc;
use tracing::warn;

pub struct SecurityFailureHandler {
    provider_id: ProviderId,
    delegate: Arc<DelegateSlot>,
    metrics: Arc<Metrics>,
}

impl SecurityFailureHandler {
    pub fn new(provider_id: ProviderId, delegate: Arc<DelegateSlot>, metrics: Arc<Metrics>) -> Self {
        Self { provider_id, delegate, metrics }
    }

    /// Forward a permission denial as a `PermissionDenied` failure. With no
    /// delegate the failure is dropped, but never silently.
    pub fn handle(&self, denial: PermissionDenial) -> Delivery {
        self.metrics.record_failure();
        let event = FailureEvent::permission_denied(denial.message);

        match self.delegate.get() {
            Some(delegate) => {
                delegate.on_error(event);
                Delivery::Delivered
            }
            None => {
                warn!(
                    provider_id = %self.provider_id,
                    kind = %event.kind.as_str(),
                    message = %event.message,
                    "permission_denied_dropped"
                );
                self.metrics.record_failure_dropped();
                Delivery::NoDelegate
            }
        }
    }
}
