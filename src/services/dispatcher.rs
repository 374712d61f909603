//! Normalizes raw strategy signals into delegate events
//!
//! Enrichment (debug cue, reverse geocoding, mock check) runs for every
//! signal whether or not a delegate is installed; only the final hand-off
//! depends on the delegate slot.

use crate::domain::events::{ActivityEvent, LocationEvent};
use crate::domain::types::{DetectedActivity, Location, ProviderId};
use crate::infra::config::ConfigHandle;
use crate::infra::metrics::Metrics;
use crate::io::tone::CueKind;
use crate::services::address::AddressResolver;
use crate::services::delegate::DelegateSlot;
use crate::services::mock_detector::MockDetector;
use crate::services::tone_feedback::ToneFeedback;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of handing an event to the delegate slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    NoDelegate,
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

pub struct EventDispatcher {
    provider_id: ProviderId,
    delegate: Arc<DelegateSlot>,
    config: Arc<ConfigHandle>,
    tone: Arc<ToneFeedback>,
    address: AddressResolver,
    mock: MockDetector,
    metrics: Arc<Metrics>,
}

impl EventDispatcher {
    pub fn new(
        provider_id: ProviderId,
        delegate: Arc<DelegateSlot>,
        config: Arc<ConfigHandle>,
        tone: Arc<ToneFeedback>,
        address: AddressResolver,
        mock: MockDetector,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { provider_id, delegate, config, tone, address, mock, metrics }
    }

    pub fn handle_location(&self, location: Location) -> Delivery {
        self.metrics.record_location();
        self.cue(CueKind::Beep);

        let event = self.enrich(location);
        let delivery = match self.delegate.get() {
            Some(delegate) => {
                delegate.on_location(event);
                Delivery::Delivered
            }
            None => {
                debug!(provider_id = %self.provider_id, "location_dropped_no_delegate");
                Delivery::NoDelegate
            }
        };

        self.metrics.record_delivery(delivery.is_delivered());
        delivery
    }

    pub fn handle_stationary(&self, location: Location, radius: Option<f32>) -> Delivery {
        self.metrics.record_stationary();
        self.cue(CueKind::LongBeep);

        let mut event = self.enrich(location);
        if let Some(radius) = radius {
            event = event.with_radius(radius);
        }

        let delivery = match self.delegate.get() {
            Some(delegate) => {
                delegate.on_stationary(event);
                Delivery::Delivered
            }
            None => {
                debug!(provider_id = %self.provider_id, "stationary_dropped_no_delegate");
                Delivery::NoDelegate
            }
        };

        self.metrics.record_delivery(delivery.is_delivered());
        delivery
    }

    pub fn handle_activity(&self, activity: DetectedActivity) -> Delivery {
        self.metrics.record_activity();

        let event = ActivityEvent::new(self.provider_id, activity);
        let delivery = match self.delegate.get() {
            Some(delegate) => {
                delegate.on_activity(event);
                Delivery::Delivered
            }
            None => {
                debug!(provider_id = %self.provider_id, "activity_dropped_no_delegate");
                Delivery::NoDelegate
            }
        };

        self.metrics.record_delivery(delivery.is_delivered());
        delivery
    }

    fn enrich(&self, location: Location) -> LocationEvent {
        let timeout = self.config.current().geocoder_timeout();
        let address = self.address.resolve(location.latitude, location.longitude, timeout);
        let mock_enabled = self.mock.is_enabled();

        LocationEvent::new(self.provider_id, location, address).with_mock_locations_enabled(mock_enabled)
    }

    /// Fire-and-forget cue. Errors never reach the event path.
    fn cue(&self, cue: CueKind) {
        let config = self.config.current();
        if let Err(e) = self.tone.play(cue, &config) {
            warn!(provider_id = %self.provider_id, cue = %cue.as_str(), error = %e, "debug_cue_rejected");
        }
    }
}
