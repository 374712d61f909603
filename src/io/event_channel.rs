//! Typed channel delegate for provider events
//!
//! Bridges the synchronous delegate callbacks onto a bounded tokio mpsc
//! channel. Sending never blocks the strategy thread: if the channel is full
//! or closed the event is dropped and counted.

use crate::domain::events::{ActivityEvent, FailureEvent, LocationEvent};
use crate::infra::metrics::Metrics;
use crate::services::delegate::ProviderDelegate;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Event as seen by channel consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProviderEvent {
    Location(LocationEvent),
    Stationary(LocationEvent),
    Activity(ActivityEvent),
    Error(FailureEvent),
}

impl ProviderEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderEvent::Location(_) => "location",
            ProviderEvent::Stationary(_) => "stationary",
            ProviderEvent::Activity(_) => "activity",
            ProviderEvent::Error(_) => "error",
        }
    }
}

/// Sender handle for provider events
///
/// Clone this to share across providers.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<ProviderEvent>,
    metrics: Arc<Metrics>,
}

impl EventSender {
    pub fn new(tx: mpsc::Sender<ProviderEvent>, metrics: Arc<Metrics>) -> Self {
        Self { tx, metrics }
    }

    fn send(&self, event: ProviderEvent) {
        // try_send: drop rather than block the strategy thread
        if let Err(e) = self.tx.try_send(event) {
            let closed = matches!(e, mpsc::error::TrySendError::Closed(_));
            self.metrics.record_channel_dropped();
            debug!(kind = %e.into_inner().kind(), closed = %closed, "event_channel_dropped");
        }
    }
}

impl ProviderDelegate for EventSender {
    fn on_location(&self, event: LocationEvent) {
        self.send(ProviderEvent::Location(event));
    }

    fn on_stationary(&self, event: LocationEvent) {
        self.send(ProviderEvent::Stationary(event));
    }

    fn on_activity(&self, event: ActivityEvent) {
        self.send(ProviderEvent::Activity(event));
    }

    fn on_error(&self, error: FailureEvent) {
        self.send(ProviderEvent::Error(error));
    }
}

/// Create a new event channel pair
///
/// Returns (sender, receiver). `capacity` bounds how many events can be
/// queued before new ones are dropped.
pub fn create_event_channel(
    capacity: usize,
    metrics: Arc<Metrics>,
) -> (EventSender, mpsc::Receiver<ProviderEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx, metrics), rx)
}
