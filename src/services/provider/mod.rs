//! Shared core of every location-sensing strategy
//!
//! `ProviderCore` wires together:
//! - Lifecycle (tone acquisition, receiver bookkeeping, teardown)
//! - Event dispatch (cue, reverse geocoding, mock check, delegate hand-off)
//! - Security failure forwarding
//! - Debug notices
//!
//! Concrete strategies own a core and implement `LocationProvider`.

#[cfg(test)]
mod tests;

use crate::domain::types::{DetectedActivity, Location, PermissionDenial, ProviderId};
use crate::infra::config::{Config, ConfigHandle};
use crate::infra::error::ProviderResult;
use crate::infra::metrics::{CueOutcome, Metrics};
use crate::io::geocoder::Geocoder;
use crate::io::notice::{DebugNotifier, NoticeDuration};
use crate::io::receiver::{BroadcastReceiver, IntentFilter, ReceiverRegistrar};
use crate::io::settings::SettingsReader;
use crate::io::tone::{CueKind, ToneGenerator};
use crate::services::address::AddressResolver;
use crate::services::delegate::{DelegateSlot, ProviderDelegate};
use crate::services::dispatcher::{Delivery, EventDispatcher};
use crate::services::lifecycle::{LifecycleState, ProviderLifecycle, ReceiverId, ReceiverRegistration};
use crate::services::mock_detector::MockDetector;
use crate::services::security::SecurityFailureHandler;
use crate::services::tone_feedback::ToneFeedback;
use std::sync::Arc;
use tracing::{debug, info};

/// Platform capabilities a provider core consumes
#[derive(Clone)]
pub struct Platform {
    pub geocoder: Arc<dyn Geocoder>,
    pub tone: Arc<dyn ToneGenerator>,
    pub settings: Arc<dyn SettingsReader>,
    pub registrar: Arc<dyn ReceiverRegistrar>,
    pub notifier: Arc<dyn DebugNotifier>,
}

pub struct ProviderCore {
    id: ProviderId,
    config: Arc<ConfigHandle>,
    delegate: Arc<DelegateSlot>,
    tone: Arc<ToneFeedback>,
    lifecycle: ProviderLifecycle,
    dispatcher: EventDispatcher,
    security: SecurityFailureHandler,
    mock: MockDetector,
    notifier: Arc<dyn DebugNotifier>,
    metrics: Arc<Metrics>,
}

impl ProviderCore {
    pub fn new(id: ProviderId, platform: Platform, config: Config, metrics: Arc<Metrics>) -> Self {
        let config = Arc::new(ConfigHandle::new(config));
        let delegate = Arc::new(DelegateSlot::new());
        let tone = Arc::new(ToneFeedback::new(platform.tone, metrics.clone()));

        let lifecycle = ProviderLifecycle::new(platform.registrar, tone.clone(), metrics.clone());
        let dispatcher = EventDispatcher::new(
            id,
            delegate.clone(),
            config.clone(),
            tone.clone(),
            AddressResolver::new(platform.geocoder, metrics.clone()),
            MockDetector::new(platform.settings.clone()),
            metrics.clone(),
        );
        let security = SecurityFailureHandler::new(id, delegate.clone(), metrics.clone());

        debug!(provider_id = %id, "provider_core_constructed");
        Self {
            id,
            config,
            delegate,
            tone,
            lifecycle,
            dispatcher,
            security,
            mock: MockDetector::new(platform.settings),
            notifier: platform.notifier,
            metrics,
        }
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn create(&self) -> ProviderResult<()> {
        let config = self.config.current();
        self.lifecycle.create(&config)?;
        info!(provider_id = %self.id, debugging = %config.debugging(), "provider_created");
        Ok(())
    }

    pub fn destroy(&self) -> ProviderResult<()> {
        self.lifecycle.destroy()?;
        info!(provider_id = %self.id, "provider_destroyed");
        Ok(())
    }

    /// Replace the active configuration. In-flight dispatches finish with the
    /// snapshot they started with.
    pub fn configure(&self, config: Config) {
        info!(
            provider_id = %self.id,
            debugging = %config.debugging(),
            geocoder_timeout_ms = %config.geocoder_timeout().as_millis(),
            "provider_configured"
        );
        self.config.replace(config);
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.current()
    }

    pub fn set_delegate(&self, delegate: Arc<dyn ProviderDelegate>) {
        let replaced = self.delegate.set(delegate).is_some();
        debug!(provider_id = %self.id, replaced = %replaced, "delegate_set");
    }

    pub fn clear_delegate(&self) {
        if self.delegate.clear().is_some() {
            debug!(provider_id = %self.id, "delegate_cleared");
        }
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.is_set()
    }

    pub fn handle_location(&self, location: Location) -> Delivery {
        self.dispatcher.handle_location(location)
    }

    pub fn handle_stationary(&self, location: Location, radius: Option<f32>) -> Delivery {
        self.dispatcher.handle_stationary(location, radius)
    }

    pub fn handle_activity(&self, activity: DetectedActivity) -> Delivery {
        self.dispatcher.handle_activity(activity)
    }

    pub fn handle_security_failure(&self, denial: PermissionDenial) -> Delivery {
        self.security.handle(denial)
    }

    /// Play any platform cue, gated by the debugging flag like the
    /// dispatcher's own cues
    pub fn play_debug_tone(&self, cue: CueKind) -> ProviderResult<CueOutcome> {
        self.tone.play(cue, &self.config.current())
    }

    /// Show a long on-screen notice while debugging. Returns whether it was shown.
    pub fn show_debug_notice(&self, text: &str) -> bool {
        if !self.config.current().debugging() {
            return false;
        }
        self.notifier.show(text, NoticeDuration::Long);
        true
    }

    pub fn has_mock_locations_enabled(&self) -> bool {
        self.mock.is_enabled()
    }

    pub fn register_receiver(
        &self,
        receiver: Arc<dyn BroadcastReceiver>,
        filter: &IntentFilter,
    ) -> ProviderResult<ReceiverRegistration> {
        self.lifecycle.register_receiver(receiver, filter)
    }

    pub fn unregister_receiver(&self, id: ReceiverId) -> ProviderResult<()> {
        self.lifecycle.unregister_receiver(id)
    }
}

/// Contract for concrete sensing strategies.
///
/// Lifecycle hooks default to the core's behavior; strategies supply
/// start/stop and may override the rest.
pub trait LocationProvider: Send + Sync {
    fn core(&self) -> &ProviderCore;

    fn on_start(&self);

    fn on_stop(&self);

    fn is_started(&self) -> bool;

    fn on_create(&self) -> ProviderResult<()> {
        self.core().create()
    }

    /// Stop if running, then release every held resource
    fn on_destroy(&self) -> ProviderResult<()> {
        if self.is_started() {
            self.on_stop();
        }
        self.core().destroy()
    }

    fn on_configure(&self, config: Config) {
        self.core().configure(config);
    }

    /// Strategy-specific command hook
    fn on_command(&self, _command_id: i32, _arg: i32) {}

    fn set_delegate(&self, delegate: Arc<dyn ProviderDelegate>) {
        self.core().set_delegate(delegate);
    }
}
