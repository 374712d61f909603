//! Tests for the provider core

use super::*;
use crate::domain::events::{ActivityEvent, FailureEvent, LocationEvent};
use crate::domain::types::{ActivityType, AddressRecord};
use crate::infra::error::ProviderError;
use crate::io::geocoder::GeocodeError;
use crate::io::receiver::{Intent, RegistrarError};
use crate::io::tone::{AudioStream, ToneError, ToneHandle};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct FakeTone {
    acquired: AtomicUsize,
    released: AtomicUsize,
    cues: Mutex<Vec<CueKind>>,
}

impl ToneGenerator for FakeTone {
    fn acquire(&self, _stream: AudioStream, _volume: u8) -> Result<ToneHandle, ToneError> {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        Ok(ToneHandle(1))
    }

    fn start_tone(&self, _h: ToneHandle, cue: CueKind, _ms: u32) -> Result<(), ToneError> {
        self.cues.lock().push(cue);
        Ok(())
    }

    fn release(&self, _h: ToneHandle) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }
}

struct FixedGeocoder;

impl Geocoder for FixedGeocoder {
    fn from_location(&self, _: f64, _: f64, _: usize) -> Result<Vec<AddressRecord>, GeocodeError> {
        Ok(vec![AddressRecord {
            locality: Some("Springfield".into()),
            admin_area: Some("IL".into()),
            postal_code: Some("62704".into()),
            country_code: Some("US".into()),
        }])
    }
}

/// Two candidates: the postal code only appears on the second
struct SplitCandidateGeocoder;

impl Geocoder for SplitCandidateGeocoder {
    fn from_location(&self, _: f64, _: f64, _: usize) -> Result<Vec<AddressRecord>, GeocodeError> {
        Ok(vec![
            AddressRecord {
                locality: Some("Springfield".into()),
                admin_area: Some("IL".into()),
                postal_code: None,
                country_code: Some("US".into()),
            },
            AddressRecord {
                locality: Some(String::new()),
                admin_area: None,
                postal_code: Some("62704".into()),
                country_code: None,
            },
        ])
    }
}

struct FakeSettings(Mutex<Option<String>>);

impl SettingsReader for FakeSettings {
    fn get_string(&self, _key: &str) -> Option<String> {
        self.0.lock().clone()
    }
}

#[derive(Default)]
struct FakeRegistrar {
    registered: AtomicUsize,
    unregistered: AtomicUsize,
}

impl ReceiverRegistrar for FakeRegistrar {
    fn register(
        &self,
        _receiver: Arc<dyn BroadcastReceiver>,
        _filter: &IntentFilter,
    ) -> Result<Option<Intent>, RegistrarError> {
        self.registered.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    fn unregister(&self, _receiver: &Arc<dyn BroadcastReceiver>) -> Result<(), RegistrarError> {
        self.unregistered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[derive(Default)]
struct FakeNotifier(Mutex<Vec<(String, NoticeDuration)>>);

impl DebugNotifier for FakeNotifier {
    fn show(&self, text: &str, duration: NoticeDuration) {
        self.0.lock().push((text.to_string(), duration));
    }
}

#[derive(Default)]
struct Recorder {
    locations: Mutex<Vec<LocationEvent>>,
    stationaries: Mutex<Vec<LocationEvent>>,
    activities: Mutex<Vec<ActivityEvent>>,
    errors: Mutex<Vec<FailureEvent>>,
}

impl ProviderDelegate for Recorder {
    fn on_location(&self, event: LocationEvent) {
        self.locations.lock().push(event);
    }
    fn on_stationary(&self, event: LocationEvent) {
        self.stationaries.lock().push(event);
    }
    fn on_activity(&self, event: ActivityEvent) {
        self.activities.lock().push(event);
    }
    fn on_error(&self, error: FailureEvent) {
        self.errors.lock().push(error);
    }
}

struct NoopReceiver;

impl BroadcastReceiver for NoopReceiver {
    fn on_receive(&self, _intent: &Intent) {}
}

/// Test harness keeping handles to every fake capability
struct TestCore {
    core: ProviderCore,
    tone: Arc<FakeTone>,
    settings: Arc<FakeSettings>,
    registrar: Arc<FakeRegistrar>,
    notifier: Arc<FakeNotifier>,
}

impl std::ops::Deref for TestCore {
    type Target = ProviderCore;
    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

fn create_test_core(config: Config) -> TestCore {
    create_test_core_with_geocoder(config, Arc::new(FixedGeocoder))
}

fn create_test_core_with_geocoder(config: Config, geocoder: Arc<dyn Geocoder>) -> TestCore {
    let tone = Arc::new(FakeTone::default());
    let settings = Arc::new(FakeSettings(Mutex::new(None)));
    let registrar = Arc::new(FakeRegistrar::default());
    let notifier = Arc::new(FakeNotifier::default());
    let platform = Platform {
        geocoder,
        tone: tone.clone(),
        settings: settings.clone(),
        registrar: registrar.clone(),
        notifier: notifier.clone(),
    };
    let core = ProviderCore::new(ProviderId::DISTANCE_FILTER, platform, config, Arc::new(Metrics::new()));
    TestCore { core, tone, settings, registrar, notifier }
}

fn debug_config() -> Config {
    Config::default().with_debugging(true).with_geocoder_timeout_ms(0)
}

#[test]
fn test_springfield_location_scenario() {
    let core = create_test_core(debug_config());
    let recorder = Arc::new(Recorder::default());
    core.create().unwrap();
    core.set_delegate(recorder.clone());

    let delivery = core.handle_location(Location::new("gps", 39.78, -89.65));
    assert_eq!(delivery, Delivery::Delivered);

    let events = recorder.locations.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].address, "Springfield, IL, 62704, US");
    assert_eq!(events[0].provider_id, ProviderId::DISTANCE_FILTER);
    assert!(!events[0].mock_locations_enabled);
    assert_eq!(*core.tone.cues.lock(), vec![CueKind::Beep]);
}

#[test]
fn test_stationary_scenario_merges_candidates() {
    let core = create_test_core_with_geocoder(debug_config(), Arc::new(SplitCandidateGeocoder));
    let recorder = Arc::new(Recorder::default());
    core.create().unwrap();
    core.set_delegate(recorder.clone());

    core.handle_stationary(Location::new("gps", 39.78, -89.65), Some(50.0));

    let events = recorder.stationaries.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].address, "Springfield, IL, 62704, US");
    assert_eq!(events[0].radius, Some(50.0));
    assert_eq!(*core.tone.cues.lock(), vec![CueKind::LongBeep]);
}

#[test]
fn test_stationary_and_activity_routing() {
    let core = create_test_core(debug_config());
    let recorder = Arc::new(Recorder::default());
    core.create().unwrap();
    core.set_delegate(recorder.clone());

    core.handle_stationary(Location::new("gps", 1.0, 2.0), Some(50.0));
    core.handle_activity(DetectedActivity::new(ActivityType::Walking, 60));

    assert_eq!(recorder.stationaries.lock()[0].radius, Some(50.0));
    assert_eq!(recorder.activities.lock()[0].activity.kind, ActivityType::Walking);
    assert!(recorder.locations.lock().is_empty());
    assert_eq!(*core.tone.cues.lock(), vec![CueKind::LongBeep]);
}

#[test]
fn test_security_failure_reaches_on_error() {
    let core = create_test_core(Config::default());
    let recorder = Arc::new(Recorder::default());
    core.set_delegate(recorder.clone());

    core.handle_security_failure(PermissionDenial::new("permission revoked"));
    assert_eq!(recorder.errors.lock()[0].message, "permission revoked");
}

#[test]
fn test_events_without_delegate_are_counted() {
    let core = create_test_core(debug_config());
    core.create().unwrap();

    assert_eq!(core.handle_location(Location::new("gps", 1.0, 2.0)), Delivery::NoDelegate);
    assert_eq!(core.handle_security_failure(PermissionDenial::new("x")), Delivery::NoDelegate);
    assert_eq!(core.metrics().events_dropped_no_delegate(), 1);
    assert_eq!(core.metrics().failures_dropped_no_delegate(), 1);
}

#[test]
fn test_clear_delegate_stops_delivery() {
    let core = create_test_core(Config::default().with_geocoder_timeout_ms(0));
    let recorder = Arc::new(Recorder::default());
    core.set_delegate(recorder.clone());
    assert!(core.has_delegate());

    core.clear_delegate();
    assert!(!core.has_delegate());
    assert_eq!(core.handle_location(Location::new("gps", 1.0, 2.0)), Delivery::NoDelegate);
    assert!(recorder.locations.lock().is_empty());
}

#[test]
fn test_mock_flag_is_read_per_event() {
    let core = create_test_core(Config::default().with_geocoder_timeout_ms(0));
    let recorder = Arc::new(Recorder::default());
    core.set_delegate(recorder.clone());

    core.handle_location(Location::new("gps", 1.0, 2.0));
    *core.settings.0.lock() = Some("1".to_string());
    core.handle_location(Location::new("gps", 1.0, 2.0));

    let events = recorder.locations.lock();
    assert!(!events[0].mock_locations_enabled);
    assert!(events[1].mock_locations_enabled);
    assert!(core.has_mock_locations_enabled());
}

#[test]
fn test_configure_toggles_cues() {
    let core = create_test_core(Config::default().with_geocoder_timeout_ms(0));
    core.create().unwrap();

    core.handle_location(Location::new("gps", 1.0, 2.0));
    assert!(core.tone.cues.lock().is_empty());

    core.configure(debug_config());
    assert!(core.config().debugging());
    core.handle_location(Location::new("gps", 1.0, 2.0));
    assert_eq!(*core.tone.cues.lock(), vec![CueKind::Beep]);
}

#[test]
fn test_play_debug_tone_outside_lifetime() {
    let core = create_test_core(debug_config());
    assert!(core.play_debug_tone(CueKind::DoodlyDoo).unwrap_err().is_misuse());

    core.create().unwrap();
    assert_eq!(core.play_debug_tone(CueKind::DoodlyDoo).unwrap(), CueOutcome::Emitted);

    core.destroy().unwrap();
    assert!(core.play_debug_tone(CueKind::Dialtone).unwrap_err().is_misuse());
    assert_eq!(*core.tone.cues.lock(), vec![CueKind::DoodlyDoo]);
}

#[test]
fn test_debug_notice_gated_by_debugging() {
    let core = create_test_core(Config::default());
    assert!(!core.show_debug_notice("hidden"));

    core.configure(Config::default().with_debugging(true));
    assert!(core.show_debug_notice("Tracking started"));
    assert_eq!(
        *core.notifier.0.lock(),
        vec![("Tracking started".to_string(), NoticeDuration::Long)]
    );
}

#[test]
fn test_destroy_releases_tone_and_receivers() {
    let core = create_test_core(Config::default());
    core.create().unwrap();
    core.register_receiver(Arc::new(NoopReceiver), &IntentFilter::new("alarm")).unwrap();
    core.register_receiver(Arc::new(NoopReceiver), &IntentFilter::new("power")).unwrap();

    core.destroy().unwrap();
    assert_eq!(core.state(), LifecycleState::Destroyed);
    assert_eq!(core.tone.released.load(Ordering::Relaxed), 1);
    assert_eq!(core.registrar.unregistered.load(Ordering::Relaxed), 2);
    assert_eq!(core.metrics().receivers_released_on_destroy(), 2);
    assert!(matches!(core.destroy(), Err(ProviderError::ResourceMisuse { .. })));
}

#[test]
fn test_events_still_flow_after_destroy() {
    let core = create_test_core(debug_config());
    let recorder = Arc::new(Recorder::default());
    core.set_delegate(recorder.clone());
    core.create().unwrap();
    core.destroy().unwrap();

    assert_eq!(core.handle_location(Location::new("gps", 1.0, 2.0)), Delivery::Delivered);
    assert!(core.tone.cues.lock().is_empty());
    assert_eq!(core.metrics().cues_rejected(), 1);
}

#[test]
fn test_no_cue_rejections_when_debugging_off() {
    let core = create_test_core(Config::default().with_geocoder_timeout_ms(0));
    let recorder = Arc::new(Recorder::default());
    core.set_delegate(recorder.clone());

    assert_eq!(core.handle_location(Location::new("gps", 1.0, 2.0)), Delivery::Delivered);
    assert_eq!(core.play_debug_tone(CueKind::DoodlyDoo).unwrap(), CueOutcome::Suppressed);

    core.create().unwrap();
    core.destroy().unwrap();
    core.handle_location(Location::new("gps", 1.0, 2.0));
    core.handle_stationary(Location::new("gps", 1.0, 2.0), Some(50.0));
    assert_eq!(core.play_debug_tone(CueKind::Dialtone).unwrap(), CueOutcome::Suppressed);

    assert_eq!(core.metrics().cues_rejected(), 0);
    assert!(core.tone.cues.lock().is_empty());
    assert_eq!(recorder.locations.lock().len(), 2);
}

#[test]
fn test_delegate_and_config_swaps_during_dispatch() {
    const ROUNDS: usize = 200;
    let core = create_test_core(Config::default().with_geocoder_timeout_ms(0));
    let first = Arc::new(Recorder::default());
    let second = Arc::new(Recorder::default());
    core.create().unwrap();
    core.set_delegate(first.clone());

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..ROUNDS {
                let delivery = core.handle_location(Location::new("gps", 1.0, i as f64 / 1000.0));
                assert_eq!(delivery, Delivery::Delivered);
            }
        });
        s.spawn(|| {
            for i in 0..ROUNDS {
                let next: Arc<dyn ProviderDelegate> =
                    if i % 2 == 0 { second.clone() } else { first.clone() };
                core.set_delegate(next);
                core.configure(Config::default().with_debugging(i % 3 == 0).with_geocoder_timeout_ms(0));
            }
        });
    });

    assert_eq!(first.locations.lock().len() + second.locations.lock().len(), ROUNDS);
    assert_eq!(core.metrics().events_dropped_no_delegate(), 0);
    assert_eq!(core.metrics().cues_rejected(), 0);
    assert!(core.tone.cues.lock().len() <= ROUNDS);
}

#[test]
fn test_drop_without_destroy_releases() {
    let core = create_test_core(Config::default());
    core.create().unwrap();
    core.register_receiver(Arc::new(NoopReceiver), &IntentFilter::new("alarm")).unwrap();

    let TestCore { core, tone, registrar, .. } = core;
    drop(core);
    assert_eq!(tone.released.load(Ordering::Relaxed), 1);
    assert_eq!(registrar.unregistered.load(Ordering::Relaxed), 1);
}

struct ManualProvider {
    core: ProviderCore,
    started: std::sync::atomic::AtomicBool,
}

impl LocationProvider for ManualProvider {
    fn core(&self) -> &ProviderCore {
        &self.core
    }

    fn on_start(&self) {
        self.started.store(true, Ordering::Relaxed);
    }

    fn on_stop(&self) {
        self.started.store(false, Ordering::Relaxed);
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Relaxed)
    }
}

#[test]
fn test_provider_trait_defaults() {
    let TestCore { core, tone, .. } = create_test_core(Config::default());
    let provider = ManualProvider { core, started: Default::default() };

    provider.on_create().unwrap();
    provider.on_configure(debug_config());
    provider.on_command(1, 0);
    provider.on_start();
    assert!(provider.is_started());

    provider.on_destroy().unwrap();
    assert!(!provider.is_started());
    assert_eq!(provider.core().state(), LifecycleState::Destroyed);
    assert_eq!(tone.acquired.load(Ordering::Relaxed), 1);
    assert_eq!(tone.released.load(Ordering::Relaxed), 1);
}
