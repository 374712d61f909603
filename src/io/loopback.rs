//! In-process platform capabilities
//!
//! Used by the replay binary and integration tests where no device platform
//! is available. Each capability logs what a real platform would do.

use crate::domain::types::AddressRecord;
use crate::io::geocoder::{GeocodeError, Geocoder};
use crate::io::notice::{DebugNotifier, NoticeDuration};
use crate::io::receiver::{BroadcastReceiver, Intent, IntentFilter, ReceiverRegistrar, RegistrarError};
use crate::io::settings::SettingsReader;
use crate::io::tone::{AudioStream, CueKind, ToneError, ToneGenerator, ToneHandle};
use anyhow::Context;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Degrees within which a fixture matches a query coordinate (~100 m)
const DEFAULT_MATCH_RADIUS_DEG: f64 = 0.001;

/// Address fixture pinned to a coordinate
#[derive(Debug, Clone, Deserialize)]
pub struct AddressFixture {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub record: AddressRecord,
}

/// Geocoder answering from a fixed table, nearest fixtures first
#[derive(Debug)]
pub struct StaticGeocoder {
    fixtures: Vec<AddressFixture>,
    match_radius_deg: f64,
}

impl Default for StaticGeocoder {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl StaticGeocoder {
    pub fn new(fixtures: Vec<AddressFixture>) -> Self {
        Self { fixtures, match_radius_deg: DEFAULT_MATCH_RADIUS_DEG }
    }

    /// Load fixtures from a JSON array file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading address fixtures {}", path.display()))?;
        let fixtures: Vec<AddressFixture> = serde_json::from_str(&content)
            .with_context(|| format!("parsing address fixtures {}", path.display()))?;
        info!(path = %path.display(), count = %fixtures.len(), "address_fixtures_loaded");
        Ok(Self::new(fixtures))
    }

    pub fn with_match_radius_deg(mut self, radius: f64) -> Self {
        self.match_radius_deg = radius;
        self
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}

impl Geocoder for StaticGeocoder {
    fn from_location(
        &self,
        latitude: f64,
        longitude: f64,
        max_results: usize,
    ) -> Result<Vec<AddressRecord>, GeocodeError> {
        let mut matches: Vec<(f64, &AddressFixture)> = self
            .fixtures
            .iter()
            .map(|f| ((f.latitude - latitude).hypot(f.longitude - longitude), f))
            .filter(|(distance, _)| *distance <= self.match_radius_deg)
            .collect();
        matches.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(matches.into_iter().take(max_results).map(|(_, f)| f.record.clone()).collect())
    }
}

/// Tone generator that logs cues instead of playing them
#[derive(Debug, Default)]
pub struct LogToneGenerator {
    next_handle: AtomicU64,
    cues_started: AtomicU64,
}

impl LogToneGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues_started(&self) -> u64 {
        self.cues_started.load(Ordering::Relaxed)
    }
}

impl ToneGenerator for LogToneGenerator {
    fn acquire(&self, stream: AudioStream, volume_percent: u8) -> Result<ToneHandle, ToneError> {
        let handle = ToneHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        debug!(handle = %handle, stream = %stream.as_str(), volume_percent = %volume_percent, "loopback_tone_acquired");
        Ok(handle)
    }

    fn start_tone(&self, handle: ToneHandle, cue: CueKind, duration_ms: u32) -> Result<(), ToneError> {
        self.cues_started.fetch_add(1, Ordering::Relaxed);
        info!(handle = %handle, cue = %cue.as_str(), duration_ms = %duration_ms, "tone");
        Ok(())
    }

    fn release(&self, handle: ToneHandle) {
        debug!(handle = %handle, "loopback_tone_released");
    }
}

/// Fixed key/value settings
#[derive(Debug, Default)]
pub struct StaticSettings {
    values: HashMap<String, String>,
}

impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl SettingsReader for StaticSettings {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

struct Registration {
    receiver: Arc<dyn BroadcastReceiver>,
    filter: IntentFilter,
}

fn same_receiver(a: &Arc<dyn BroadcastReceiver>, b: &Arc<dyn BroadcastReceiver>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// In-process broadcast bus with sticky intents
#[derive(Default)]
pub struct LocalRegistrar {
    registrations: Mutex<Vec<Registration>>,
    sticky: Mutex<HashMap<String, Intent>>,
}

impl LocalRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver to every matching receiver. Returns the number of receivers reached.
    pub fn broadcast(&self, intent: &Intent) -> usize {
        // Snapshot first so receivers may register or unregister from on_receive
        let targets: Vec<Arc<dyn BroadcastReceiver>> = self
            .registrations
            .lock()
            .iter()
            .filter(|r| r.filter.matches(intent))
            .map(|r| Arc::clone(&r.receiver))
            .collect();

        for receiver in &targets {
            receiver.on_receive(intent);
        }
        debug!(action = %intent.action, receivers = %targets.len(), "broadcast");
        targets.len()
    }

    /// Broadcast and remember the intent for later registrations
    pub fn broadcast_sticky(&self, intent: Intent) -> usize {
        self.sticky.lock().insert(intent.action.clone(), intent.clone());
        self.broadcast(&intent)
    }

    pub fn registered(&self) -> usize {
        self.registrations.lock().len()
    }
}

impl ReceiverRegistrar for LocalRegistrar {
    fn register(
        &self,
        receiver: Arc<dyn BroadcastReceiver>,
        filter: &IntentFilter,
    ) -> Result<Option<Intent>, RegistrarError> {
        if filter.actions.is_empty() {
            return Err(RegistrarError::Rejected("filter has no actions".to_string()));
        }

        let sticky = {
            let sticky = self.sticky.lock();
            filter.actions.iter().find_map(|a| sticky.get(a).cloned())
        };
        self.registrations.lock().push(Registration { receiver, filter: filter.clone() });
        Ok(sticky)
    }

    fn unregister(&self, receiver: &Arc<dyn BroadcastReceiver>) -> Result<(), RegistrarError> {
        let mut registrations = self.registrations.lock();
        let before = registrations.len();
        registrations.retain(|r| !same_receiver(&r.receiver, receiver));
        if registrations.len() == before {
            return Err(RegistrarError::NotRegistered);
        }
        Ok(())
    }
}

/// Notifier that writes notices to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

impl DebugNotifier for LogNotifier {
    fn show(&self, text: &str, duration: NoticeDuration) {
        info!(text = %text, long = %matches!(duration, NoticeDuration::Long), "debug_notice");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn fixture(latitude: f64, longitude: f64, locality: &str) -> AddressFixture {
        AddressFixture {
            latitude,
            longitude,
            record: AddressRecord { locality: Some(locality.to_string()), ..Default::default() },
        }
    }

    #[test]
    fn test_static_geocoder_nearest_first() {
        let geocoder = StaticGeocoder::new(vec![
            fixture(10.0005, 20.0, "far"),
            fixture(10.0001, 20.0, "near"),
            fixture(50.0, 50.0, "elsewhere"),
        ]);

        let found = geocoder.from_location(10.0, 20.0, 5).unwrap();
        let names: Vec<_> = found.iter().map(|r| r.locality.as_deref().unwrap()).collect();
        assert_eq!(names, vec!["near", "far"]);

        let one = geocoder.from_location(10.0, 20.0, 1).unwrap();
        assert_eq!(one.len(), 1);
        assert!(geocoder.from_location(0.0, 0.0, 1).unwrap().is_empty());
    }

    #[test]
    fn test_match_radius_widens_lookup() {
        let geocoder = StaticGeocoder::new(vec![fixture(10.01, 20.0, "town")]);
        assert!(geocoder.from_location(10.0, 20.0, 1).unwrap().is_empty());

        let wide = geocoder.with_match_radius_deg(0.05);
        assert_eq!(wide.from_location(10.0, 20.0, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_log_tone_counts_started_cues() {
        let tone = LogToneGenerator::new();
        let handle = tone.acquire(AudioStream::Notification, 100).unwrap();
        tone.start_tone(handle, CueKind::Beep, 200).unwrap();
        tone.start_tone(handle, CueKind::LongBeep, 1000).unwrap();
        tone.release(handle);
        assert_eq!(tone.cues_started(), 2);
    }

    #[test]
    fn test_fixtures_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("addresses.json");
        std::fs::write(
            &path,
            r#"[{"latitude": 39.78, "longitude": -89.65, "locality": "Springfield",
                 "admin_area": "IL", "postal_code": "62704", "country_code": "US"}]"#,
        )
        .unwrap();

        let geocoder = StaticGeocoder::from_json_file(&path).unwrap();
        assert_eq!(geocoder.len(), 1);
        let found = geocoder.from_location(39.78, -89.65, 1).unwrap();
        assert_eq!(found[0].postal_code.as_deref(), Some("62704"));
    }

    #[test]
    fn test_fixtures_missing_file() {
        assert!(StaticGeocoder::from_json_file("/nonexistent/addresses.json").is_err());
    }

    struct Counter(AtomicUsize);

    impl BroadcastReceiver for Counter {
        fn on_receive(&self, _intent: &Intent) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_registrar_broadcast_and_unregister() {
        let registrar = LocalRegistrar::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let receiver: Arc<dyn BroadcastReceiver> = counter.clone();

        registrar.register(receiver.clone(), &IntentFilter::new("tick")).unwrap();
        assert_eq!(registrar.broadcast(&Intent::new("tick")), 1);
        assert_eq!(registrar.broadcast(&Intent::new("other")), 0);
        assert_eq!(counter.0.load(Ordering::Relaxed), 1);

        registrar.unregister(&receiver).unwrap();
        assert!(matches!(registrar.unregister(&receiver), Err(RegistrarError::NotRegistered)));
        assert_eq!(registrar.broadcast(&Intent::new("tick")), 0);
    }

    #[test]
    fn test_registrar_returns_sticky() {
        let registrar = LocalRegistrar::new();
        registrar.broadcast_sticky(Intent::new("battery").with_extra("level", "80"));

        let receiver: Arc<dyn BroadcastReceiver> = Arc::new(Counter(AtomicUsize::new(0)));
        let sticky = registrar.register(receiver, &IntentFilter::new("battery")).unwrap();
        assert_eq!(sticky.unwrap().extras.get("level").map(String::as_str), Some("80"));
    }

    #[test]
    fn test_registrar_rejects_empty_filter() {
        let registrar = LocalRegistrar::new();
        let receiver: Arc<dyn BroadcastReceiver> = Arc::new(Counter(AtomicUsize::new(0)));
        assert!(registrar.register(receiver, &IntentFilter::default()).is_err());
    }

    #[test]
    fn test_static_settings() {
        let settings = StaticSettings::new().with("mock_location", "1");
        assert_eq!(settings.get_string("mock_location").as_deref(), Some("1"));
        assert_eq!(settings.get_string("other"), None);
    }
}
