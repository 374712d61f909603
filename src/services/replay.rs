//! Replay strategy
//!
//! Plays recorded raw signals through a provider core, as a live sensing
//! strategy would deliver them. Playback stops early when the provider is
//! stopped or a stop broadcast arrives.

use crate::domain::types::{epoch_ms, ActivityType, DetectedActivity, Location, PermissionDenial, ProviderId};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::receiver::{BroadcastReceiver, Intent, IntentFilter};
use crate::services::dispatcher::Delivery;
use crate::services::lifecycle::ReceiverId;
use crate::services::provider::{LocationProvider, Platform, ProviderCore};
use anyhow::Context;
use parking_lot::Mutex;
use serde::Deserialize;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Broadcast action that halts an in-progress replay
pub const ACTION_STOP_REPLAY: &str = "bgloc.replay.STOP";

/// One recorded platform signal
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawSignal {
    Location {
        location: Location,
    },
    Stationary {
        location: Location,
        #[serde(default)]
        radius: Option<f32>,
    },
    Activity {
        activity: RecordedActivity,
        confidence: u8,
    },
    PermissionDenied {
        message: String,
    },
}

impl RawSignal {
    pub fn kind(&self) -> &'static str {
        match self {
            RawSignal::Location { .. } => "location",
            RawSignal::Stationary { .. } => "stationary",
            RawSignal::Activity { .. } => "activity",
            RawSignal::PermissionDenied { .. } => "permission_denied",
        }
    }
}

/// Recorded classification, either by name or by raw platform code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecordedActivity {
    Name(ActivityType),
    Code(i32),
}

impl RecordedActivity {
    pub fn activity_type(self) -> ActivityType {
        match self {
            RecordedActivity::Name(kind) => kind,
            RecordedActivity::Code(code) => ActivityType::from_code(code),
        }
    }
}

/// Parse JSON lines. Blank lines and lines starting with `#` are skipped.
pub fn read_signals<R: BufRead>(reader: R) -> anyhow::Result<Vec<RawSignal>> {
    let mut signals = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading signal line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let signal: RawSignal =
            serde_json::from_str(trimmed).with_context(|| format!("parsing signal line {}", idx + 1))?;
        signals.push(signal);
    }
    Ok(signals)
}

pub fn load_signals<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<RawSignal>> {
    let path = path.as_ref();
    let file =
        std::fs::File::open(path).with_context(|| format!("opening signals {}", path.display()))?;
    let signals = read_signals(std::io::BufReader::new(file))?;
    info!(path = %path.display(), count = %signals.len(), "signals_loaded");
    Ok(signals)
}

struct StopReceiver {
    stop: Arc<AtomicBool>,
}

impl BroadcastReceiver for StopReceiver {
    fn on_receive(&self, intent: &Intent) {
        debug!(action = %intent.action, "replay_stop_requested");
        self.stop.store(true, Ordering::Release);
    }
}

pub struct ReplayProvider {
    core: ProviderCore,
    signals: Vec<RawSignal>,
    started: AtomicBool,
    stop: Arc<AtomicBool>,
    stop_receiver: Mutex<Option<ReceiverId>>,
    replayed: AtomicUsize,
}

impl ReplayProvider {
    pub fn new(platform: Platform, config: Config, metrics: Arc<Metrics>, signals: Vec<RawSignal>) -> Self {
        Self {
            core: ProviderCore::new(ProviderId::RAW, platform, config, metrics),
            signals,
            started: AtomicBool::new(false),
            stop: Arc::new(AtomicBool::new(false)),
            stop_receiver: Mutex::new(None),
            replayed: AtomicUsize::new(0),
        }
    }

    /// Signals handed to the core so far
    pub fn replayed(&self) -> usize {
        self.replayed.load(Ordering::Relaxed)
    }

    fn apply(&self, signal: &RawSignal) -> Delivery {
        match signal {
            RawSignal::Location { location } => self.core.handle_location(stamped(location)),
            RawSignal::Stationary { location, radius } => {
                self.core.handle_stationary(stamped(location), *radius)
            }
            RawSignal::Activity { activity, confidence } => {
                self.core.handle_activity(DetectedActivity::new(activity.activity_type(), *confidence))
            }
            RawSignal::PermissionDenied { message } => {
                self.core.handle_security_failure(PermissionDenial::new(message.as_str()))
            }
        }
    }

    fn listen_for_stop(&self) {
        let receiver = Arc::new(StopReceiver { stop: self.stop.clone() });
        match self.core.register_receiver(receiver, &IntentFilter::new(ACTION_STOP_REPLAY)) {
            Ok(registration) => {
                if registration.sticky.is_some() {
                    self.stop.store(true, Ordering::Release);
                }
                *self.stop_receiver.lock() = Some(registration.id);
            }
            Err(e) => warn!(error = %e, "replay_stop_receiver_unavailable"),
        }
    }
}

/// Recorded fixes without a timestamp are stamped at replay time
fn stamped(location: &Location) -> Location {
    if location.time == 0 {
        location.clone().with_time(epoch_ms())
    } else {
        location.clone()
    }
}

impl LocationProvider for ReplayProvider {
    fn core(&self) -> &ProviderCore {
        &self.core
    }

    fn on_start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop.store(false, Ordering::Release);
        self.listen_for_stop();
        self.core.show_debug_notice("Replay started");
        info!(provider_id = %self.core.id(), signals = %self.signals.len(), "replay_started");

        for signal in &self.signals {
            if self.stop.load(Ordering::Acquire) {
                info!(replayed = %self.replayed(), "replay_interrupted");
                break;
            }
            let delivery = self.apply(signal);
            self.replayed.fetch_add(1, Ordering::Relaxed);
            debug!(kind = %signal.kind(), delivery = ?delivery, "signal_replayed");
        }

        info!(replayed = %self.replayed(), "replay_finished");
    }

    fn on_stop(&self) {
        self.stop.store(true, Ordering::Release);
        if !self.started.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(id) = self.stop_receiver.lock().take() {
            if let Err(e) = self.core.unregister_receiver(id) {
                warn!(receiver_id = %id, error = %e, "replay_stop_receiver_release_failed");
            }
        }
        info!(provider_id = %self.core.id(), "replay_stopped");
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}
