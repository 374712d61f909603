//! Debug audio cues
//!
//! Owns the platform tone handle for one provider lifetime: acquired once by
//! `create`, released once by `destroy`. Cues are fire-and-forget; callers
//! on the dispatch path log and discard any error.

use crate::infra::config::Config;
use crate::infra::error::{ProviderError, ProviderResult};
use crate::infra::metrics::{CueOutcome, Metrics};
use crate::io::tone::{AudioStream, CueKind, ToneGenerator, ToneHandle};
use crate::services::lifecycle::LifecycleState;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToneState {
    Idle,
    Acquired(ToneHandle),
    Released,
}

impl ToneState {
    fn lifecycle(&self) -> LifecycleState {
        match self {
            ToneState::Idle => LifecycleState::Constructed,
            ToneState::Acquired(_) => LifecycleState::Created,
            ToneState::Released => LifecycleState::Destroyed,
        }
    }
}

pub struct ToneFeedback {
    generator: Arc<dyn ToneGenerator>,
    state: Mutex<ToneState>,
    metrics: Arc<Metrics>,
}

impl ToneFeedback {
    pub fn new(generator: Arc<dyn ToneGenerator>, metrics: Arc<Metrics>) -> Self {
        Self { generator, state: Mutex::new(ToneState::Idle), metrics }
    }

    /// Acquire the tone resource. Only valid once, before any release.
    pub fn acquire(&self, stream: AudioStream, volume_percent: u8) -> ProviderResult<ToneHandle> {
        let mut state = self.state.lock();
        if *state != ToneState::Idle {
            return Err(ProviderError::misuse("acquire_tone", state.lifecycle()));
        }

        let handle = self.generator.acquire(stream, volume_percent)?;
        *state = ToneState::Acquired(handle);
        info!(
            handle = %handle,
            stream = %stream.as_str(),
            volume_percent = %volume_percent,
            "tone_acquired"
        );
        Ok(handle)
    }

    /// Release the tone resource. Returns true if a handle was released by
    /// this call. Once called, the feedback is permanently closed even if
    /// nothing was ever acquired.
    pub fn release(&self) -> bool {
        let mut state = self.state.lock();
        let previous = std::mem::replace(&mut *state, ToneState::Released);
        match previous {
            ToneState::Acquired(handle) => {
                self.generator.release(handle);
                info!(handle = %handle, "tone_released");
                true
            }
            ToneState::Idle => {
                debug!("tone_closed_without_acquire");
                false
            }
            ToneState::Released => false,
        }
    }

    /// Play a cue if debugging is on.
    ///
    /// With debugging off this is a no-op in every state. With debugging on
    /// it errors with `ResourceMisuse` outside the acquired lifetime. Platform
    /// playback failures are logged and reported as `CueOutcome::Failed`.
    pub fn play(&self, cue: CueKind, config: &Config) -> ProviderResult<CueOutcome> {
        if !config.debugging() {
            self.metrics.record_cue(CueOutcome::Suppressed);
            return Ok(CueOutcome::Suppressed);
        }

        // Held across start_tone so a concurrent release cannot interleave
        let state = self.state.lock();
        let ToneState::Acquired(handle) = *state else {
            self.metrics.record_cue_rejected();
            return Err(ProviderError::misuse("play_debug_tone", state.lifecycle()));
        };

        let outcome = match self.generator.start_tone(handle, cue, config.tone_duration_ms()) {
            Ok(()) => {
                debug!(cue = %cue.as_str(), duration_ms = %config.tone_duration_ms(), "debug_cue");
                CueOutcome::Emitted
            }
            Err(e) => {
                warn!(cue = %cue.as_str(), error = %e, "debug_cue_failed");
                CueOutcome::Failed
            }
        };

        self.metrics.record_cue(outcome);
        Ok(outcome)
    }
}
