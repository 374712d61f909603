//! Audio cue capability consumed by tone feedback

use serde::Deserialize;
use thiserror::Error;

/// Audio stream the tone generator plays on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioStream {
    Notification,
    Alarm,
    System,
    Music,
}

impl AudioStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioStream::Notification => "notification",
            AudioStream::Alarm => "alarm",
            AudioStream::System => "system",
            AudioStream::Music => "music",
        }
    }
}

/// Tones a provider can play while debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueKind {
    /// Moving-location fix
    Beep,
    /// Stationary region
    LongBeep,
    BeepBeepBeep,
    DoodlyDoo,
    ChirpChirpChirp,
    Dialtone,
}

impl CueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CueKind::Beep => "beep",
            CueKind::LongBeep => "long_beep",
            CueKind::BeepBeepBeep => "beep_beep_beep",
            CueKind::DoodlyDoo => "doodly_doo",
            CueKind::ChirpChirpChirp => "chirp_chirp_chirp",
            CueKind::Dialtone => "dialtone",
        }
    }
}

/// Opaque handle returned by the platform on acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ToneHandle(pub u64);

impl std::fmt::Display for ToneHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum ToneError {
    #[error("audio stream {0} unavailable")]
    StreamUnavailable(&'static str),

    #[error("tone playback failed: {0}")]
    Playback(String),
}

/// Platform tone generator.
///
/// `release` must be called exactly once per handle returned by `acquire`.
pub trait ToneGenerator: Send + Sync {
    fn acquire(&self, stream: AudioStream, volume_percent: u8) -> Result<ToneHandle, ToneError>;

    /// Start playing a cue. Returns immediately; playback is asynchronous.
    fn start_tone(&self, handle: ToneHandle, cue: CueKind, duration_ms: u32)
        -> Result<(), ToneError>;

    fn release(&self, handle: ToneHandle);
}
