//! Shared types for the location provider core

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current epoch milliseconds
#[inline]
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Newtype wrapper for the id of the sensing strategy that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ProviderId(pub i32);

impl ProviderId {
    /// Distance-filter (GPS) strategy
    pub const DISTANCE_FILTER: ProviderId = ProviderId(0);
    /// Activity-recognition strategy
    pub const ACTIVITY: ProviderId = ProviderId(1);
    /// Raw platform provider strategy
    pub const RAW: ProviderId = ProviderId(2);
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw fix as delivered by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Platform provider name (gps, network, fused)
    #[serde(default)]
    pub provider: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,
    /// Fix time (epoch ms)
    #[serde(default)]
    pub time: u64,
    /// Meters per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    /// Degrees east of true north
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

impl Location {
    #[inline]
    pub fn new(provider: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            provider: provider.to_string(),
            latitude,
            longitude,
            accuracy: None,
            time: epoch_ms(),
            speed: None,
            bearing: None,
            altitude: None,
        }
    }

    pub fn with_time(mut self, time: u64) -> Self {
        self.time = time;
        self
    }
}

/// Activity classification reported by the activity-recognition platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    InVehicle,
    OnBicycle,
    OnFoot,
    Still,
    Unknown,
    Tilting,
    Walking,
    Running,
}

impl ActivityType {
    /// Map a platform classification code; unrecognized codes are `Unknown`
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ActivityType::InVehicle,
            1 => ActivityType::OnBicycle,
            2 => ActivityType::OnFoot,
            3 => ActivityType::Still,
            5 => ActivityType::Tilting,
            7 => ActivityType::Walking,
            8 => ActivityType::Running,
            _ => ActivityType::Unknown,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ActivityType::InVehicle => 0,
            ActivityType::OnBicycle => 1,
            ActivityType::OnFoot => 2,
            ActivityType::Still => 3,
            ActivityType::Unknown => 4,
            ActivityType::Tilting => 5,
            ActivityType::Walking => 7,
            ActivityType::Running => 8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::InVehicle => "in_vehicle",
            ActivityType::OnBicycle => "on_bicycle",
            ActivityType::OnFoot => "on_foot",
            ActivityType::Still => "still",
            ActivityType::Unknown => "unknown",
            ActivityType::Tilting => "tilting",
            ActivityType::Walking => "walking",
            ActivityType::Running => "running",
        }
    }
}

/// Raw detected-activity signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedActivity {
    #[serde(rename = "type")]
    pub kind: ActivityType,
    /// 0-100
    pub confidence: u8,
}

impl DetectedActivity {
    pub fn new(kind: ActivityType, confidence: u8) -> Self {
        Self { kind, confidence: confidence.min(100) }
    }
}

/// One reverse-geocoding candidate. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub admin_area: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// Permission-denial signal raised when a strategy accesses location
/// without authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDenial {
    pub message: String,
}

impl PermissionDenial {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
