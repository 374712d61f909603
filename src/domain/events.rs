//! Domain events handed to the provider delegate

use crate::domain::types::{DetectedActivity, Location, ProviderId};
use serde::Serialize;

/// Location or stationary event after enrichment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationEvent {
    pub provider_id: ProviderId,
    pub location: Location,
    /// Stationary region radius in meters. Only set on stationary events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    /// Reverse-geocoded address; empty when no address could be resolved
    pub address: String,
    pub mock_locations_enabled: bool,
}

impl LocationEvent {
    pub fn new(provider_id: ProviderId, location: Location, address: String) -> Self {
        Self { provider_id, location, radius: None, address, mock_locations_enabled: false }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_mock_locations_enabled(mut self, enabled: bool) -> Self {
        self.mock_locations_enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEvent {
    pub provider_id: ProviderId,
    #[serde(flatten)]
    pub activity: DetectedActivity,
}

impl ActivityEvent {
    pub fn new(provider_id: ProviderId, activity: DetectedActivity) -> Self {
        Self { provider_id, activity }
    }
}

/// Failure classification visible to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "permission_denied",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEvent {
    pub kind: ErrorKind,
    pub message: String,
}

impl FailureEvent {
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::PermissionDenied, message: message.into() }
    }
}
