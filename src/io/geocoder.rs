//! Reverse-geocoding capability

use crate::domain::types::AddressRecord;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("geocoder timed out after {0:?}")]
    Timeout(Duration),

    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
}

/// Platform reverse geocoder.
///
/// Candidates are returned in the platform's preference order. Calls may
/// block for a long time; a call that never returns pins the resolver's
/// lookup worker, and later bounded lookups time out behind it.
pub trait Geocoder: Send + Sync {
    fn from_location(
        &self,
        latitude: f64,
        longitude: f64,
        max_results: usize,
    ) -> Result<Vec<AddressRecord>, GeocodeError>;
}
