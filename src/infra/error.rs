//! Typed provider errors
//!
//! Lifecycle contract violations surface as `ResourceMisuse`; platform
//! capability failures convert in through `From`.

use crate::io::receiver::RegistrarError;
use crate::io::tone::ToneError;
use crate::services::lifecycle::{LifecycleState, ReceiverId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Lifecycle contract violation: the operation needs a resource the
    /// provider does not currently hold
    #[error("{operation} is not permitted while the provider is {state}")]
    ResourceMisuse { operation: &'static str, state: LifecycleState },

    #[error("tone generator unavailable: {0}")]
    Tone(#[from] ToneError),

    #[error("receiver registration failed: {0}")]
    Registrar(#[from] RegistrarError),

    #[error("receiver {0} is not registered")]
    UnknownReceiver(ReceiverId),
}

impl ProviderError {
    pub fn misuse(operation: &'static str, state: LifecycleState) -> Self {
        ProviderError::ResourceMisuse { operation, state }
    }

    pub fn is_misuse(&self) -> bool {
        matches!(self, ProviderError::ResourceMisuse { .. })
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
