//! Infrastructure - configuration, errors, and metrics
//!
//! - `config` - Provider configuration (TOML loading, defaults, hot swap)
//! - `error` - Typed provider errors
//! - `metrics` - Lock-free metrics collection

pub mod config;
pub mod error;
pub mod metrics;

// Re-export commonly used types
pub use config::{Config, ConfigHandle};
pub use error::{ProviderError, ProviderResult};
pub use metrics::Metrics;
