//! Location provider core library
//!
//! Shared pipeline for location-sensing strategies: lifecycle-scoped
//! platform resources, signal enrichment, and delegate dispatch.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
