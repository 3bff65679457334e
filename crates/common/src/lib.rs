//! Portgate Common - Shared types, traits and configuration
//!
//! This crate provides the data model, error taxonomy, seam traits and the
//! process-wide configuration snapshot used across the Portgate crates.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::GateConfig;
pub use error::{GateError, GateResult};
pub use traits::{HostResolver, Prober};
pub use types::{
    AllowRule, CheckParams, ProbeResult, ProbeStatus, ProbeTarget, ScanRangeParams, ScanReport,
    ScanRequest, require_host, MAX_PORT, MIN_PORT,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
