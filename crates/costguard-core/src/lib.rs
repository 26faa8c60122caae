//! Costguard core types.
//!
//! This crate defines the canonical resource schema shared by every
//! Costguard crate: the [`ResourceRecord`] all provider adapters must be
//! normalized into, the loose [`RawResourceRecord`] shape adapters actually
//! emit, and the [`normalize`] step between them. It also carries the
//! workspace configuration types loaded from `costguard.yaml`.

// Configuration types shared across all Costguard crates
pub mod config;
pub mod normalize;
pub mod record;

// Re-export commonly used types for convenience
pub use config::{
    ConfigError,
    CostguardConfig,
    PolicyFileConfig,
    ProviderConfig,
    ScanConfig,
    SignalsConfig,
};
pub use normalize::{NormalizationError, normalize};
pub use record::{
    CloudProvider,
    RawResourceRecord,
    ResourceId,
    ResourceRecord,
    ResourceStatus,
    Severity,
};
