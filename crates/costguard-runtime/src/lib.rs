//! Costguard scan orchestration.
//!
//! Drives one full governance scan: provider adapters fan out
//! concurrently, their inventories are normalized and merged into a
//! single batch, the dependency graph is built across the whole batch,
//! policy runs per record, and everything lands in one immutable
//! [`ScanResult`]. A failing provider degrades to an empty contribution
//! plus a recorded error; it never aborts the scan.

pub mod orchestrator;
pub mod provider;
pub mod scan;

pub use orchestrator::GovernanceOrchestrator;
pub use provider::{ProviderError, ResourceProvider, ResourceTypeFilter};
pub use scan::{ProviderStats, ScanIssue, ScanResult};
