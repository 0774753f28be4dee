//! Shared data model for perf-mcp: the response envelope, the
//! finding/evidence value objects, the capability snapshot, the USE-method
//! threshold table, and the closed error-code taxonomy.
//!
//! This crate has no I/O of its own; everything here is plain data plus a
//! handful of pure constructor/summary functions.

pub mod capability;
pub mod envelope;
pub mod error;
pub mod findings;
pub mod thresholds;

pub use capability::CapabilitySnapshot;
pub use envelope::Envelope;
pub use error::{ErrorCode, ToolError};
pub use findings::{Evidence, EvidenceType, Finding, Severity};
