//! Safe tool-execution substrate for Linux performance diagnosis.
//!
//! This crate has no protocol framing, CLI, or transport of its own — that
//! lives in `perf-mcp-server`. Everything here is the sandboxed substrate:
//! allow-list and path policy, the executor and reader, capability
//! detection, the BCC runtime, parsers, tool handlers, and the triage
//! orchestrator.

pub mod allowlist;
pub mod bcc;
pub mod capability;
pub mod executor;
pub mod parsers;
pub mod reader;
pub mod tools;
pub mod triage;

pub use executor::Executor;
pub use tools::{Tool, ToolDeps, ToolResult};
pub use triage::TriageTool;
