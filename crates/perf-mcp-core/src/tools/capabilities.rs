//! `perf_capabilities` — a thin read-only dump of the capability snapshot
//! for agent-side planning: which tools are installed, whether BCC or
//! perf is usable, kernel version, container/virtualization context. No
//! subprocess, no file read: the snapshot was already detected once at
//! startup.

use super::deps::ToolDeps;
use super::registry::{Tool, ToolResult};
use async_trait::async_trait;
use perf_mcp_common::{ErrorCode, ToolError};

pub struct CapabilitiesTool;

#[async_trait]
impl Tool for CapabilitiesTool {
    fn name(&self) -> &'static str {
        "perf_capabilities"
    }

    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult {
        let ctx = deps.envelope_ctx(self.name());
        if !args.is_null() && args != serde_json::json!({}) {
            if let Err(e) = serde_json::from_value::<serde_json::Map<String, serde_json::Value>>(args) {
                return ctx.err(ToolError::new(ErrorCode::InvalidParams, e.to_string()));
            }
        }
        match serde_json::to_value(&deps.snapshot) {
            Ok(snapshot) => ctx.ok(serde_json::json!({ "method": "capability_snapshot", "snapshot": snapshot })),
            Err(e) => ctx.err(ToolError::new(ErrorCode::ParseError, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perf_mcp_common::CapabilitySnapshot;
    use std::path::PathBuf;

    #[tokio::test]
    async fn dumps_the_injected_snapshot() {
        let deps = ToolDeps::new(CapabilitySnapshot::default(), PathBuf::from("/tmp/perf-mcp"), "0.1.0");
        let env = CapabilitiesTool.run(&deps, serde_json::json!({})).await;
        assert!(env.success);
        assert!(env.data.unwrap().get("snapshot").is_some());
    }
}
