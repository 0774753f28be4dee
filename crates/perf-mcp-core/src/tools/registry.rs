use super::deps::ToolDeps;
use async_trait::async_trait;
use perf_mcp_common::Envelope;

pub type ToolResult = Envelope<serde_json::Value>;

/// A single entry in the flat tool registry. No tool holds a reference to
/// the registry or the orchestrator: no back-edges.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, deps: &ToolDeps, args: serde_json::Value) -> ToolResult;
}

/// The closed set of tools the server advertises. `perf_triage`
/// is registered separately by the server crate since it depends on this
/// registry rather than being part of it.
pub fn registry() -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(super::snapshot::SnapshotTool),
        Box::new(super::use_check::UseCheckTool),
        Box::new(super::bio_latency::BioLatencyTool),
        Box::new(super::runq_latency::RunqLatencyTool),
        Box::new(super::fd_trace::FdTraceTool),
        Box::new(super::cpu_profile::CpuProfileTool),
        Box::new(super::offcpu_profile::OffCpuProfileTool),
        Box::new(super::syscall_count::SyscallCountTool),
        Box::new(super::thread_profile::ThreadProfileTool),
        Box::new(super::io_layers::IoLayersTool),
        Box::new(super::file_trace::FileTraceTool),
        Box::new(super::exec_trace::ExecTraceTool),
        Box::new(super::tcp_life::TcpLifeTool),
        Box::new(super::tcp_connect::TcpConnectTool),
        Box::new(super::net_stat::NetStatTool),
        Box::new(super::cgroup_stat::CgroupStatTool),
        Box::new(super::mem_stat::MemStatTool),
        Box::new(super::disk_stat::DiskStatTool),
        Box::new(super::sched_latency::SchedLatencyTool),
        Box::new(super::capabilities::CapabilitiesTool),
    ]
}

pub fn find<'a>(tools: &'a [Box<dyn Tool>], name: &str) -> Option<&'a dyn Tool> {
    tools.iter().find(|t| t.name() == name).map(|b| b.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_no_duplicate_names() {
        let tools = registry();
        let mut names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn registry_names_follow_perf_domain_action_form() {
        for tool in registry() {
            assert!(tool.name().starts_with("perf_"), "{} violates naming convention", tool.name());
        }
    }
}
