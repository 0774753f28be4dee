use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cpu,
    Memory,
    Io,
    Network,
    Process,
    System,
    Auth,
    Other,
}

/// A scalar or string metric value. Metrics are heterogeneous in the source
/// tools (a count, a percentage, a formatted string) so this stays a tagged
/// union rather than forcing everything into `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Number(v)
    }
}
impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Number(v as f64)
    }
}
impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}
impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

/// A normalized assertion about the system. Findings are value objects:
/// once constructed they are never mutated, only carried, merged, and
/// deduplicated by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub confidence: u8,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Builder options for [`make_finding`]; all optional fields default sensibly.
#[derive(Default)]
pub struct FindingOpts {
    pub confidence: Option<u8>,
    pub metrics: BTreeMap<String, MetricValue>,
    pub suggestion: Option<String>,
}

pub fn make_finding(
    id: impl Into<String>,
    severity: Severity,
    title: impl Into<String>,
    description: impl Into<String>,
    category: Category,
    opts: FindingOpts,
) -> Finding {
    Finding {
        id: id.into(),
        severity,
        title: title.into(),
        description: description.into(),
        category,
        confidence: opts.confidence.unwrap_or(80).min(100),
        metrics: opts.metrics,
        suggestion: opts.suggestion,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceType {
    Metric,
    Trace,
    Profile,
    Log,
    Sample,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: EvidenceType,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_ref: Option<String>,
}

pub fn make_evidence(
    source: impl Into<String>,
    kind: EvidenceType,
    data: serde_json::Value,
    raw_ref: Option<String>,
) -> Evidence {
    Evidence {
        source: source.into(),
        kind,
        timestamp: chrono::Utc::now(),
        data,
        raw_ref,
    }
}

/// Turn a finding list into a short human sentence, e.g.
/// "2 critical, 1 warning: high CPU utilization, memory pressure detected".
pub fn summarize(findings: &[Finding]) -> String {
    let critical = findings.iter().filter(|f| f.severity == Severity::Critical).count();
    let warning = findings.iter().filter(|f| f.severity == Severity::Warning).count();

    if critical == 0 && warning == 0 {
        return "no issues detected".to_string();
    }

    let mut parts = Vec::new();
    if critical > 0 {
        parts.push(format!("{critical} critical"));
    }
    if warning > 0 {
        parts.push(format!("{warning} warning"));
    }

    let titles: Vec<&str> = findings
        .iter()
        .filter(|f| matches!(f.severity, Severity::Critical | Severity::Warning))
        .take(3)
        .map(|f| f.title.as_str())
        .collect();

    format!("{}: {}", parts.join(", "), titles.join(", "))
}

/// Deduplicate findings by id, keeping the highest-severity instance of each.
pub fn dedup_keep_highest_severity(findings: Vec<Finding>) -> Vec<Finding> {
    let mut by_id: BTreeMap<String, Finding> = BTreeMap::new();
    for finding in findings {
        match by_id.get(&finding.id) {
            Some(existing) if existing.severity >= finding.severity => {}
            _ => {
                by_id.insert(finding.id.clone(), finding);
            }
        }
    }
    by_id.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_healthy_system() {
        assert_eq!(summarize(&[]), "no issues detected");
    }

    #[test]
    fn summarize_mixed_severities() {
        let findings = vec![
            make_finding("a", Severity::Critical, "disk full", "d", Category::Io, FindingOpts::default()),
            make_finding("b", Severity::Warning, "cpu high", "d", Category::Cpu, FindingOpts::default()),
            make_finding("c", Severity::Ok, "fine", "d", Category::Other, FindingOpts::default()),
        ];
        let s = summarize(&findings);
        assert!(s.starts_with("1 critical, 1 warning:"));
        assert!(s.contains("disk full"));
    }

    #[test]
    fn dedup_keeps_highest_severity() {
        let findings = vec![
            make_finding("x", Severity::Info, "t1", "d", Category::Cpu, FindingOpts::default()),
            make_finding("x", Severity::Critical, "t2", "d", Category::Cpu, FindingOpts::default()),
        ];
        let deduped = dedup_keep_highest_severity(findings);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].severity, Severity::Critical);
    }
}
