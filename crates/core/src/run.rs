//! Output of one pipeline execution.

use serde::{Deserialize, Serialize};

/// Findings contributed by a single pipeline agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFinding {
    /// Agent label (e.g. "researcher")
    pub agent: String,
    /// Findings text
    pub findings: String,
}

/// Result of running a request through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Final answer
    pub response: String,
    /// Ordered findings
    #[serde(default)]
    pub findings: Vec<AgentFinding>,
}

impl PipelineRun {
    /// Findings joined with newlines, used as grading context.
    pub fn context(&self) -> String {
        self.findings
            .iter()
            .map(|f| f.findings.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
