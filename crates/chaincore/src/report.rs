use crate::{ChainError, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Outcome of one node in a run report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NodeOutcome {
    Error { error: String },
    Output { output: Value },
}

impl NodeOutcome {
    pub fn output(&self) -> Option<&Value> {
        match self {
            NodeOutcome::Output { output } => Some(output),
            NodeOutcome::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            NodeOutcome::Error { error } => Some(error),
            NodeOutcome::Output { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, NodeOutcome::Error { .. })
    }
}

/// Aggregate result of running every chain of a workflow once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub node_outputs: BTreeMap<NodeId, NodeOutcome>,

    /// Outputs in completion order, shared by every chain of the run.
    pub chain: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful node. An absent result is stored as `null`.
    pub fn record_output(&mut self, id: NodeId, output: Option<Value>) {
        let output = output.unwrap_or(Value::Null);
        self.chain.push(output.clone());
        self.node_outputs.insert(id, NodeOutcome::Output { output });
    }

    pub fn record_error(&mut self, id: NodeId, error: impl Into<String>) {
        self.node_outputs.insert(
            id,
            NodeOutcome::Error {
                error: error.into(),
            },
        );
    }

    /// Mark the run as failed. The last failing chain wins.
    pub fn fail_chain(&mut self, error: &ChainError) {
        self.error = Some(format!("Failed to execute workflow. {}", error));
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn get(&self, id: &str) -> Option<&NodeOutcome> {
        self.node_outputs.get(id)
    }
}
