use crate::NodeId;
use thiserror::Error;

/// Failure reported by a script body, either while parsing or while running.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ScriptError(pub String);

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Template with ID {0} not found")]
    NotFound(String),

    #[error("Template store unavailable: {0}")]
    Store(String),
}

/// Failure of a single node execution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Error loading template {template_id}: {source}")]
    TemplateResolution {
        template_id: String,
        #[source]
        source: TemplateError,
    },

    #[error("Error creating the node function {name} ({id}): {detail}")]
    Compile {
        name: String,
        id: NodeId,
        detail: ScriptError,
    },

    #[error("Error executing the node {name} ({id}): {detail}")]
    Runtime {
        name: String,
        id: NodeId,
        detail: ScriptError,
    },
}

/// Failure that stops one chain of a workflow run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Invalid node type '{0}' received while running the flow.")]
    InvalidNodeType(String),

    #[error("Failed to run node {name}.")]
    NodeExecution {
        name: String,
        #[source]
        source: NodeError,
    },
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Workflow not found")]
    NotFound,

    #[error("Cyclic dependency detected")]
    CyclicDependency,

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid connection: {0}")]
    InvalidConnection(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),

    #[error("Template with ID {0} already exists")]
    DuplicateTemplate(String),
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
