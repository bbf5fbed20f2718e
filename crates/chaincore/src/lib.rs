//! Core abstractions for the chain engine
//!
//! Workflow definitions, the run report, the error taxonomy and the store
//! traits. Execution lives in `chainruntime`.

pub mod editor;
mod error;
pub mod events;
mod node;
mod plan;
mod report;
pub mod store;
mod workflow;

pub use error::{
    ChainError, FlowError, NodeError, ScriptError, StoreError, TemplateError, WorkflowError,
};
pub use events::*;
pub use node::{ExecutionContext, NodeFunction};
pub use plan::{Chain, PlanStep, RunnablePlan};
pub use report::{NodeOutcome, RunReport};
pub use store::{TemplateStore, WorkflowStore};
pub use workflow::{
    EnvironmentMap, FlowNodeKind, FlowNodeRef, NodeDefinition, NodeId, NodeMap, SettingField,
    SettingType, Settings, StoredWorkflow, Template, TemplateId, WorkflowDefinition,
};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
