use crate::{EnvironmentMap, ScriptError, Settings};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Callable produced by compiling a node's code.
#[async_trait]
pub trait NodeFunction: Send + Sync {
    /// Run the node body to completion. `Ok(None)` means the body produced no output.
    async fn call(&self, ctx: ExecutionContext) -> Result<Option<Value>, ScriptError>;
}

/// The single argument handed to a node function.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ExecutionContext {
    pub env: EnvironmentMap,

    /// Results of the nodes that completed earlier in the run, in order.
    pub outputs: Vec<Value>,

    /// Settings of the node being executed.
    pub settings: Settings,
}

impl ExecutionContext {
    pub fn new(env: EnvironmentMap, outputs: Vec<Value>, settings: Settings) -> Self {
        Self {
            env,
            outputs,
            settings,
        }
    }
}
