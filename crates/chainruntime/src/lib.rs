//! Workflow execution runtime
//!
//! This crate provides the engine that runs stored workflows: template
//! resolution, script compilation, the single-node runner and the chain
//! walker, plus the stores and the `FlowRuntime` facade.

mod compiler;
mod executor;
mod node_runner;
mod registry;
mod runtime;
pub mod store;
mod template;

pub use compiler::{CodeCompiler, ScriptCompiler};
pub use executor::WorkflowExecutor;
pub use node_runner::NodeRunner;
pub use registry::{Capability, CapabilityMetadata, CapabilityRegistry, FunctionDefinition};
pub use runtime::{FlowRuntime, RuntimeConfig};
pub use store::{JsonFileStore, MemoryStore};
pub use template::TemplateResolver;

/// Re-exported so capability crates register against the same engine type.
pub use rhai;
