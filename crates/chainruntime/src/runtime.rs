use crate::{
    CapabilityRegistry, JsonFileStore, NodeRunner, ScriptCompiler, TemplateResolver,
    WorkflowExecutor,
};
use chaincore::{
    EnvironmentMap, EventBus, ExecutionEvent, FlowError, NodeDefinition, NodeError, NodeMap,
    RunReport, TemplateStore, WorkflowDefinition, WorkflowError, WorkflowStore,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Main runtime for executing stored workflows
pub struct FlowRuntime {
    workflows: Arc<dyn WorkflowStore>,
    templates: Arc<dyn TemplateStore>,
    registry: Arc<CapabilityRegistry>,
    executor: Arc<WorkflowExecutor>,
    event_bus: Arc<EventBus>,
}

impl FlowRuntime {
    /// Create a runtime backed by the JSON files named in the config
    pub fn from_config(config: RuntimeConfig, registry: Arc<CapabilityRegistry>) -> Self {
        let store = Arc::new(JsonFileStore::new(
            config.workflow_file.clone(),
            config.templates_file.clone(),
        ));
        Self::with_stores(store.clone(), store, registry, config)
    }

    pub fn with_stores(
        workflows: Arc<dyn WorkflowStore>,
        templates: Arc<dyn TemplateStore>,
        registry: Arc<CapabilityRegistry>,
        config: RuntimeConfig,
    ) -> Self {
        let compiler = Arc::new(ScriptCompiler::new(&registry));
        let runner = NodeRunner::new(TemplateResolver::new(templates.clone()), compiler);
        let executor = Arc::new(WorkflowExecutor::new(runner));
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            workflows,
            templates,
            registry,
            executor,
            event_bus,
        }
    }

    /// Load the stored workflow and run all of its chains with the stored environment.
    pub async fn run_workflow(&self) -> Result<RunReport, FlowError> {
        let workflow = self
            .workflows
            .load_workflow()
            .await?
            .ok_or(WorkflowError::NotFound)?;

        Ok(self
            .run_definition(&workflow.flow, &workflow.node_map, &workflow.env)
            .await)
    }

    /// Load the stored workflow and run one of its nodes on its own.
    pub async fn run_node(&self, node_id: &str) -> Result<Option<Value>, FlowError> {
        let workflow = self
            .workflows
            .load_workflow()
            .await?
            .ok_or(WorkflowError::NotFound)?;

        let node = workflow
            .node_map
            .get(node_id)
            .ok_or_else(|| WorkflowError::NodeNotFound(node_id.to_string()))?;

        Ok(self.run_single(node, &workflow.env).await?)
    }

    /// Run an in-memory workflow definition.
    pub async fn run_definition(
        &self,
        flow: &WorkflowDefinition,
        node_map: &NodeMap,
        env: &EnvironmentMap,
    ) -> RunReport {
        self.executor
            .execute(flow, node_map, env, &self.event_bus)
            .await
    }

    /// Run one in-memory node definition with an empty output chain.
    pub async fn run_single(
        &self,
        node: &NodeDefinition,
        env: &EnvironmentMap,
    ) -> Result<Option<Value>, NodeError> {
        self.executor.execute_node(node, env, &self.event_bus).await
    }

    pub fn workflows(&self) -> &Arc<dyn WorkflowStore> {
        &self.workflows
    }

    pub fn templates(&self) -> &Arc<dyn TemplateStore> {
        &self.templates
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub workflow_file: PathBuf,
    pub templates_file: PathBuf,
    pub event_buffer_size: usize,
}

impl RuntimeConfig {
    /// Defaults overridden by `CHAIN_WORKFLOW_FILE`, `CHAIN_TEMPLATES_FILE`
    /// and `CHAIN_EVENT_BUFFER`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("CHAIN_WORKFLOW_FILE") {
            config.workflow_file = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("CHAIN_TEMPLATES_FILE") {
            config.templates_file = PathBuf::from(path);
        }
        if let Some(size) = std::env::var("CHAIN_EVENT_BUFFER")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|size| *size > 0)
        {
            config.event_buffer_size = size;
        }
        config
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workflow_file: PathBuf::from("workflow.json"),
            templates_file: PathBuf::from("node_templates.json"),
            event_buffer_size: 1000,
        }
    }
}
