//! Workflow and template stores.

use async_trait::async_trait;
use chaincore::store::check_new_template;
use chaincore::{
    EnvironmentMap, NodeMap, StoreError, StoredWorkflow, Template, TemplateStore,
    WorkflowDefinition, WorkflowStore,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

/// Stores the workflow document and the template list as pretty-printed JSON files.
pub struct JsonFileStore {
    workflow_file: PathBuf,
    templates_file: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(workflow_file: impl Into<PathBuf>, templates_file: impl Into<PathBuf>) -> Self {
        Self {
            workflow_file: workflow_file.into(),
            templates_file: templates_file.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn workflow_file(&self) -> &Path {
        &self.workflow_file
    }

    pub fn templates_file(&self) -> &Path {
        &self.templates_file
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let text = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, text).await?;
    Ok(())
}

#[async_trait]
impl WorkflowStore for JsonFileStore {
    async fn load_workflow(&self) -> Result<Option<StoredWorkflow>, StoreError> {
        read_json(&self.workflow_file).await
    }

    async fn save_workflow(
        &self,
        flow: WorkflowDefinition,
        node_map: NodeMap,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut workflow: StoredWorkflow = read_json(&self.workflow_file)
            .await?
            .unwrap_or_default();
        workflow.flow = flow;
        workflow.node_map = node_map;

        tracing::debug!("Saving workflow to {}", self.workflow_file.display());
        write_json(&self.workflow_file, &workflow).await
    }

    async fn save_env(&self, env: EnvironmentMap) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut workflow: StoredWorkflow = read_json(&self.workflow_file)
            .await?
            .unwrap_or_default();
        workflow.env = env;
        write_json(&self.workflow_file, &workflow).await
    }
}

#[async_trait]
impl TemplateStore for JsonFileStore {
    async fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        Ok(read_json(&self.templates_file).await?.unwrap_or_default())
    }

    async fn create_template(&self, template: Template) -> Result<Template, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut templates = self.list_templates().await?;
        check_new_template(&templates, &template)?;

        templates.push(template.clone());
        write_json(&self.templates_file, &templates).await?;
        tracing::info!("Created template {}", template.id);
        Ok(template)
    }
}

/// In-process store, mostly for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    workflow: RwLock<Option<StoredWorkflow>>,
    templates: RwLock<Vec<Template>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow(mut self, workflow: StoredWorkflow) -> Self {
        self.workflow = RwLock::new(Some(workflow));
        self
    }

    pub fn with_templates(mut self, templates: Vec<Template>) -> Self {
        self.templates = RwLock::new(templates);
        self
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn load_workflow(&self) -> Result<Option<StoredWorkflow>, StoreError> {
        Ok(self.workflow.read().await.clone())
    }

    async fn save_workflow(
        &self,
        flow: WorkflowDefinition,
        node_map: NodeMap,
    ) -> Result<(), StoreError> {
        let mut guard = self.workflow.write().await;
        let workflow = guard.get_or_insert_with(StoredWorkflow::default);
        workflow.flow = flow;
        workflow.node_map = node_map;
        Ok(())
    }

    async fn save_env(&self, env: EnvironmentMap) -> Result<(), StoreError> {
        let mut guard = self.workflow.write().await;
        guard.get_or_insert_with(StoredWorkflow::default).env = env;
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        Ok(self.templates.read().await.clone())
    }

    async fn create_template(&self, template: Template) -> Result<Template, StoreError> {
        let mut templates = self.templates.write().await;
        check_new_template(&templates, &template)?;
        templates.push(template.clone());
        Ok(template)
    }
}
