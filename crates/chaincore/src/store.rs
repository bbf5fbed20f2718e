//! Persistence seams the engine reads through.
//!
//! The engine never caches what it loads here: every run asks the store
//! again, so it always sees the latest saved document.

use crate::{EnvironmentMap, NodeMap, StoreError, StoredWorkflow, Template, WorkflowDefinition};
use async_trait::async_trait;

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    async fn load_workflow(&self) -> Result<Option<StoredWorkflow>, StoreError>;

    /// Replace the topology and node map, keeping any stored environment.
    async fn save_workflow(
        &self,
        flow: WorkflowDefinition,
        node_map: NodeMap,
    ) -> Result<(), StoreError>;

    async fn load_env(&self) -> Result<EnvironmentMap, StoreError> {
        Ok(self
            .load_workflow()
            .await?
            .map(|workflow| workflow.env)
            .unwrap_or_default())
    }

    async fn save_env(&self, env: EnvironmentMap) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<Template>, StoreError>;

    async fn get_template_by_id(&self, id: &str) -> Result<Option<Template>, StoreError> {
        Ok(self
            .list_templates()
            .await?
            .into_iter()
            .find(|template| template.id == id))
    }

    /// Add a template. Incomplete templates and duplicate ids are rejected.
    async fn create_template(&self, template: Template) -> Result<Template, StoreError>;
}

/// Shared validation for `TemplateStore::create_template` implementations.
pub fn check_new_template(existing: &[Template], template: &Template) -> Result<(), StoreError> {
    if !template.is_complete() {
        return Err(StoreError::Invalid(
            "Missing required fields: id, name, setting_schema, code".to_string(),
        ));
    }
    if existing.iter().any(|t| t.id == template.id) {
        return Err(StoreError::DuplicateTemplate(template.id.clone()));
    }
    Ok(())
}
